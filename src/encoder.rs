use crate::error::PatchError;

pub const OP_CALL_NEAR: u8 = 0xe8;
pub const OP_NOP: u8 = 0x90;

/// Opcode byte plus 16-bit displacement.
pub const CALL_NEAR_LEN: usize = 3;

/// Builds `call target` for a site at `site_offset`, padded with `nop` to `site_width`.
///
/// The displacement is relative to the end of the call and wraps within the
/// 64 KiB segment, as a real-mode near call does.
///
/// # Panics
/// Panics when `site_width` cannot hold a near call.
#[must_use]
pub fn encode_call(site_offset: u16, site_width: usize, target: u16) -> Vec<u8> {
    assert!(
        site_width >= CALL_NEAR_LEN,
        "patch site width {site_width} cannot hold a near call"
    );
    let disp = target.wrapping_sub(site_offset.wrapping_add(CALL_NEAR_LEN as u16));
    let mut out = Vec::with_capacity(site_width);
    out.push(OP_CALL_NEAR);
    out.extend_from_slice(&disp.to_le_bytes());
    out.resize(site_width, OP_NOP);
    out
}

/// Recovers the call target from an encoding produced by [`encode_call`].
#[must_use]
pub fn decode_call(bytes: &[u8], site_offset: u16) -> Option<u16> {
    let [OP_CALL_NEAR, lo, hi, ..] = bytes else {
        return None;
    };
    let disp = u16::from_le_bytes([*lo, *hi]);
    Some(site_offset.wrapping_add(CALL_NEAR_LEN as u16).wrapping_add(disp))
}

/// Overwrites `image[site_offset..site_offset + site_width]` with a call to `target`.
///
/// # Errors
/// Returns `PatchError::SiteOutOfRange` when the site runs past the end of the
/// image or starts beyond the 16-bit offset range.
pub fn apply_call(
    image: &mut [u8],
    site_offset: usize,
    site_width: usize,
    target: u16,
) -> Result<(), PatchError> {
    let len = image.len();
    let out_of_range = || PatchError::SiteOutOfRange {
        offset: site_offset,
        width: site_width,
        len,
    };
    let end = site_offset.checked_add(site_width).ok_or_else(out_of_range)?;
    if end > len {
        return Err(out_of_range());
    }
    let offset16 = u16::try_from(site_offset).map_err(|_| out_of_range())?;
    let bytes = encode_call(offset16, site_width, target);
    image[site_offset..end].copy_from_slice(&bytes);
    Ok(())
}
