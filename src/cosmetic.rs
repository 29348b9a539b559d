use crate::error::PatchError;
use crate::format::FormatError;
use crate::profile::{VersionBox, BOX_WIDTH};

// Code page 437 box drawing characters.
const CP437_TOP_LEFT: u8 = 0xda;
const CP437_TOP_RIGHT: u8 = 0xbf;
const CP437_BOTTOM_LEFT: u8 = 0xc0;
const CP437_BOTTOM_RIGHT: u8 = 0xd9;
const CP437_HORIZONTAL: u8 = 0xc4;
const CP437_VERTICAL: u8 = 0xb3;

const INNER_WIDTH: usize = BOX_WIDTH - 2;

/// Renders the four rows of the title screen version box.
///
/// # Errors
/// Returns `FormatError` when a caption is not ASCII or is wider than the box.
pub fn render_version_box(version_box: &VersionBox) -> Result<[[u8; BOX_WIDTH]; 4], FormatError> {
    Ok([
        border_row(CP437_TOP_LEFT, CP437_TOP_RIGHT),
        caption_row(version_box.caption)?,
        caption_row(version_box.fix_caption)?,
        border_row(CP437_BOTTOM_LEFT, CP437_BOTTOM_RIGHT),
    ])
}

/// Overwrites the version box rows in `image`.
///
/// # Errors
/// Returns an error when a caption cannot be rendered or a row lies outside `image`.
pub fn apply_version_box(image: &mut [u8], version_box: &VersionBox) -> Result<(), PatchError> {
    let rows = render_version_box(version_box)?;
    for (at, row) in version_box.rows().into_iter().zip(rows) {
        let end = at + BOX_WIDTH;
        if end > image.len() {
            return Err(PatchError::SiteOutOfRange {
                offset: at,
                width: BOX_WIDTH,
                len: image.len(),
            });
        }
        image[at..end].copy_from_slice(&row);
    }
    Ok(())
}

fn border_row(left: u8, right: u8) -> [u8; BOX_WIDTH] {
    let mut row = [CP437_HORIZONTAL; BOX_WIDTH];
    row[0] = left;
    row[BOX_WIDTH - 1] = right;
    row
}

fn caption_row(caption: &str) -> Result<[u8; BOX_WIDTH], FormatError> {
    if !caption.is_ascii() {
        return Err(FormatError::NonAsciiCaption {
            caption: caption.to_string(),
        });
    }
    if caption.len() > INNER_WIDTH {
        return Err(FormatError::CaptionTooLong {
            caption: caption.to_string(),
            width: INNER_WIDTH,
        });
    }
    let mut row = [b' '; BOX_WIDTH];
    row[0] = CP437_VERTICAL;
    row[1..1 + caption.len()].copy_from_slice(caption.as_bytes());
    row[BOX_WIDTH - 1] = CP437_VERTICAL;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{apply_version_box, render_version_box};
    use crate::format::FormatError;
    use crate::profile::VersionBox;

    fn sample_box(caption: &'static str) -> VersionBox {
        VersionBox {
            top: 0,
            line1: 0x20,
            line2: 0x40,
            bottom: 0x60,
            caption,
            fix_caption: "Keyboard fix 1",
        }
    }

    #[test]
    fn renders_bordered_rows() {
        let rows = render_version_box(&sample_box("Round 42 v1.0")).expect("render");
        assert_eq!(
            rows[0].to_vec(),
            [vec![0xdau8], vec![0xc4; 14], vec![0xbf]].concat()
        );
        assert_eq!(rows[1].to_vec(), b"\xb3Round 42 v1.0 \xb3".to_vec());
        assert_eq!(rows[2].to_vec(), b"\xb3Keyboard fix 1\xb3".to_vec());
        assert_eq!(
            rows[3].to_vec(),
            [vec![0xc0u8], vec![0xc4; 14], vec![0xd9]].concat()
        );
    }

    #[test]
    fn writes_rows_at_profile_offsets_only() {
        let mut image = vec![0x11u8; 0x80];
        apply_version_box(&mut image, &sample_box("Round-42 v2.0")).expect("apply");
        assert_eq!(image[0x00], 0xda);
        assert_eq!(&image[0x21..0x2e], b"Round-42 v2.0");
        assert_eq!(image[0x40], 0xb3);
        assert_eq!(image[0x6f], 0xd9);
        assert_eq!(image[0x10], 0x11);
        assert_eq!(image[0x70], 0x11);
    }

    #[test]
    fn rejects_caption_wider_than_box() {
        let err = render_version_box(&sample_box("Round 42 version 1.0")).expect_err("must fail");
        assert!(matches!(err, FormatError::CaptionTooLong { width: 14, .. }));
    }

    #[test]
    fn rejects_non_ascii_caption() {
        let err = render_version_box(&sample_box("Round 42 ½")).expect_err("must fail");
        assert!(matches!(err, FormatError::NonAsciiCaption { .. }));
    }
}
