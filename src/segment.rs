//! Data segment relocation.
//!
//! The game sets DS from an immediate word stored in the image. Appending the
//! extension module (and its uninitialized variables) after the image may push
//! the end of the code past that segment's base. When it does, DS is moved up
//! by the smallest whole number of paragraphs that clears the overlap.

use crate::error::PatchError;

pub const PARAGRAPH: u32 = 0x10;

/// Sizes that determine where the loaded program ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLayout {
    pub load_base: u16,
    pub image_len: usize,
    pub module_len: usize,
    pub vars_size: u16,
    pub ds_init_offset: usize,
}

impl SegmentLayout {
    /// First address past the image, the module and the module's variables.
    #[must_use]
    pub fn end_of_code(&self) -> u32 {
        u32::from(self.load_base)
            .wrapping_add(self.image_len as u32)
            .wrapping_add(self.module_len as u32)
            .wrapping_add(u32::from(self.vars_size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentFix {
    pub offset: usize,
    pub old_value: u16,
    pub new_value: u16,
    pub end_of_code: u32,
    pub overlap: u32,
}

impl SegmentFix {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.old_value == self.new_value
    }

    #[must_use]
    pub fn delta_paragraphs(&self) -> u16 {
        self.new_value.wrapping_sub(self.old_value)
    }

    /// Writes the new DS value back into the image.
    ///
    /// # Errors
    /// Returns `PatchError::SiteOutOfRange` when the DS word lies outside `image`.
    pub fn apply(&self, image: &mut [u8]) -> Result<(), PatchError> {
        let slot = word_slot(image.len(), self.offset)?;
        image[slot].copy_from_slice(&self.new_value.to_le_bytes());
        Ok(())
    }
}

/// Computes the DS adjustment needed to keep the data segment clear of the
/// appended module.
///
/// # Errors
/// Returns `PatchError::SiteOutOfRange` when the DS word lies outside `image`.
pub fn plan_segment_fix(layout: &SegmentLayout, image: &[u8]) -> Result<SegmentFix, PatchError> {
    let slot = word_slot(image.len(), layout.ds_init_offset)?;
    let old_value = u16::from_le_bytes([image[slot.start], image[slot.start + 1]]);

    let end_of_code = layout.end_of_code();
    let segment_base = u32::from(old_value).wrapping_mul(PARAGRAPH);
    let overlap = end_of_code.saturating_sub(segment_base);
    let delta = overlap.div_ceil(PARAGRAPH);
    let new_value = old_value.wrapping_add(delta as u16);

    Ok(SegmentFix {
        offset: layout.ds_init_offset,
        old_value,
        new_value,
        end_of_code,
        overlap,
    })
}

fn word_slot(len: usize, offset: usize) -> Result<std::ops::Range<usize>, PatchError> {
    match offset.checked_add(2) {
        Some(end) if end <= len => Ok(offset..end),
        _ => Err(PatchError::SiteOutOfRange {
            offset,
            width: 2,
            len,
        }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{plan_segment_fix, SegmentLayout, PARAGRAPH};
    use crate::error::PatchError;

    const DS_AT: usize = 0x10;

    fn image_with_ds(value: u16) -> Vec<u8> {
        let mut image = vec![0u8; 0x40];
        image[DS_AT..DS_AT + 2].copy_from_slice(&value.to_le_bytes());
        image
    }

    fn layout(module_len: usize, vars_size: u16) -> SegmentLayout {
        SegmentLayout {
            load_base: 0x100,
            image_len: 0xec00,
            module_len,
            vars_size,
            ds_init_offset: DS_AT,
        }
    }

    #[test]
    fn leaves_segment_alone_without_overlap() {
        let image = image_with_ds(0x0f00);
        let fix = plan_segment_fix(&layout(0x6a, 0x40), &image).expect("plan");
        assert_eq!(fix.end_of_code, 0xedaa);
        assert_eq!(fix.overlap, 0);
        assert!(fix.is_noop());
        assert_eq!(fix.new_value, 0x0f00);
    }

    #[test]
    fn end_exactly_at_segment_base_is_not_an_overlap() {
        // 0x100 + 0xec00 + 0xf00 = 0xfc00
        let image = image_with_ds(0x0fc0);
        let fix = plan_segment_fix(&layout(0xf00, 0), &image).expect("plan");
        assert_eq!(fix.overlap, 0);
        assert!(fix.is_noop());
    }

    #[test]
    fn raises_segment_by_rounded_up_paragraphs() {
        let mut image = image_with_ds(0x0e00);
        let fix = plan_segment_fix(&layout(0x6a, 0x40), &image).expect("plan");
        assert_eq!(fix.overlap, 0xdaa);
        assert_eq!(fix.delta_paragraphs(), 0xdb);
        assert_eq!(fix.new_value, 0x0edb);

        fix.apply(&mut image).expect("apply");
        assert_eq!(&image[DS_AT..DS_AT + 2], &[0xdb, 0x0e]);
    }

    #[test]
    fn new_value_is_minimal_clearing_segment() {
        for old in [0x0d00u16, 0x0e80, 0x0eda, 0x0edb, 0x0f00] {
            for vars in [0u16, 1, 0x0f, 0x10, 0x11, 0x200] {
                let image = image_with_ds(old);
                let l = layout(0x6a, vars);
                let fix = plan_segment_fix(&l, &image).expect("plan");
                let end = l.end_of_code();
                if u32::from(old) * PARAGRAPH >= end {
                    assert_eq!(fix.new_value, old);
                } else {
                    assert!(u32::from(fix.new_value) * PARAGRAPH >= end);
                    assert!(u32::from(fix.new_value - 1) * PARAGRAPH < end);
                }
            }
        }
    }

    #[test]
    fn rejects_ds_word_outside_image() {
        let image = vec![0u8; DS_AT + 1];
        let err = plan_segment_fix(&layout(0x6a, 0), &image).expect_err("must fail");
        assert!(matches!(err, PatchError::SiteOutOfRange { offset: DS_AT, width: 2, .. }));
    }
}
