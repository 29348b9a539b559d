//! Known releases of `ROUND42.COM`.
//!
//! Each release is identified solely by its exact file size. Everything the
//! patcher needs to know about a release lives in its [`VersionProfile`], so
//! supporting another release is a matter of adding a row to [`PROFILES`].

use crate::error::PatchError;

/// Offset at which DOS loads a `.COM` image inside its segment.
pub const COM_LOAD_BASE: u16 = 0x100;

/// File name of the game executable inside the input and output directories.
pub const GAME_FILE_NAME: &str = "ROUND42.COM";

/// Width of one version box row, borders included.
pub const BOX_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionBox {
    pub top: usize,
    pub line1: usize,
    pub line2: usize,
    pub bottom: usize,
    pub caption: &'static str,
    pub fix_caption: &'static str,
}

impl VersionBox {
    /// Image offsets of the four rows, top to bottom.
    #[must_use]
    pub fn rows(&self) -> [usize; 4] {
        [self.top, self.line1, self.line2, self.bottom]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionProfile {
    pub name: &'static str,
    pub image_size: usize,
    /// Offset of the immediate word loaded into DS at startup.
    pub ds_init_offset: usize,
    /// Data address of the game's `last_scancode` variable.
    pub last_scancode_addr: u16,
    /// Data address of the "up pressed" flag read by the movement code.
    pub up_flag_addr: u16,
    pub version_box: VersionBox,
}

pub const PROFILES: &[VersionProfile] = &[
    VersionProfile {
        name: "v1.0",
        image_size: 0xec00,
        ds_init_offset: 0x2bbf,
        last_scancode_addr: 0x0f9e,
        up_flag_addr: 0x0c66,
        version_box: VersionBox {
            top: 0xe5a2,
            line1: 0xe5f1,
            line2: 0xe640,
            bottom: 0xe68f,
            caption: "Round 42 v1.0",
            fix_caption: "Keyboard fix 1",
        },
    },
    VersionProfile {
        name: "v2.0",
        image_size: 0xf382,
        ds_init_offset: 0x2bbf,
        last_scancode_addr: 0x0f9e,
        up_flag_addr: 0x0c66,
        version_box: VersionBox {
            top: 0xed21,
            line1: 0xed44,
            line2: 0xed93,
            bottom: 0xede2,
            caption: "Round-42 v2.0",
            fix_caption: "Keyboard fix 1",
        },
    },
];

/// Looks up the release whose image is exactly `size` bytes.
///
/// # Errors
/// Returns `PatchError::UnknownVersion` when no release matches.
pub fn recognize(size: usize) -> Result<&'static VersionProfile, PatchError> {
    PROFILES
        .iter()
        .find(|profile| profile.image_size == size)
        .ok_or(PatchError::UnknownVersion { size })
}

#[cfg(test)]
mod tests {
    use super::{recognize, BOX_WIDTH, PROFILES};
    use crate::error::PatchError;

    #[test]
    fn recognizes_known_sizes() {
        assert_eq!(recognize(0xec00).expect("v1").name, "v1.0");
        assert_eq!(recognize(0xf382).expect("v2").name, "v2.0");
    }

    #[test]
    fn rejects_unknown_size() {
        let err = recognize(0xec01).expect_err("must fail");
        assert!(matches!(err, PatchError::UnknownVersion { size: 0xec01 }));
    }

    #[test]
    fn profile_sizes_are_distinct() {
        for (idx, a) in PROFILES.iter().enumerate() {
            for b in &PROFILES[idx + 1..] {
                assert_ne!(a.image_size, b.image_size, "{} vs {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn version_boxes_fit_inside_their_images() {
        for profile in PROFILES {
            for row in profile.version_box.rows() {
                assert!(row + BOX_WIDTH <= profile.image_size, "{}: row {row:#x}", profile.name);
            }
        }
    }
}
