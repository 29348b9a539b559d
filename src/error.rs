use thiserror::Error;

use crate::format::FormatError;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("unknown game version: image size {size:#x} is not recognized")]
    UnknownVersion { size: usize },

    #[error("could not find pattern {label}: [{hex}] in input file")]
    PatternNotFound { label: &'static str, hex: String },

    #[error("pattern {label}: [{hex}] occurs {} times, expected exactly once", .offsets.len())]
    AmbiguousPattern {
        label: &'static str,
        hex: String,
        offsets: Vec<usize>,
    },

    #[error("patch ranges overlap: {first} and {second}")]
    OverlappingPatches { first: String, second: String },

    #[error("patch site {offset:#06x}+{width} is outside the image ({len:#x} bytes)")]
    SiteOutOfRange {
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("module builder `{program}` failed: {reason}")]
    BuilderFailure { program: String, reason: String },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PatchError {
    /// Check if this error means a required byte signature was absent.
    #[must_use]
    pub fn is_pattern_not_found(&self) -> bool {
        matches!(self, PatchError::PatternNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_not_found_names_label_and_hex() {
        let err = PatchError::PatternNotFound {
            label: "read scancode",
            hex: "a1 9e 0f".to_string(),
        };
        assert!(err.is_pattern_not_found());
        assert_eq!(
            err.to_string(),
            "could not find pattern read scancode: [a1 9e 0f] in input file"
        );
    }

    #[test]
    fn unknown_version_names_size_in_hex() {
        let err = PatchError::UnknownVersion { size: 0x1234 };
        assert!(!err.is_pattern_not_found());
        assert!(err.to_string().contains("0x1234"));
    }

    #[test]
    fn ambiguous_pattern_reports_count() {
        let err = PatchError::AmbiguousPattern {
            label: "init scancode",
            hex: "a3 9e 0f".to_string(),
            offsets: vec![0x10, 0x20],
        };
        assert!(err.to_string().contains("occurs 2 times"));
    }
}
