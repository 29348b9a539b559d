use memchr::memmem;

use crate::error::PatchError;

/// A labelled byte signature searched for verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub label: &'static str,
    pub bytes: Vec<u8>,
}

impl Pattern {
    #[must_use]
    pub fn new(label: &'static str, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            label,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Space separated lowercase hex, e.g. `a1 9e 0f`.
    #[must_use]
    pub fn hex(&self) -> String {
        format_hex(&self.bytes)
    }

    fn not_found(&self) -> PatchError {
        PatchError::PatternNotFound {
            label: self.label,
            hex: self.hex(),
        }
    }
}

#[must_use]
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the offset of the first occurrence of `pattern`.
///
/// # Errors
/// Returns `PatchError::PatternNotFound` when `pattern` does not occur.
pub fn find_one(buffer: &[u8], pattern: &Pattern) -> Result<usize, PatchError> {
    if pattern.is_empty() {
        return Err(pattern.not_found());
    }
    memmem::find(buffer, &pattern.bytes).ok_or_else(|| pattern.not_found())
}

/// Returns every occurrence start of `pattern` in ascending order.
///
/// Occurrences may overlap; each start position is reported.
///
/// # Errors
/// Returns `PatchError::PatternNotFound` when `pattern` does not occur.
pub fn find_all(buffer: &[u8], pattern: &Pattern) -> Result<Vec<usize>, PatchError> {
    if pattern.is_empty() {
        return Err(pattern.not_found());
    }
    // memmem's iterator skips overlapping matches, so restart one byte past each hit.
    let finder = memmem::Finder::new(&pattern.bytes);
    let mut offsets = Vec::new();
    let mut pos = 0;
    while let Some(found) = buffer.get(pos..).and_then(|rest| finder.find(rest)) {
        offsets.push(pos + found);
        pos += found + 1;
    }
    if offsets.is_empty() {
        return Err(pattern.not_found());
    }
    Ok(offsets)
}

/// Returns the offset of `pattern`, requiring it to occur exactly once.
///
/// # Errors
/// Returns `PatchError::PatternNotFound` when absent and
/// `PatchError::AmbiguousPattern` when it occurs more than once.
pub fn find_unique(buffer: &[u8], pattern: &Pattern) -> Result<usize, PatchError> {
    let offsets = find_all(buffer, pattern)?;
    match offsets.as_slice() {
        [only] => Ok(*only),
        _ => Err(PatchError::AmbiguousPattern {
            label: pattern.label,
            hex: pattern.hex(),
            offsets,
        }),
    }
}
