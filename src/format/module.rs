use crate::format::FormatError;

/// Size of the trailing metadata block appended by the module assembler.
pub const FOOTER_LEN: usize = 10;

/// Entry points and storage needs exported by the extension module.
///
/// The assembler emits these as five little-endian words at the very end of
/// the blob, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleFooter {
    pub vars_size: u16,
    pub reset_buffer: u16,
    pub put_scancode: u16,
    pub get_scancode: u16,
    pub on_round_start: u16,
}

impl ModuleFooter {
    #[must_use]
    pub fn to_bytes(&self) -> [u8; FOOTER_LEN] {
        let mut out = [0u8; FOOTER_LEN];
        let words = [
            self.vars_size,
            self.reset_buffer,
            self.put_scancode,
            self.get_scancode,
            self.on_round_start,
        ];
        for (idx, word) in words.iter().enumerate() {
            out[idx * 2..idx * 2 + 2].copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionModule {
    bytes: Vec<u8>,
    footer: ModuleFooter,
}

impl ExtensionModule {
    /// Wraps an assembled blob and decodes its footer.
    ///
    /// # Errors
    /// Returns `FormatError::TruncatedModule` when the blob cannot hold a footer.
    pub fn parse(bytes: Vec<u8>) -> Result<Self, FormatError> {
        let footer = parse_footer(&bytes)?;
        Ok(Self { bytes, footer })
    }

    #[must_use]
    pub fn footer(&self) -> &ModuleFooter {
        &self.footer
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decodes the footer occupying the last `FOOTER_LEN` bytes of `blob`.
///
/// # Errors
/// Returns `FormatError::TruncatedModule` when `blob` is shorter than the footer.
pub fn parse_footer(blob: &[u8]) -> Result<ModuleFooter, FormatError> {
    let Some(start) = blob.len().checked_sub(FOOTER_LEN) else {
        return Err(FormatError::TruncatedModule {
            len: blob.len(),
            footer: FOOTER_LEN,
        });
    };
    let tail = &blob[start..];
    let word = |idx: usize| u16::from_le_bytes([tail[idx * 2], tail[idx * 2 + 1]]);
    Ok(ModuleFooter {
        vars_size: word(0),
        reset_buffer: word(1),
        put_scancode: word(2),
        get_scancode: word(3),
        on_round_start: word(4),
    })
}
