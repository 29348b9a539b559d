use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("extension module is {len} bytes, shorter than its {footer}-byte footer")]
    TruncatedModule { len: usize, footer: usize },
    #[error("caption {caption:?} does not fit a {width}-column box line")]
    CaptionTooLong { caption: String, width: usize },
    #[error("caption {caption:?} contains non-ASCII characters")]
    NonAsciiCaption { caption: String },
}

pub mod module;
