use std::path::PathBuf;

use thiserror::Error;

/// Failures that end the pipeline.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to open metadata source {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error while reading metadata: {0}")]
    Io(#[from] std::io::Error),
    #[error("record exceeds {limit} bytes without a closing </item>")]
    RecordTooLarge { limit: usize },
    #[error("metadata reader thread panicked")]
    ReaderPanicked,
}

/// Item markup that could not be parsed; the item is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WrapperError {
    #[error("no <item> element found")]
    MissingItem,
    #[error("invalid item markup: {0}")]
    Xml(String),
    /// An item was cut off by the start of the next one
    #[error("incomplete item interrupted by a new <item> ({bytes} bytes dropped)")]
    Interrupted { bytes: usize },
}

/// Transport decoding failure for a single field; the field decodes to empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("odd number of hex digits ({0})")]
    OddHexLength(usize),
    #[error("invalid hex digit at offset {0}")]
    InvalidHexDigit(usize),
    #[error("invalid base64: {0}")]
    Base64(String),
    #[error("length is not a decimal integer: {0:?}")]
    InvalidLength(String),
}
