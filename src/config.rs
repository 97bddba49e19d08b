use std::path::PathBuf;

use crate::frame::DEFAULT_MAX_RECORD_BYTES;
use crate::machine::FingerprintMode;

/// Where shairport-sync writes its metadata pipe by default.
pub const DEFAULT_SOURCE: &str = "/tmp/shairport-sync-metadata";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Named pipe or file to read items from
    pub source: PathBuf,
    /// Largest record accepted before the stream is considered broken
    pub max_record_bytes: usize,
    pub fingerprint: FingerprintMode,
}

impl Config {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            fingerprint: FingerprintMode::default(),
        }
    }
}
