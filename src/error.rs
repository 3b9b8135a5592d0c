//! Record-level load errors.
//!
//! Everything else in the crate travels as `anyhow::Error`; these variants
//! exist so callers (and tests) can tell a bad source record apart from an
//! I/O or database failure.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// A symbol field had no leading digits (`parseInt` would give NaN).
    #[error("record {index}: field `{field}` is not an integer: {value:?}")]
    MalformedSymbol {
        index: usize,
        field: &'static str,
        value: String,
    },

    /// A required text field was missing or null.
    #[error("record {index}: missing field `{field}`")]
    MissingField { index: usize, field: &'static str },

    /// Source file extension is neither `.json` nor `.csv`.
    #[error("unsupported source format: {0}")]
    UnsupportedFormat(PathBuf),
}

impl LoadError {
    /// Index of the offending record, if the error is tied to one.
    pub fn record_index(&self) -> Option<usize> {
        match self {
            Self::MalformedSymbol { index, .. } | Self::MissingField { index, .. } => Some(*index),
            Self::UnsupportedFormat(_) => None,
        }
    }
}
