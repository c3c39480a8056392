use std::num::ParseIntError;

use thiserror::Error;

/// A logcat line that could not be turned into a record
///
/// Both variants render as the same "did not match" diagnostic; the
/// numeric variant keeps the underlying cause for `source()`.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line did not match expected format: {line:?}")]
    Mismatch { line: String },

    #[error("line did not match expected format: {line:?} (invalid {field})")]
    BadNumber {
        line: String,
        field: &'static str,
        #[source]
        source: ParseIntError,
    },
}

impl ParseError {
    pub fn mismatch(line: impl Into<String>) -> Self {
        Self::Mismatch { line: line.into() }
    }

    pub fn bad_number(line: impl Into<String>, field: &'static str, source: ParseIntError) -> Self {
        Self::BadNumber {
            line: line.into(),
            field,
            source,
        }
    }

    /// The offending line
    pub fn line(&self) -> &str {
        match self {
            Self::Mismatch { line } | Self::BadNumber { line, .. } => line,
        }
    }
}
