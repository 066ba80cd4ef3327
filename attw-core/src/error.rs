//! Error types for attw core.

use std::{error::Error, fmt, io};

/// Uniform shape for a failed analysis attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisFailure {
    /// Human-readable failure message.
    pub message: String,
    /// Machine-readable code; a fetch error code or [`AnalysisFailure::UNKNOWN_CODE`].
    pub code: String,
}

impl AnalysisFailure {
    /// Code used when a failure carries no more specific code.
    pub const UNKNOWN_CODE: &'static str = "UNKNOWN";

    /// Build a failure with an explicit code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }

    /// Build a failure with the `UNKNOWN` code.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(message, Self::UNKNOWN_CODE)
    }
}

impl fmt::Display for AnalysisFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Error type for attw core operations.
#[derive(Debug)]
pub enum AttwError {
    /// An underlying I/O error.
    Io(io::Error),
    /// A JSON encoding or decoding error.
    Json(serde_json::Error),
    /// Invalid options, flags, or configuration detected before analysis.
    Usage(String),
    /// The analyzer or package acquisition failed.
    Analysis(AnalysisFailure),
    /// A catch-all error with a message.
    Other(String),
}

impl AttwError {
    /// Process exit status for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::Io(_) | Self::Json(_) | Self::Analysis(_) | Self::Other(_) => 3,
        }
    }
}

impl fmt::Display for AttwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "json error: {err}"),
            Self::Usage(message) => write!(f, "{message}"),
            Self::Analysis(failure) => write!(f, "{failure}"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for AttwError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for AttwError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for AttwError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<AnalysisFailure> for AttwError {
    fn from(value: AnalysisFailure) -> Self {
        Self::Analysis(value)
    }
}

/// Convenience result type for attw core.
pub type Result<T> = std::result::Result<T, AttwError>;
