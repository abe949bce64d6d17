use std::io;
use thiserror::Error;

/// Malformed or missing rule data. Raised while the [`RuleStore`](crate::RuleStore)
/// is built, never during romanization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source_name}:{line}: {reason}")]
pub struct RuleLoadError {
    pub source_name: String,
    /// 1-based line in the data source; 0 when the error is not tied to a line.
    pub line: usize,
    pub reason: String,
}

impl RuleLoadError {
    pub fn new(source_name: &str, line: usize, reason: impl Into<String>) -> Self {
        Self { source_name: source_name.to_string(), line, reason: reason.into() }
    }
}

#[derive(Error, Debug)]
pub enum RomanizationError {
    #[error("Failed to load romanization rules: {0}")]
    RuleLoad(#[from] RuleLoadError),

    #[error("Unknown language code: '{0}'")]
    UnknownLanguageCode(String),

    #[error("Invalid output format '{0}' (expected one of: str, edges, alts, lattice)")]
    InvalidFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to serialize the result to JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Internal logic error: {0}")]
    InternalError(String),
}
