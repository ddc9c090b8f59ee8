use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything an oracle needs to pick a label for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub file_name: String,
    /// Rendered `key: value` lines describing the file.
    pub context: String,
    /// Label enumeration as shown to the model.
    pub labels: String,
    /// True when labels may be answered as `Category/SubCategory`.
    pub hierarchical: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleErrorKind {
    Auth,
    RateLimit,
    Network,
    Unknown,
}

impl OracleErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleErrorKind::Auth => "auth",
            OracleErrorKind::RateLimit => "rate_limit",
            OracleErrorKind::Network => "network",
            OracleErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OracleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to obtain any response from the oracle. Distinct from an
/// unparseable response, which falls back instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} oracle error: {message}")]
pub struct OracleError {
    pub kind: OracleErrorKind,
    pub message: String,
    /// Server-provided wait before retrying, when known.
    pub retry_after: Option<Duration>,
}

impl OracleError {
    pub fn new(kind: OracleErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), retry_after: None }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::Auth, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::Unknown, message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self { kind: OracleErrorKind::RateLimit, message: message.into(), retry_after }
    }

    /// True for rate-limit errors, including ones only recognizable from the
    /// provider's message (`429`, `RESOURCE_EXHAUSTED`, quota).
    pub fn is_rate_limited(&self) -> bool {
        self.kind == OracleErrorKind::RateLimit
            || self.message.contains("429")
            || self.message.contains("RESOURCE_EXHAUSTED")
            || self.message.to_ascii_lowercase().contains("quota")
    }
}

/// Maps file metadata plus label options to a free-text label answer.
pub trait LabelingOracle: Send + Sync {
    fn request(&self, request: &OracleRequest) -> Result<String, OracleError>;

    fn name(&self) -> &str {
        "oracle"
    }
}

impl<F> LabelingOracle for F
where
    F: Fn(&OracleRequest) -> Result<String, OracleError> + Send + Sync,
{
    fn request(&self, request: &OracleRequest) -> Result<String, OracleError> {
        self(request)
    }

    fn name(&self) -> &str {
        "closure"
    }
}
