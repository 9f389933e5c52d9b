//! Failure values raised by validation chains.

/// A failed validation for a single request value.
///
/// Everything a chain can reject (predicate failures, malformed JSON,
/// format mismatches) surfaces as this one kind; the distinctions live in
/// the message text only. The surrounding framework is expected to catch it
/// and map it to a 4xx-class response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Key the failing chain was bound to, `None` for request-level checks.
    pub key: Option<String>,
    /// Human-readable description of the failure.
    pub message: String,
}

impl ValidationError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            key: Some(key.into()),
            message: message.into(),
        }
    }

    /// An error raised outside any keyed chain.
    pub fn keyless(message: impl Into<String>) -> Self {
        ValidationError {
            key: None,
            message: message.into(),
        }
    }
}

/// Errors that can escape a [tap](crate::Validator::tap) transform.
///
/// A `Validation` failure inside a transform is re-raised as a fresh
/// [ValidationError](ValidationError) for the chain's own key; anything else
/// passes through `Fatal` untouched, for the host framework to treat as a
/// 5xx-class failure rather than a rejected input.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Fatal(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary error as fatal.
    pub fn fatal(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Fatal(err.into())
    }
}
