use crate::client::ClientError;
use std::sync::Arc;

pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("network error: {0}")]
    Network(Arc<ClientError>),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("insufficient balance to assert location")]
    InsufficientBalance,
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
    #[error("cancelled by owner teardown")]
    Cancelled,
}

impl From<ClientError> for Error {
    fn from(err: ClientError) -> Self {
        Self::Network(Arc::new(err))
    }
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether calling the failed operation again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Cancelled)
    }
}

/// A failed cache fetch as held in the shared state. Cheap to clone so every
/// subscriber can see it.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{field} fetch failed: {source}")]
pub struct FetchError {
    pub field: &'static str,
    source: Arc<ClientError>,
}

impl FetchError {
    pub fn new(field: &'static str, source: ClientError) -> Self {
        Self {
            field,
            source: Arc::new(source),
        }
    }

    pub fn client_error(&self) -> &ClientError {
        &self.source
    }
}

impl serde::Serialize for FetchError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
