use thiserror::Error;

/// Core error type for chatbridge.
/// Internally, modules can use `anyhow::Result<T>` for convenience,
/// but public boundaries should expose `CoreResult<T>` with this error.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Credential missing, expired, or rejected by the remote service.
    /// The display string is the exact description relayed to UI surfaces.
    #[error("UNAUTHORIZED")]
    Unauthorized,

    /// Request or stream transport failure, including non-success statuses.
    #[error("network failure: {message}")]
    Network { message: String },

    /// A `data:` payload that should have been JSON but wasn't.
    #[error("malformed event payload: {0}")]
    MalformedEvent(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, BridgeError>;
