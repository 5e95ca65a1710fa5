use thiserror::Error;

/// brokerstat error types
#[derive(Error, Debug)]
pub enum BrokerstatError {
    /// Input shape the analytics core refuses to aggregate
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Failed to parse JSON
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Session token rejected by the API (401)
    #[error("session expired, log in again")]
    Unauthorized,

    /// Authenticated but not allowed (403)
    #[error("permission denied")]
    PermissionDenied,

    /// Resource does not exist (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// API answered with a 5xx status
    #[error("server error: HTTP {0}")]
    Server(u16),

    /// API rejected the request (4xx other than the above)
    #[error("api error: {0}")]
    Api(String),

    /// Request never got an answer
    #[error("network error: {0}")]
    Network(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl BrokerstatError {
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::ContractViolation(msg.into())
    }
}

/// Result type alias for brokerstat
pub type Result<T> = std::result::Result<T, BrokerstatError>;
