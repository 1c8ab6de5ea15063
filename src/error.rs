#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid address for {key}: {value}")]
    InvalidAddressFormat { key: &'static str, value: String },

    #[error("Chain read error: {0}")]
    ChainRead(String),

    #[error("Chain write error: {0}")]
    ChainWrite(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

impl From<alloy::transports::TransportError> for SentinelError {
    fn from(err: alloy::transports::TransportError) -> Self {
        SentinelError::ChainRead(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SentinelError>;

pub struct ErrorContext {
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    pub fn log_error(&self, error: &SentinelError) {
        use tracing::{error, warn};

        match error {
            SentinelError::ConfigurationMissing(_) => {
                warn!("Operation '{}' skipped: {}", self.operation, error);
            }
            SentinelError::InvalidInput(_) => {
                warn!("Operation '{}' rejected: {}", self.operation, error);
            }
            _ => {
                error!("Operation '{}' failed: {}", self.operation, error);
            }
        }
    }
}

pub trait ResultExt<T> {
    fn with_context(self, context: ErrorContext) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, context: ErrorContext) -> Result<T> {
        if let Err(ref e) = self {
            context.log_error(e);
        }
        self
    }
}
