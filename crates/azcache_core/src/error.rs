use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CacheError {
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported(message.into())
    }

    /// Whether re-issuing the same request may succeed.
    ///
    /// Protocol errors mean the reply did not have the shape the paginators
    /// expect, so repeating the call returns the same reply.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::IoError(_))
    }
}
