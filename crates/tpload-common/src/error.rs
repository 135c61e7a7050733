//! Error types shared across tpload crates

use thiserror::Error;

/// Result type alias for shared tpload operations
pub type Result<T> = std::result::Result<T, TploadError>;

/// Errors raised while setting up the ambient layers (logging, log files)
#[derive(Error, Debug)]
pub enum TploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl TploadError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
