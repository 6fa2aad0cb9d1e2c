//! Error types for frontforge.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("variant discovery failed: {0}")]
    Discovery(String),

    #[error("invalid variant: {0}")]
    InvalidVariant(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool '{tool}' failed with exit code {code:?}")]
    ToolFailed { tool: String, code: Option<i32> },

    #[error("step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    #[error("server error: {0}")]
    Server(String),

    #[error("watch error: {0}")]
    Watch(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
