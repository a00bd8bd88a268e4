use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timeout waiting for transport")]
    Timeout,
    #[error("heading resolver error: {0}")]
    Heading(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("aborted: {0}")]
    Abort(AbortReason),
}

/// Why a task stopped before dropping its markers.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    #[error("target not confirmed within the allowed detection attempts")]
    DetectionFailed,
    #[error("operator requested abort")]
    Operator,
    #[error("maximum run time exceeded")]
    MaxRuntime,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing transport")]
    MissingTransport,
    #[error("missing heading resolver")]
    MissingResolver,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
