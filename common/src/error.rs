use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("{0}")]
    Validation(String),

    #[error("not running")]
    NotRunning(String),

    #[error("{0}")]
    NotFound(String),

    #[error("failed to {action} process {pid}: {reason}")]
    SignalFailure {
        action: &'static str,
        pid: u32,
        reason: String,
    },

    #[error("failed to start stream: {0}")]
    StartFailure(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl StreamError {
    /// 粗粒度错误分类，供接口层映射状态码
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::Validation(_) => ErrorKind::Validation,
            StreamError::NotRunning(_) | StreamError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Internal,
}

pub type Result<T> = std::result::Result<T, StreamError>;
