use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("{0} is not a function on this node")]
    NotCallable(String),
    #[error("read-only: {0}")]
    ReadOnly(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("inconsistent state: {0}")]
    InconsistentState(String),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
