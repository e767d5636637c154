use thiserror::Error;

#[derive(Error, Debug)]
pub enum NovelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid source file: {0}")]
    InvalidSource(String),
}
