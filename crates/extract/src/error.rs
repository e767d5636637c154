use novelmeta_core::NovelError;
use novelmeta_llm::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("text is empty, nothing to analyze")]
    EmptyText,

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("invalid JSON in LLM response: {reason}")]
    InvalidJson { reason: String, raw_response: String },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Source(#[from] NovelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
