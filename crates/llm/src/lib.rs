pub mod estimators;
pub mod provider;
pub mod providers;
pub mod token_counter;

pub use estimators::create_estimator;
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
pub use providers::gemini::GeminiProvider;
pub use token_counter::GeminiTokenCounter;
