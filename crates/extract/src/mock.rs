use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use novelmeta_llm::{LlmError, LlmProvider, Message};

/// Replays canned replies in order and records every prompt it was sent.
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn ok(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::ParseError("script exhausted".into())))
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}
