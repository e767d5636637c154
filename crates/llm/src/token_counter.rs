//! Exact token counts from Gemini's `countTokens` endpoint.

use serde_json::json;
use tokio::runtime::Handle;
use tracing::debug;

use novelmeta_chunker::{CountError, TokenCounter};
use novelmeta_core::config::LlmConfig;

use crate::provider::LlmError;

/// Remote counter for the configured Gemini model.
///
/// The chunking core is synchronous, so [`TokenCounter::count_tokens`] drives
/// the async request on the runtime captured at construction. Call it from a
/// blocking context (`tokio::task::spawn_blocking`), never from an async task.
pub struct GeminiTokenCounter {
    client: reqwest::Client,
    handle: Handle,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiTokenCounter {
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self, LlmError> {
        let handle = Handle::try_current()
            .map_err(|e| LlmError::NotConfigured(format!("no tokio runtime: {e}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            handle,
            api_key,
            model,
            base_url,
        })
    }

    pub fn from_config(llm: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = llm
            .gemini_api_key
            .clone()
            .ok_or_else(|| LlmError::NotConfigured("GEMINI_API_KEY not set".into()))?;
        Self::new(api_key, llm.gemini_model.clone(), llm.gemini_base_url.clone())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:countTokens?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key,
        )
    }

    pub async fn count_tokens_async(&self, text: &str) -> Result<usize, CountError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
        });

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| CountError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(CountError::Request(format!("HTTP {status}: {body}")));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CountError::InvalidResponse(e.to_string()))?;
        let total = parse_total_tokens(&resp)?;
        debug!(model = %self.model, chars = text.len(), total, "countTokens");
        Ok(total)
    }
}

fn parse_total_tokens(resp: &serde_json::Value) -> Result<usize, CountError> {
    resp["totalTokens"]
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| CountError::InvalidResponse("missing totalTokens".into()))
}

impl TokenCounter for GeminiTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, CountError> {
        self.handle.block_on(self.count_tokens_async(text))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novelmeta_chunker::{CharRatioEstimator, FallbackEstimator, TokenEstimator};

    #[test]
    fn parses_total_tokens() {
        assert_eq!(parse_total_tokens(&json!({ "totalTokens": 17 })).unwrap(), 17);
        assert!(matches!(
            parse_total_tokens(&json!({ "error": "nope" })),
            Err(CountError::InvalidResponse(_))
        ));
    }

    #[test]
    fn requires_runtime() {
        let err = GeminiTokenCounter::new("k".into(), "m".into(), "http://localhost".into());
        assert!(matches!(err, Err(LlmError::NotConfigured(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_endpoint_falls_back_to_char_estimate() {
        // Port 9 (discard) on localhost is not serving HTTP.
        let counter =
            GeminiTokenCounter::new("k".into(), "m".into(), "http://127.0.0.1:9".into()).unwrap();
        let est = FallbackEstimator::new(counter, CharRatioEstimator::new(3));
        let n = tokio::task::spawn_blocking(move || est.estimate_tokens("abcdefg"))
            .await
            .unwrap();
        assert_eq!(n, 3);
    }
}
