use std::sync::Arc;

use tracing::{info, warn};

use novelmeta_chunker::{CharRatioEstimator, FallbackEstimator, TiktokenCounter, TokenEstimator};
use novelmeta_core::config::{ChunkingConfig, LlmConfig};

use crate::token_counter::GeminiTokenCounter;

/// Build the token estimator named by `kind` ("gemini", "tiktoken", "chars").
///
/// Exact counters are wrapped so that counting failures fall back to the
/// character ratio. A counter that cannot be constructed at all degrades to
/// the character ratio up front.
pub fn create_estimator(
    kind: &str,
    llm: &LlmConfig,
    chunking: &ChunkingConfig,
) -> Arc<dyn TokenEstimator> {
    let fallback = CharRatioEstimator::new(chunking.fallback_chars_per_token);

    let estimator: Arc<dyn TokenEstimator> = match kind {
        "gemini" => match GeminiTokenCounter::from_config(llm) {
            Ok(counter) => Arc::new(FallbackEstimator::new(counter, fallback)),
            Err(e) => {
                warn!(error = %e, "Gemini token counter unavailable, using character estimate");
                Arc::new(fallback)
            }
        },
        "tiktoken" => match TiktokenCounter::new() {
            Ok(counter) => Arc::new(FallbackEstimator::new(counter, fallback)),
            Err(e) => {
                warn!(error = %e, "tiktoken unavailable, using character estimate");
                Arc::new(fallback)
            }
        },
        "chars" => Arc::new(fallback),
        other => {
            warn!(estimator = other, "unknown token estimator, using character estimate");
            Arc::new(fallback)
        }
    };

    info!(estimator = estimator.name(), "token estimator ready");
    estimator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm(key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider: "gemini".into(),
            gemini_api_key: key.map(String::from),
            gemini_model: "gemini-3-flash-preview".into(),
            gemini_base_url: "http://127.0.0.1:9".into(),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }

    #[test]
    fn chars_estimator_uses_configured_ratio() {
        let chunking = ChunkingConfig {
            fallback_chars_per_token: 2,
            ..ChunkingConfig::default()
        };
        let est = create_estimator("chars", &llm(None), &chunking);
        assert_eq!(est.name(), "chars");
        assert_eq!(est.estimate_tokens("abcd"), 2);
    }

    #[test]
    fn gemini_without_key_degrades_to_chars() {
        let est = create_estimator("gemini", &llm(None), &ChunkingConfig::default());
        assert_eq!(est.name(), "chars");
    }

    #[test]
    fn unknown_kind_degrades_to_chars() {
        let est = create_estimator("sentencepiece", &llm(None), &ChunkingConfig::default());
        assert_eq!(est.name(), "chars");
    }

    #[test]
    fn tiktoken_kind_is_exact() {
        let est = create_estimator("tiktoken", &llm(None), &ChunkingConfig::default());
        assert_eq!(est.name(), "tiktoken");
        assert_eq!(est.estimate_tokens("hello world"), 2);
    }

    #[tokio::test]
    async fn gemini_with_key_inside_runtime() {
        let est = create_estimator("gemini", &llm(Some("key")), &ChunkingConfig::default());
        assert_eq!(est.name(), "gemini");
    }
}
