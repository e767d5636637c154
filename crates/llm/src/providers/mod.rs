pub mod gemini;

use novelmeta_core::config::LlmConfig;

use crate::provider::{LlmError, LlmProvider};

/// Create the LLM provider named in config.
pub fn create_provider(llm_config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    match llm_config.provider.as_str() {
        "gemini" | "google" => {
            let api_key = llm_config
                .gemini_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("GEMINI_API_KEY not set".into()))?;
            Ok(Box::new(gemini::GeminiProvider::new(
                api_key.clone(),
                llm_config.gemini_model.clone(),
                llm_config.gemini_base_url.clone(),
            )))
        }
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider: provider.into(),
            gemini_api_key: key.map(String::from),
            gemini_model: "gemini-3-flash-preview".into(),
            gemini_base_url: "https://generativelanguage.googleapis.com".into(),
            temperature: 0.2,
            max_tokens: 8192,
        }
    }

    #[test]
    fn gemini_requires_api_key() {
        assert!(matches!(
            create_provider(&config("gemini", None)),
            Err(LlmError::NotConfigured(_))
        ));
        let provider = create_provider(&config("gemini", Some("key"))).unwrap();
        assert_eq!(provider.model(), "gemini-3-flash-preview");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = create_provider(&config("openai", Some("key"))).err().unwrap();
        assert!(err.to_string().contains("openai"));
    }
}
