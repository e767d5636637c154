use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub llm: LlmConfig,
    pub chunking: ChunkingConfig,
    pub paths: PathsConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `NOVELMETA_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("NOVELMETA_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            llm: LlmConfig::from_env_profiled(p),
            chunking: ChunkingConfig::from_env_profiled(p),
            paths: PathsConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  llm:       provider={}, model={}, key={}",
            self.llm.provider,
            self.llm.gemini_model,
            if self.llm.is_configured() { "set" } else { "(none)" }
        );
        tracing::info!(
            "  chunking:  max_chunk_tokens={}, overlap_words={}, estimator={}",
            self.chunking.max_chunk_tokens,
            self.chunking.overlap_words,
            self.chunking.token_estimator
        );
        tracing::info!(
            "  sampling:  segment_max_tokens={}, total_sample_tokens={}, min_segment_tokens={}",
            self.chunking.segment_max_tokens,
            self.chunking.total_sample_tokens,
            self.chunking.min_segment_tokens
        );
        tracing::info!("  paths:     data_dir={}", self.paths.data_dir.display());
    }
}

// ── LLM (Gemini) ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Only "gemini" is wired up.
    pub provider: String,
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "gemini"),
            gemini_api_key: profiled_env_opt(p, "GEMINI_API_KEY"),
            gemini_model: profiled_env_or(p, "GEMINI_MODEL", "gemini-3-flash-preview"),
            gemini_base_url: profiled_env_or(
                p,
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            temperature: profiled_env_or(p, "LLM_TEMPERATURE", "0.2")
                .parse()
                .unwrap_or(0.2),
            max_tokens: profiled_env_u32(p, "LLM_MAX_TOKENS", 8192),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "gemini" | "google" => self.gemini_api_key.is_some(),
            _ => false,
        }
    }
}

// ── Chunking / sampling ───────────────────────────────────────

/// Token budgets for the splitter and the representative sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Upper bound per chunk for full-text ingestion.
    pub max_chunk_tokens: usize,
    /// Trailing words of the previous chunk repeated at the start of the next.
    pub overlap_words: usize,
    pub segment_max_tokens: usize,
    pub total_sample_tokens: usize,
    /// Rough ratio used only to size raw sample windows.
    pub chars_per_token: usize,
    /// Floor for the per-segment limit after budget correction.
    pub min_segment_tokens: usize,
    /// Divisor of the character-count estimate used when exact counting fails.
    pub fallback_chars_per_token: usize,
    /// "gemini", "tiktoken" or "chars".
    pub token_estimator: String,
    pub request_delay_ms: u64,
}

impl ChunkingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_chunk_tokens: profiled_env_usize(p, "CHUNK_MAX_TOKENS", 30_000),
            overlap_words: profiled_env_usize(p, "CHUNK_OVERLAP_WORDS", 0),
            segment_max_tokens: profiled_env_usize(p, "SAMPLE_SEGMENT_MAX_TOKENS", 8_000),
            total_sample_tokens: profiled_env_usize(p, "SAMPLE_TOTAL_TOKENS", 22_000),
            chars_per_token: profiled_env_usize(p, "SAMPLE_CHARS_PER_TOKEN", 4),
            min_segment_tokens: profiled_env_usize(p, "SAMPLE_MIN_SEGMENT_TOKENS", 2_000),
            fallback_chars_per_token: profiled_env_usize(p, "FALLBACK_CHARS_PER_TOKEN", 3),
            token_estimator: profiled_env_or(p, "TOKEN_ESTIMATOR", "gemini"),
            request_delay_ms: profiled_env_u64(p, "INGEST_REQUEST_DELAY_MS", 1_000),
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 30_000,
            overlap_words: 0,
            segment_max_tokens: 8_000,
            total_sample_tokens: 22_000,
            chars_per_token: 4,
            min_segment_tokens: 2_000,
            fallback_chars_per_token: 3,
            token_estimator: "gemini".to_string(),
            request_delay_ms: 1_000,
        }
    }
}

// ── Paths ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
}

impl PathsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
        }
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.data_dir.join("outputs")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir.join("templates")
    }
}
