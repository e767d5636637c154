//! Novel-level metadata from a representative sample.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use novelmeta_chunker::{build_sample, Sample, SampleConfig, SampleMeta, TokenEstimator};
use novelmeta_core::{NovelSource, TextStats};
use novelmeta_llm::{LlmProvider, Message};

use crate::error::ExtractError;
use crate::prompts::{MetadataPrompt, METADATA_TEMPLATE};
use crate::response::parse_object;

const SYSTEM_PROMPT: &str =
    "You are an expert literary analyst specializing in Arabic literature. Reply with JSON only.";

/// Result of one extraction run.
#[derive(Debug, Clone)]
pub struct MetadataReport {
    pub metadata: Value,
    pub sample: SampleMeta,
    /// `None` when the model reply was used; otherwise the reason the
    /// skeleton was returned instead.
    pub error: Option<String>,
}

impl MetadataReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub struct MetadataExtractor {
    provider: Box<dyn LlmProvider>,
    estimator: Arc<dyn TokenEstimator>,
    sample_config: SampleConfig,
    template: String,
    temperature: f32,
    max_tokens: u32,
}

impl MetadataExtractor {
    pub fn new(
        provider: Box<dyn LlmProvider>,
        estimator: Arc<dyn TokenEstimator>,
        sample_config: SampleConfig,
    ) -> Self {
        Self {
            provider,
            estimator,
            sample_config,
            template: METADATA_TEMPLATE.to_string(),
            temperature: 0.2,
            max_tokens: 8192,
        }
    }

    pub fn with_generation(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Sample the novel, ask the model, and attach locally computed facts.
    ///
    /// Provider and parse failures are not errors: the report then carries
    /// skeleton metadata flagged `extraction_failed`.
    pub async fn extract(&self, source: &NovelSource) -> Result<MetadataReport, ExtractError> {
        let sample = self.sample(&source.text).await?;
        if sample.text.trim().is_empty() {
            return Err(ExtractError::EmptyText);
        }
        info!(
            novel = %source.name,
            segments = ?sample.meta.segments_included,
            tokens = sample.meta.actual_total_sample_tokens,
            over_budget = sample.meta.over_budget,
            "representative sample ready"
        );

        let today = today();
        let stats = TextStats::compute(&source.text);

        info!(novel = %source.name, model = self.provider.model(), "extracting metadata");
        match self.ask(source, &sample, &today).await {
            Ok(mut metadata) => {
                annotate(&mut metadata, &stats, &sample.meta)?;
                info!(novel = %source.name, "metadata extracted");
                Ok(MetadataReport {
                    metadata,
                    sample: sample.meta,
                    error: None,
                })
            }
            Err(e) => {
                warn!(novel = %source.name, error = %e, "metadata extraction failed, returning skeleton");
                let message = e.to_string();
                let metadata =
                    skeleton_metadata(source, &stats, self.provider.model(), &today, &message);
                Ok(MetadataReport {
                    metadata,
                    sample: sample.meta,
                    error: Some(message),
                })
            }
        }
    }

    async fn sample(&self, text: &str) -> Result<Sample, ExtractError> {
        let estimator = Arc::clone(&self.estimator);
        let config = self.sample_config.clone();
        let text = text.to_owned();
        let sample =
            tokio::task::spawn_blocking(move || build_sample(&*estimator, &text, &config)).await?;
        Ok(sample)
    }

    async fn ask(
        &self,
        source: &NovelSource,
        sample: &Sample,
        today: &str,
    ) -> Result<Value, ExtractError> {
        let prompt = MetadataPrompt {
            novel_name: &source.name,
            novel_id: &source.novel_id,
            today,
            filename: &source.file_name(),
            file_size_bytes: source.file_size_bytes,
            model: self.provider.model(),
            sample: &sample.text,
        }
        .render(&self.template);

        let reply = self
            .provider
            .complete(
                vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
                self.temperature,
                self.max_tokens,
            )
            .await?;
        parse_object(&reply)
    }
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Overwrite the model's guesses with what we know for certain.
fn annotate(metadata: &mut Value, stats: &TextStats, sample: &SampleMeta) -> Result<(), ExtractError> {
    object_at(metadata, &["novel_metadata", "text_statistics"])["content_metrics"] =
        serde_json::to_value(stats)?;

    let extraction = object_at(metadata, &["novel_metadata", "extraction_metadata"]);
    extraction["chunk_size"] = json!(sample.segment_max_tokens);
    extraction["overlap"] = json!(0);
    extraction["extraction_notes"] = json!(format!(
        "Used representative sampling: {}",
        serde_json::to_string(sample)?
    ));
    Ok(())
}

/// Walk `path`, replacing anything that is not an object along the way.
fn object_at<'a>(root: &'a mut Value, path: &[&str]) -> &'a mut Value {
    let mut current = root;
    for key in path {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = &mut current[*key];
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    current
}

fn skeleton_metadata(
    source: &NovelSource,
    stats: &TextStats,
    model: &str,
    today: &str,
    error: &str,
) -> Value {
    json!({
        "novel_metadata": {
            "metadata": {
                "dataset_version": "1.0",
                "language": "arabic",
                "created_date": today,
                "last_updated": today,
                "schema_type": "comprehensive_novel_metadata"
            },
            "basic_info": {
                "novel_id": source.novel_id,
                "title": { "primary": source.name, "alternative_titles": [], "english_translation": "" },
                "author": {
                    "full_name": "", "first_name": "", "last_name": "", "nationality": "",
                    "birth_year": null, "death_year": null, "biography_summary": ""
                },
                "publication": {
                    "first_published": null, "publisher": "", "place": "",
                    "original_language": "", "copyright_status": ""
                }
            },
            "text_statistics": {
                "source_file": {
                    "filename": source.file_name(),
                    "file_size_bytes": source.file_size_bytes,
                    "encoding": "UTF-8"
                },
                "content_metrics": stats,
                "structure": {
                    "chapter_count": null, "parts": null, "has_prologue": false,
                    "has_epilogue": false, "has_sections": false
                },
                "dialogue_ratio": null,
                "description_ratio": null,
                "internal_monologue_ratio": null
            },
            "extraction_metadata": {
                "extraction_date": today,
                "extraction_method": format!("AI-powered NLP with {model}"),
                "ai_models_used": [{ "model": model, "purpose": "metadata extraction" }],
                "processing_pipeline": "novelmeta metadata",
                "chunk_size": null,
                "overlap": null,
                "confidence_score": null,
                "human_validation_required": true,
                "extraction_notes": format!("Extraction failed: {error}")
            },
            "data_quality": {
                "completeness": null,
                "accuracy": null,
                "consistency": null,
                "validation_status": "extraction_failed",
                "last_validation_date": today,
                "issues_found": [error],
                "recommendations": ["Retry extraction", "Check API key", "Verify text format"]
            }
        }
    })
}
