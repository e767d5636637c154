//! Chunk-by-chunk character and dialogue extraction.

use std::sync::Arc;
use std::time::Duration;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use novelmeta_chunker::{split_text, Chunk, ChunkConfig, TokenEstimator};
use novelmeta_core::NovelSource;
use novelmeta_llm::{LlmProvider, Message};

use crate::error::ExtractError;
use crate::prompts::{chunk_prompt, CHUNK_TEMPLATE};
use crate::response::parse_object;

const SYSTEM_PROMPT: &str =
    "You are an expert literary analyst. Reply with a single JSON object and nothing else.";

/// A character merged across every chunk it appeared in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// Trimmed name, used as the dedup key.
    pub character_id: String,
    pub novel_id: String,
    pub name: String,
    pub traits: IndexSet<String>,
    pub roles: IndexSet<String>,
    /// Number of chunk results that listed this character.
    pub mentions: usize,
}

/// Accumulates per-chunk extraction results for one novel.
#[derive(Debug)]
pub struct CastMerger {
    novel_id: String,
    characters: IndexMap<String, CharacterRecord>,
    dialogues: Vec<Value>,
}

impl CastMerger {
    pub fn new(novel_id: impl Into<String>) -> Self {
        Self {
            novel_id: novel_id.into(),
            characters: IndexMap::new(),
            dialogues: Vec::new(),
        }
    }

    /// Fold one `{characters: [...], dialogues: [...]}` result in.
    pub fn merge(&mut self, data: &Value, chunk_index: usize) {
        for character in data["characters"].as_array().into_iter().flatten() {
            let Some(name) = character["name"].as_str().map(str::trim) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            let record = self
                .characters
                .entry(name.to_string())
                .or_insert_with(|| CharacterRecord {
                    character_id: name.to_string(),
                    novel_id: self.novel_id.clone(),
                    name: name.to_string(),
                    traits: IndexSet::new(),
                    roles: IndexSet::new(),
                    mentions: 0,
                });
            record.traits.extend(strings(&character["traits"]));
            record.roles.extend(strings(&character["role"]));
            record.mentions += 1;
        }

        for dialogue in data["dialogues"].as_array().into_iter().flatten() {
            let Value::Object(fields) = dialogue else {
                continue;
            };
            let mut fields = fields.clone();
            fields.insert("novel_id".into(), Value::String(self.novel_id.clone()));
            fields.insert("chunk_index".into(), Value::from(chunk_index));
            self.dialogues.push(Value::Object(fields));
        }
    }

    pub fn characters(&self) -> impl Iterator<Item = &CharacterRecord> {
        self.characters.values()
    }

    pub fn dialogues(&self) -> &[Value] {
        &self.dialogues
    }

    pub fn into_parts(self) -> (Vec<CharacterRecord>, Vec<Value>) {
        (self.characters.into_values().collect(), self.dialogues)
    }
}

/// A string, or an array of strings. Blank entries are dropped.
fn strings(value: &Value) -> Vec<String> {
    let items: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub novel_id: String,
    pub chunks_total: usize,
    pub chunks_succeeded: usize,
    pub chunks_failed: usize,
    pub characters: usize,
    pub dialogues: usize,
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub characters: Vec<CharacterRecord>,
    pub dialogues: Vec<Value>,
    pub report: IngestReport,
}

pub struct NovelIngester {
    provider: Box<dyn LlmProvider>,
    estimator: Arc<dyn TokenEstimator>,
    chunk_config: ChunkConfig,
    template: String,
    temperature: f32,
    max_tokens: u32,
    request_delay: Duration,
}

impl NovelIngester {
    pub fn new(
        provider: Box<dyn LlmProvider>,
        estimator: Arc<dyn TokenEstimator>,
        chunk_config: ChunkConfig,
    ) -> Self {
        Self {
            provider,
            estimator,
            chunk_config,
            template: CHUNK_TEMPLATE.to_string(),
            temperature: 0.2,
            max_tokens: 8192,
            request_delay: Duration::from_secs(1),
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

    /// Pause between consecutive chunk requests.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Split the novel and run every chunk through the model.
    ///
    /// A chunk whose request or reply fails is logged and skipped.
    pub async fn ingest(
        &self,
        source: &NovelSource,
        novel_id: &str,
    ) -> Result<IngestOutcome, ExtractError> {
        let chunks = self.chunks(&source.text).await?;
        let total = chunks.len();
        if total == 0 {
            warn!(novel = %source.name, "text is empty, nothing to ingest");
        } else {
            info!(novel = %source.name, chunks = total, "ingesting novel");
        }

        let mut merger = CastMerger::new(novel_id);
        let mut succeeded = 0;
        for chunk in &chunks {
            match self.extract_chunk(&source.name, chunk, total).await {
                Ok(data) => {
                    merger.merge(&data, chunk.index);
                    succeeded += 1;
                    info!(
                        chunk = chunk.index + 1,
                        total,
                        tokens = chunk.token_count,
                        characters = merger.characters.len(),
                        "chunk processed"
                    );
                }
                Err(e) => warn!(chunk = chunk.index, error = %e, "chunk extraction failed"),
            }
            if chunk.index + 1 < total && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        let (characters, dialogues) = merger.into_parts();
        let report = IngestReport {
            novel_id: novel_id.to_string(),
            chunks_total: total,
            chunks_succeeded: succeeded,
            chunks_failed: total - succeeded,
            characters: characters.len(),
            dialogues: dialogues.len(),
        };
        info!(?report, "ingestion finished");
        Ok(IngestOutcome {
            characters,
            dialogues,
            report,
        })
    }

    async fn chunks(&self, text: &str) -> Result<Vec<Chunk>, ExtractError> {
        let estimator = Arc::clone(&self.estimator);
        let config = self.chunk_config.clone();
        let text = text.to_owned();
        let chunks =
            tokio::task::spawn_blocking(move || split_text(&*estimator, &text, &config)).await?;
        Ok(chunks)
    }

    async fn extract_chunk(
        &self,
        novel_name: &str,
        chunk: &Chunk,
        total: usize,
    ) -> Result<Value, ExtractError> {
        let prompt = chunk_prompt(&self.template, novel_name, chunk.index, total, &chunk.content);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedProvider;
    use novelmeta_chunker::CharRatioEstimator;
    use novelmeta_llm::LlmError;
    use serde_json::json;
    use std::path::PathBuf;

    fn source(text: &str) -> NovelSource {
        NovelSource {
            path: PathBuf::from("اللص والكلاب.txt"),
            name: "اللص والكلاب".into(),
            novel_id: "اللص_والكلاب".into(),
            file_size_bytes: text.len() as u64,
            text: text.into(),
            page_count: None,
        }
    }

    #[test]
    fn merge_dedups_by_trimmed_name() {
        let mut merger = CastMerger::new("n1");
        merger.merge(
            &json!({
                "characters": [
                    { "name": "سعيد مهران", "traits": ["غاضب", "ذكي"], "role": "Speaker" },
                    { "name": "  ", "traits": ["ignored"] },
                    { "traits": ["no name"] }
                ]
            }),
            0,
        );
        merger.merge(
            &json!({
                "characters": [
                    { "name": " سعيد مهران ", "traits": ["ذكي", "حزين"], "role": "Mentioned" },
                    { "name": "نور", "traits": "طيبة" }
                ]
            }),
            1,
        );

        let chars: Vec<_> = merger.characters().collect();
        assert_eq!(chars.len(), 2);
        let said = chars[0];
        assert_eq!(said.character_id, "سعيد مهران");
        assert_eq!(said.novel_id, "n1");
        assert_eq!(said.mentions, 2);
        assert_eq!(
            said.traits.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["غاضب", "ذكي", "حزين"]
        );
        assert_eq!(
            said.roles.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Speaker", "Mentioned"]
        );
        assert_eq!(chars[1].mentions, 1);
        assert!(chars[1].traits.contains("طيبة"));
        assert!(chars[1].roles.is_empty());
    }

    #[test]
    fn merge_tags_dialogues() {
        let mut merger = CastMerger::new("n1");
        merger.merge(
            &json!({
                "dialogues": [
                    { "type": "conversation", "participants": ["أ", "ب"], "exchanges": [] },
                    "not an object"
                ]
            }),
            4,
        );
        assert_eq!(merger.dialogues().len(), 1);
        let d = &merger.dialogues()[0];
        assert_eq!(d["novel_id"], "n1");
        assert_eq!(d["chunk_index"], 4);
        assert_eq!(d["type"], "conversation");
    }

    #[test]
    fn merge_tolerates_missing_sections() {
        let mut merger = CastMerger::new("n1");
        merger.merge(&json!({ "characters": "none" }), 0);
        merger.merge(&json!({}), 1);
        let (characters, dialogues) = merger.into_parts();
        assert!(characters.is_empty());
        assert!(dialogues.is_empty());
    }

    #[test]
    fn character_record_serializes_sets_as_arrays() {
        let mut merger = CastMerger::new("n1");
        merger.merge(&json!({ "characters": [{ "name": "رؤوف", "traits": ["انتهازي"] }] }), 0);
        let (characters, _) = merger.into_parts();
        let value = serde_json::to_value(&characters[0]).unwrap();
        assert_eq!(value["traits"], json!(["انتهازي"]));
        assert_eq!(value["roles"], json!([]));
        assert_eq!(value["mentions"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ingests_every_chunk_and_skips_failures() {
        // A line plus its newline is 10 tokens at 3 chars/token, so a
        // 12-token limit puts each line in its own chunk.
        let line = "أ".repeat(29);
        let text = format!("{line}\n{line}\n{line}");

        let provider = ScriptedProvider::new(vec![
            Ok(r#"{"characters": [{"name": "سعيد"}], "dialogues": [{"type": "monologue"}]}"#.into()),
            Err(LlmError::ParseError("boom".into())),
            Ok("```json\n{\"characters\": [{\"name\": \"سعيد\"}, {\"name\": \"نبوية\"}]}\n```".into()),
        ]);
        let prompts = provider.prompts.clone();
        let ingester = NovelIngester::new(
            Box::new(provider),
            Arc::new(CharRatioEstimator::new(3)),
            ChunkConfig { max_tokens: 12, overlap_words: 0 },
        )
        .with_request_delay(Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        let outcome = ingester.ingest(&source(&text), "custom_id").await.unwrap();

        assert_eq!(
            outcome.report,
            IngestReport {
                novel_id: "custom_id".into(),
                chunks_total: 3,
                chunks_succeeded: 2,
                chunks_failed: 1,
                characters: 2,
                dialogues: 1,
            }
        );
        assert_eq!(outcome.characters[0].name, "سعيد");
        assert_eq!(outcome.characters[0].mentions, 2);
        assert_eq!(outcome.dialogues[0]["chunk_index"], 0);

        let prompts = prompts.lock().unwrap();
        assert!(prompts[0].contains("This is part 1 of 3."));
        assert!(prompts[2].contains("This is part 3 of 3."));
        // Delays between chunks only, not after the last one.
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn empty_text_ingests_nothing() {
        let provider = ScriptedProvider::ok(&[]);
        let ingester = NovelIngester::new(
            Box::new(provider),
            Arc::new(CharRatioEstimator::new(3)),
            ChunkConfig::default(),
        );
        let outcome = ingester.ingest(&source(""), "n").await.unwrap();
        assert_eq!(outcome.report.chunks_total, 0);
        assert!(outcome.characters.is_empty());
    }
}
