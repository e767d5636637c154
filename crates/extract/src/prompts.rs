//! Prompt templates. Placeholders are `<<<name>>>`; the analyzed text is
//! substituted last so markers inside the novel are left alone.
//!
//! Built-in templates can be replaced by `metadata.txt` / `chunk.txt` in the
//! templates directory.

use std::path::Path;

use tracing::info;

use crate::error::ExtractError;

pub const METADATA_TEMPLATE: &str = include_str!("../prompts/metadata.txt");
pub const CHUNK_TEMPLATE: &str = include_str!("../prompts/chunk.txt");

/// The metadata and per-chunk templates in use.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub metadata: String,
    pub chunk: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            metadata: METADATA_TEMPLATE.to_string(),
            chunk: CHUNK_TEMPLATE.to_string(),
        }
    }
}

impl PromptSet {
    /// Load overrides from `dir`; missing files keep the built-in template.
    pub fn load(dir: &Path) -> Result<Self, ExtractError> {
        Ok(Self {
            metadata: load_template(&dir.join("metadata.txt"))?
                .unwrap_or_else(|| METADATA_TEMPLATE.to_string()),
            chunk: load_template(&dir.join("chunk.txt"))?
                .unwrap_or_else(|| CHUNK_TEMPLATE.to_string()),
        })
    }
}

fn load_template(path: &Path) -> Result<Option<String>, ExtractError> {
    if !path.exists() {
        return Ok(None);
    }
    let template = std::fs::read_to_string(path)?;
    info!(path = %path.display(), "using prompt template override");
    Ok(Some(template))
}

/// Inputs for the novel-level metadata prompt.
pub struct MetadataPrompt<'a> {
    pub novel_name: &'a str,
    pub novel_id: &'a str,
    pub today: &'a str,
    pub filename: &'a str,
    pub file_size_bytes: u64,
    pub model: &'a str,
    pub sample: &'a str,
}

impl MetadataPrompt<'_> {
    pub fn render(&self, template: &str) -> String {
        template
            .replace("<<<novel_name>>>", self.novel_name)
            .replace("<<<novel_id>>>", self.novel_id)
            .replace("<<<today>>>", self.today)
            .replace("<<<filename>>>", self.filename)
            .replace("<<<filesize>>>", &self.file_size_bytes.to_string())
            .replace("<<<model>>>", self.model)
            .replace("<<<text_sample>>>", self.sample)
    }
}

/// Character and dialogue prompt for one chunk. `index` is 0-based.
pub fn chunk_prompt(template: &str, novel_name: &str, index: usize, total: usize, chunk: &str) -> String {
    template
        .replace("<<<novel_name>>>", novel_name)
        .replace("<<<chunk_number>>>", &(index + 1).to_string())
        .replace("<<<total_chunks>>>", &total.to_string())
        .replace("<<<chunk_text>>>", chunk)
}
