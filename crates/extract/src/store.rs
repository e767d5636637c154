use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::ExtractError;
use crate::ingest::CharacterRecord;

/// Filesystem layout for extraction results.
///
/// ```text
/// outputs/
///   metadata/
///     {name}_metadata.json
///   ingestion/
///     {novel_id}_characters.json
///     {novel_id}_dialogues.json
/// ```
pub struct OutputStore {
    metadata_dir: PathBuf,
    ingestion_dir: PathBuf,
}

impl OutputStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            metadata_dir: base_dir.join("metadata"),
            ingestion_dir: base_dir.join("ingestion"),
        }
    }

    /// Write ingestion results somewhere other than `{base}/ingestion`.
    pub fn with_ingestion_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ingestion_dir = dir.into();
        self
    }

    pub fn metadata_path(&self, name: &str) -> PathBuf {
        self.metadata_dir.join(format!("{name}_metadata.json"))
    }

    pub fn characters_path(&self, novel_id: &str) -> PathBuf {
        self.ingestion_dir.join(format!("{novel_id}_characters.json"))
    }

    pub fn dialogues_path(&self, novel_id: &str) -> PathBuf {
        self.ingestion_dir.join(format!("{novel_id}_dialogues.json"))
    }

    /// Save metadata under its default name, or at `output` when given.
    pub fn save_metadata(
        &self,
        name: &str,
        metadata: &Value,
        output: Option<&Path>,
    ) -> Result<PathBuf, ExtractError> {
        let path = output.map_or_else(|| self.metadata_path(name), Path::to_path_buf);
        write_json(&path, metadata)?;
        Ok(path)
    }

    pub fn save_characters(
        &self,
        novel_id: &str,
        characters: &[CharacterRecord],
    ) -> Result<PathBuf, ExtractError> {
        let path = self.characters_path(novel_id);
        write_json(&path, characters)?;
        Ok(path)
    }

    pub fn save_dialogues(&self, novel_id: &str, dialogues: &[Value]) -> Result<PathBuf, ExtractError> {
        let path = self.dialogues_path(novel_id);
        write_json(&path, dialogues)?;
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExtractError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::CastMerger;
    use serde_json::json;

    #[test]
    fn metadata_goes_under_metadata_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("outputs"));
        let path = store
            .save_metadata("ميرامار", &json!({ "novel_metadata": {} }), None)
            .unwrap();
        assert_eq!(path, dir.path().join("outputs/metadata/ميرامار_metadata.json"));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  \"novel_metadata\""), "expected pretty JSON");
    }

    #[test]
    fn explicit_output_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let target = dir.path().join("custom/deep/out.json");
        let path = store
            .save_metadata("x", &json!({ "a": 1 }), Some(&target))
            .unwrap();
        assert_eq!(path, target);
        assert!(target.exists());
        assert!(!store.metadata_path("x").exists());
    }

    #[test]
    fn ingestion_files_keep_arabic_readable() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path()).with_ingestion_dir(dir.path().join("ing"));

        let mut merger = CastMerger::new("الطريق");
        merger.merge(
            &json!({
                "characters": [{ "name": "صابر", "traits": ["حائر"] }],
                "dialogues": [{ "type": "monologue" }]
            }),
            0,
        );
        let (characters, dialogues) = merger.into_parts();

        let chars_path = store.save_characters("الطريق", &characters).unwrap();
        let dials_path = store.save_dialogues("الطريق", &dialogues).unwrap();
        assert_eq!(chars_path, dir.path().join("ing/الطريق_characters.json"));
        assert_eq!(dials_path, dir.path().join("ing/الطريق_dialogues.json"));

        let chars = std::fs::read_to_string(chars_path).unwrap();
        assert!(chars.contains("\"صابر\""));
        assert!(chars.contains("\"حائر\""));

        let back: Vec<CharacterRecord> = serde_json::from_str(&chars).unwrap();
        assert_eq!(back, characters);
    }
}
