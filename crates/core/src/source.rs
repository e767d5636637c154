//! Loading novel text from disk.
//!
//! Two layouts are accepted: plain UTF-8 text, and the page-JSON format
//! produced by PDF extraction (`{"pages": [{"page": 1, "text": "..."}, ...]}`).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::NovelError;

/// A loaded novel, ready for chunking or sampling.
#[derive(Debug, Clone)]
pub struct NovelSource {
    pub path: PathBuf,
    /// File name up to the first `.`.
    pub name: String,
    /// `name` with spaces replaced by underscores.
    pub novel_id: String,
    pub file_size_bytes: u64,
    pub text: String,
    /// Number of pages for page-JSON sources, `None` for plain text.
    pub page_count: Option<usize>,
}

#[derive(Deserialize)]
struct PagesFile {
    pages: Option<Vec<PageEntry>>,
}

#[derive(Deserialize)]
struct PageEntry {
    #[serde(default)]
    text: String,
}

impl NovelSource {
    /// Read a novel from `path`, dispatching on the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NovelError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let (text, page_count) = match ext.as_str() {
            "json" => {
                let (text, pages) = text_from_pages_json(&bytes)?;
                info!(
                    path = %path.display(),
                    pages,
                    chars = text.chars().count(),
                    "loaded page-JSON source"
                );
                (text, Some(pages))
            }
            _ => (decode_text(&bytes), None),
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = novel_name(&file_name);
        let novel_id = name.replace(' ', "_");

        Ok(Self {
            path: path.to_path_buf(),
            name,
            novel_id,
            file_size_bytes: bytes.len() as u64,
            text,
            page_count,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Try UTF-8 first, fall back to lossy conversion.
fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec())
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

/// Join every page's text with a blank line. Returns the text and page count.
pub fn text_from_pages_json(bytes: &[u8]) -> Result<(String, usize), NovelError> {
    let file: PagesFile = serde_json::from_slice(bytes)?;
    let pages = file.pages.ok_or_else(|| {
        NovelError::InvalidSource("JSON file must have 'pages' key with page objects".into())
    })?;
    let text = pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    Ok((text, pages.len()))
}

fn novel_name(file_name: &str) -> String {
    file_name.split('.').next().unwrap_or("").to_string()
}
