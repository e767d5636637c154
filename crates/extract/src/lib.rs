//! LLM-backed extraction on top of the chunker: novel-level metadata from a
//! representative sample, and per-chunk characters and dialogues.

pub mod error;
pub mod ingest;
pub mod metadata;
pub mod prompts;
pub mod response;
pub mod store;

#[cfg(test)]
mod mock;

pub use error::ExtractError;
pub use ingest::{CastMerger, CharacterRecord, IngestOutcome, IngestReport, NovelIngester};
pub use metadata::{MetadataExtractor, MetadataReport};
pub use prompts::PromptSet;
pub use store::OutputStore;
