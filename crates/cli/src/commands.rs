use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use novelmeta_chunker::{build_sample, split_text, ChunkConfig, SampleConfig, TokenEstimator};
use novelmeta_core::{Config, NovelSource};
use novelmeta_extract::{MetadataExtractor, NovelIngester, OutputStore, PromptSet};
use novelmeta_llm::create_provider;

const PREVIEW_CHARS: usize = 60;

fn prompts(config: &Config) -> Result<PromptSet> {
    let dir = config.paths.templates_dir();
    PromptSet::load(&dir)
        .with_context(|| format!("failed to read prompt templates from '{}'", dir.display()))
}

fn load(path: &Path) -> Result<NovelSource> {
    NovelSource::load(path).with_context(|| format!("failed to load novel '{}'", path.display()))
}

pub async fn chunk(
    config: &Config,
    estimator: Arc<dyn TokenEstimator>,
    path: &Path,
    max_tokens: Option<usize>,
    overlap_words: Option<usize>,
) -> Result<()> {
    let source = load(path)?;
    let mut chunk_config = ChunkConfig::from(&config.chunking);
    if let Some(n) = max_tokens {
        chunk_config.max_tokens = n;
    }
    if let Some(n) = overlap_words {
        chunk_config.overlap_words = n;
    }

    let text = source.text;
    let chunks = tokio::task::spawn_blocking(move || split_text(&*estimator, &text, &chunk_config))
        .await
        .context("chunking task failed")?;

    println!("{} chunks from {}", chunks.len(), source.name);
    for chunk in &chunks {
        let preview: String = chunk
            .content
            .chars()
            .take(PREVIEW_CHARS)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        println!(
            "#{:<4} {:>7} tokens {:>8} chars  {}",
            chunk.index,
            chunk.token_count,
            chunk.content.chars().count(),
            preview
        );
    }
    Ok(())
}

pub async fn sample(
    config: &Config,
    estimator: Arc<dyn TokenEstimator>,
    path: &Path,
    segment_tokens: Option<usize>,
    total_tokens: Option<usize>,
    print_text: bool,
) -> Result<()> {
    let source = load(path)?;
    let mut sample_config = SampleConfig::from(&config.chunking);
    if let Some(n) = segment_tokens {
        sample_config.segment_max_tokens = n;
    }
    if let Some(n) = total_tokens {
        sample_config.total_budget = n;
    }

    let text = source.text;
    let sample = tokio::task::spawn_blocking(move || build_sample(&*estimator, &text, &sample_config))
        .await
        .context("sampling task failed")?;

    println!("{}", serde_json::to_string_pretty(&sample.meta)?);
    if print_text {
        println!("\n{}", sample.text);
    }
    Ok(())
}

pub async fn metadata(
    config: &Config,
    estimator: Arc<dyn TokenEstimator>,
    path: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let source = load(path)?;
    let provider = create_provider(&config.llm).context("failed to create LLM provider")?;
    let extractor = MetadataExtractor::new(provider, estimator, SampleConfig::from(&config.chunking))
        .with_template(prompts(config)?.metadata)
        .with_generation(config.llm.temperature, config.llm.max_tokens);

    let report = extractor
        .extract(&source)
        .await
        .with_context(|| format!("metadata extraction failed for '{}'", source.name))?;

    let store = OutputStore::new(config.paths.outputs_dir());
    let saved = store.save_metadata(&source.name, &report.metadata, output)?;
    match &report.error {
        None => println!("Metadata saved to {}", saved.display()),
        Some(e) => println!("Extraction failed ({e}); skeleton saved to {}", saved.display()),
    }
    Ok(())
}

pub async fn ingest(
    config: &Config,
    estimator: Arc<dyn TokenEstimator>,
    path: &Path,
    output_dir: Option<PathBuf>,
    novel_id: Option<String>,
) -> Result<()> {
    let source = load(path)?;
    let novel_id = novel_id.unwrap_or_else(|| source.novel_id.clone());
    let provider = create_provider(&config.llm).context("failed to create LLM provider")?;
    let ingester = NovelIngester::new(provider, estimator, ChunkConfig::from(&config.chunking))
        .with_template(prompts(config)?.chunk)
        .with_generation(config.llm.temperature, config.llm.max_tokens)
        .with_request_delay(config.chunking.request_delay());

    let outcome = ingester.ingest(&source, &novel_id).await?;

    let mut store = OutputStore::new(config.paths.outputs_dir());
    if let Some(dir) = output_dir {
        store = store.with_ingestion_dir(dir);
    }
    let characters = store.save_characters(&novel_id, &outcome.characters)?;
    let dialogues = store.save_dialogues(&novel_id, &outcome.dialogues)?;
    info!(characters = %characters.display(), dialogues = %dialogues.display(), "ingestion saved");

    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    Ok(())
}
