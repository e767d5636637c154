//! Chunk / sample configuration and output types.

use serde::Serialize;

use novelmeta_core::config::ChunkingConfig;

// ── Configuration ───────────────────────────────────────────────────────────

/// Configuration for the fixed-size splitter.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum estimated tokens per chunk (default: 30000).
    pub max_tokens: usize,
    /// Trailing words of the previous chunk repeated at the start of the
    /// next one (default: 0). Dropped word by word if the limit would break.
    pub overlap_words: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_tokens: 30_000,
            overlap_words: 0,
        }
    }
}

impl From<&ChunkingConfig> for ChunkConfig {
    fn from(cfg: &ChunkingConfig) -> Self {
        Self {
            max_tokens: cfg.max_chunk_tokens,
            overlap_words: cfg.overlap_words,
        }
    }
}

/// Configuration for the representative sampler.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    /// Exact token limit for each of begin / middle / end (default: 8000).
    pub segment_max_tokens: usize,
    /// Budget for the combined sample, labels included (default: 22000).
    pub total_budget: usize,
    /// Only sizes the raw windows handed to the trimmer (default: 4).
    pub chars_per_token: usize,
    /// Lower bound on the reduced per-segment limit (default: 2000).
    pub min_segment_tokens: usize,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            segment_max_tokens: 8_000,
            total_budget: 22_000,
            chars_per_token: 4,
            min_segment_tokens: 2_000,
        }
    }
}

impl From<&ChunkingConfig> for SampleConfig {
    fn from(cfg: &ChunkingConfig) -> Self {
        Self {
            segment_max_tokens: cfg.segment_max_tokens,
            total_budget: cfg.total_sample_tokens,
            chars_per_token: cfg.chars_per_token,
            min_segment_tokens: cfg.min_segment_tokens,
        }
    }
}

// ── Chunk output ────────────────────────────────────────────────────────────

/// A token-bounded slice of the source text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// 0-based position in the output sequence.
    pub index: usize,
    pub content: String,
    /// Estimated tokens of `content` (overlap included).
    pub token_count: usize,
}

// ── Sample output ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Begin,
    Middle,
    End,
}

impl SegmentKind {
    pub const ALL: [SegmentKind; 3] = [SegmentKind::Begin, SegmentKind::Middle, SegmentKind::End];

    /// Header written above the segment in the combined sample.
    pub fn label(self) -> &'static str {
        match self {
            SegmentKind::Begin => "[مقتطف من البداية]",
            SegmentKind::Middle => "[مقتطف من منتصف الرواية]",
            SegmentKind::End => "[مقتطف من النهاية]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
}

/// What went into a sample and how close it came to the budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleMeta {
    pub segment_max_tokens: usize,
    pub target_total_sample_tokens: usize,
    pub actual_total_sample_tokens: usize,
    /// Labels of the non-empty segments, in order.
    pub segments_included: Vec<String>,
    /// Per-segment limit the final sample was trimmed with.
    pub effective_segment_tokens: usize,
    pub budget_corrected: bool,
    /// Still above `target_total_sample_tokens` after the correction pass.
    pub over_budget: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Labeled segments joined by blank lines.
    pub text: String,
    pub segments: Vec<Segment>,
    pub meta: SampleMeta,
}

impl Sample {
    pub(crate) fn empty(config: &SampleConfig) -> Self {
        Self {
            text: String::new(),
            segments: Vec::new(),
            meta: SampleMeta {
                segment_max_tokens: config.segment_max_tokens,
                target_total_sample_tokens: config.total_budget,
                actual_total_sample_tokens: 0,
                segments_included: Vec::new(),
                effective_segment_tokens: config.segment_max_tokens,
                budget_corrected: false,
                over_budget: false,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
