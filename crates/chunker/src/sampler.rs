//! Representative begin / middle / end sampling under a token budget.

use tracing::{debug, warn};

use crate::estimator::TokenEstimator;
use crate::trimmer::trim_to_token_limit;
use crate::types::{Sample, SampleConfig, SampleMeta, Segment, SegmentKind};

/// Raw character windows cut from the source before exact trimming.
struct Windows<'a> {
    begin: &'a str,
    middle: &'a str,
    end: &'a str,
}

impl<'a> Windows<'a> {
    /// Each window spans `2 * segment_max_tokens * chars_per_token` chars,
    /// clamped to the text.
    fn cut(text: &'a str, config: &SampleConfig) -> Self {
        let n = text.chars().count();
        let half = config
            .segment_max_tokens
            .saturating_mul(config.chars_per_token.max(1));
        let window = half.saturating_mul(2);
        let mid = n / 2;

        let begin = char_slice(text, 0, window.min(n));
        let middle = char_slice(text, mid.saturating_sub(half), mid.saturating_add(half).min(n));
        let end = char_slice(text, n.saturating_sub(window), n);

        Self { begin, middle, end }
    }

    fn get(&self, kind: SegmentKind) -> &'a str {
        match kind {
            SegmentKind::Begin => self.begin,
            SegmentKind::Middle => self.middle,
            SegmentKind::End => self.end,
        }
    }
}

/// Slice `text` between two char positions.
fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let byte_at = |pos: usize| {
        text.char_indices()
            .nth(pos)
            .map(|(i, _)| i)
            .unwrap_or(text.len())
    };
    let (start, end) = (byte_at(start), byte_at(end));
    &text[start..end.max(start)]
}

fn trim_segments(
    estimator: &dyn TokenEstimator,
    windows: &Windows<'_>,
    limit: usize,
) -> Vec<Segment> {
    SegmentKind::ALL
        .iter()
        .filter_map(|&kind| {
            let text = trim_to_token_limit(estimator, windows.get(kind), limit);
            (!text.trim().is_empty()).then(|| Segment {
                kind,
                text: text.to_string(),
            })
        })
        .collect()
}

fn render(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| format!("{}\n{}", s.kind.label(), s.text).trim().to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build a labeled begin / middle / end sample of `text`.
///
/// Every segment is trimmed to `segment_max_tokens`. When the combined sample
/// exceeds `total_budget`, all segments are re-trimmed once with a
/// proportionally reduced limit (never below `min_segment_tokens`). If the
/// result is still over budget it is returned as is with `over_budget` set.
pub fn build_sample(estimator: &dyn TokenEstimator, text: &str, config: &SampleConfig) -> Sample {
    let full = text.trim();
    if full.is_empty() {
        return Sample::empty(config);
    }

    let windows = Windows::cut(full, config);

    let mut limit = config.segment_max_tokens;
    let mut segments = trim_segments(estimator, &windows, limit);
    let mut combined = render(&segments);
    let mut total = estimator.estimate_tokens(&combined);
    let mut budget_corrected = false;

    if total > config.total_budget {
        let scaled = (config.segment_max_tokens as u128 * config.total_budget as u128
            / total.max(1) as u128) as usize;
        limit = scaled
            .max(config.min_segment_tokens)
            .min(config.segment_max_tokens);
        debug!(
            total,
            budget = config.total_budget,
            new_limit = limit,
            "sample over budget, shrinking segments"
        );

        segments = trim_segments(estimator, &windows, limit);
        combined = render(&segments);
        total = estimator.estimate_tokens(&combined);
        budget_corrected = true;
    }

    let over_budget = total > config.total_budget;
    if over_budget {
        warn!(
            total,
            budget = config.total_budget,
            segment_limit = limit,
            "sample still over budget after correction"
        );
    }

    let meta = SampleMeta {
        segment_max_tokens: config.segment_max_tokens,
        target_total_sample_tokens: config.total_budget,
        actual_total_sample_tokens: total,
        segments_included: segments.iter().map(|s| s.kind.label().to_string()).collect(),
        effective_segment_tokens: limit,
        budget_corrected,
        over_budget,
    };

    Sample {
        text: combined,
        segments,
        meta,
    }
}
