//! Fixed-size splitter.
//!
//! Packs whole lines into chunks of at most `max_tokens`, drops to word
//! packing for a line that is too large on its own, then verifies every
//! chunk against the estimator before it is emitted.

use tracing::debug;

use crate::estimator::TokenEstimator;
use crate::types::{Chunk, ChunkConfig};

// ── Public entry points ─────────────────────────────────────────────────────

/// Split `text` into ordered chunk strings, each estimated at `<= max_tokens`
/// (a single word that is larger on its own is emitted alone).
///
/// Text that already fits comes back as one chunk equal to the input.
/// Whitespace-only input yields no chunks.
pub fn split_by_tokens(
    estimator: &dyn TokenEstimator,
    text: &str,
    max_tokens: usize,
) -> Vec<String> {
    split_measured(estimator, text, max_tokens.max(1))
        .into_iter()
        .map(|(content, _)| content)
        .collect()
}

/// Split `text` per `config`, attaching indices, token counts and overlap.
pub fn split_text(estimator: &dyn TokenEstimator, text: &str, config: &ChunkConfig) -> Vec<Chunk> {
    let max_tokens = config.max_tokens.max(1);
    let pieces = split_measured(estimator, text, max_tokens);
    let pieces = apply_overlap(estimator, pieces, config.overlap_words, max_tokens);

    debug!(
        estimator = estimator.name(),
        max_tokens,
        chunks = pieces.len(),
        "split text into chunks"
    );

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, (content, token_count))| Chunk {
            index,
            content,
            token_count,
        })
        .collect()
}

// ── Packing ─────────────────────────────────────────────────────────────────

/// Line buffer with a running token sum.
#[derive(Default)]
struct Buffer<'a> {
    parts: Vec<&'a str>,
    tokens: usize,
}

impl<'a> Buffer<'a> {
    fn would_overflow(&self, tokens: usize, max_tokens: usize) -> bool {
        !self.parts.is_empty() && self.tokens + tokens > max_tokens
    }

    fn push(&mut self, part: &'a str, tokens: usize) {
        self.parts.push(part);
        self.tokens += tokens;
    }

    fn take(&mut self, sep: &str) -> Option<String> {
        if self.parts.is_empty() {
            return None;
        }
        let joined = self.parts.join(sep);
        self.parts.clear();
        self.tokens = 0;
        Some(joined)
    }
}

fn split_measured(
    estimator: &dyn TokenEstimator,
    text: &str,
    max_tokens: usize,
) -> Vec<(String, usize)> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let total = estimator.estimate_tokens(text);
    if total <= max_tokens {
        return vec![(text.to_string(), total)];
    }

    let mut fragments: Vec<String> = Vec::new();
    let mut lines = Buffer::default();

    for line in text.split('\n') {
        let line_tokens = estimator.estimate_tokens(&format!("{line}\n"));

        if line_tokens > max_tokens {
            // Keep line chunks and word chunks apart, in source order.
            fragments.extend(lines.take("\n"));
            pack_words(estimator, line, max_tokens, &mut fragments);
            continue;
        }

        if lines.would_overflow(line_tokens, max_tokens) {
            fragments.extend(lines.take("\n"));
        }
        lines.push(line, line_tokens);
    }
    fragments.extend(lines.take("\n"));

    let mut out = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        enforce_limit(estimator, fragment, max_tokens, &mut out);
    }
    out
}

fn pack_words(
    estimator: &dyn TokenEstimator,
    line: &str,
    max_tokens: usize,
    fragments: &mut Vec<String>,
) {
    let mut words = Buffer::default();
    for word in line.split_whitespace() {
        let word_tokens = estimator.estimate_tokens(&format!("{word} "));
        if words.would_overflow(word_tokens, max_tokens) {
            fragments.extend(words.take(" "));
        }
        words.push(word, word_tokens);
    }
    fragments.extend(words.take(" "));
}

/// Measure `fragment` once. If it is over the limit (tokenizers are not
/// strictly additive), halve it at a line or word boundary and recurse.
fn enforce_limit(
    estimator: &dyn TokenEstimator,
    fragment: String,
    max_tokens: usize,
    out: &mut Vec<(String, usize)>,
) {
    if fragment.trim().is_empty() {
        return;
    }
    let tokens = estimator.estimate_tokens(&fragment);
    if tokens <= max_tokens {
        out.push((fragment, tokens));
        return;
    }
    match halve(&fragment) {
        Some((left, right)) => {
            enforce_limit(estimator, left, max_tokens, out);
            enforce_limit(estimator, right, max_tokens, out);
        }
        // A single word: emitted alone.
        None => out.push((fragment, tokens)),
    }
}

fn halve(fragment: &str) -> Option<(String, String)> {
    let lines: Vec<&str> = fragment.split('\n').collect();
    if lines.len() > 1 {
        let mid = lines.len() / 2;
        return Some((lines[..mid].join("\n"), lines[mid..].join("\n")));
    }
    let words: Vec<&str> = fragment.split_whitespace().collect();
    if words.len() > 1 {
        let mid = words.len() / 2;
        return Some((words[..mid].join(" "), words[mid..].join(" ")));
    }
    None
}

// ── Overlap ─────────────────────────────────────────────────────────────────

/// Extract the last `overlap_words` words from `text`.
pub(crate) fn get_overlap_words(text: &str, overlap_words: usize) -> Vec<&str> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let start = words.len().saturating_sub(overlap_words);
    words[start..].to_vec()
}

/// Prefix each chunk after the first with the tail of its predecessor,
/// dropping leading overlap words until the chunk fits again.
fn apply_overlap(
    estimator: &dyn TokenEstimator,
    pieces: Vec<(String, usize)>,
    overlap_words: usize,
    max_tokens: usize,
) -> Vec<(String, usize)> {
    if overlap_words == 0 || pieces.len() < 2 {
        return pieces;
    }

    let mut out = Vec::with_capacity(pieces.len());
    for (i, (content, tokens)) in pieces.iter().enumerate() {
        if i == 0 {
            out.push((content.clone(), *tokens));
            continue;
        }
        let tail = get_overlap_words(&pieces[i - 1].0, overlap_words);
        let mut with_overlap = None;
        for start in 0..tail.len() {
            let candidate = format!("{} {}", tail[start..].join(" "), content);
            let candidate_tokens = estimator.estimate_tokens(&candidate);
            if candidate_tokens <= max_tokens {
                with_overlap = Some((candidate, candidate_tokens));
                break;
            }
        }
        out.push(with_overlap.unwrap_or_else(|| (content.clone(), *tokens)));
    }
    out
}
