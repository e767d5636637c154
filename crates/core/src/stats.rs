use serde::{Deserialize, Serialize};

/// Average silent reading speed used for the reading-time estimate.
const WORDS_PER_MINUTE: f64 = 250.0;

/// Content metrics computed locally from the full text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStats {
    pub total_characters: usize,
    pub total_words: usize,
    pub total_sentences: usize,
    pub total_paragraphs: usize,
    pub estimated_reading_time_minutes: f64,
}

impl TextStats {
    pub fn compute(text: &str) -> Self {
        let total_words = text.split_whitespace().count();
        let total_sentences = text
            .chars()
            .filter(|c| matches!(c, '.' | '!' | '?' | '؟'))
            .count();
        let total_paragraphs = text.split("\n\n").filter(|p| !p.trim().is_empty()).count();
        let minutes = total_words as f64 / WORDS_PER_MINUTE;

        Self {
            total_characters: text.chars().count(),
            total_words,
            total_sentences,
            total_paragraphs,
            estimated_reading_time_minutes: (minutes * 10.0).round() / 10.0,
        }
    }
}
