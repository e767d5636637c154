//! Splitter, trimmer and sampler driven by a real BPE tokenizer.

use novelmeta_chunker::{
    build_sample, split_by_tokens, split_text, trim_to_token_limit, CharRatioEstimator, ChunkConfig,
    FallbackEstimator, SampleConfig, TiktokenCounter, TokenEstimator,
};

fn estimator() -> FallbackEstimator<TiktokenCounter> {
    FallbackEstimator::new(TiktokenCounter::new().unwrap(), CharRatioEstimator::new(3))
}

fn novel_text() -> String {
    let paragraph = "خرج سعيد مهران من السجن في يوم قائظ، وراح يمشي في الطريق الطويل \
                     وهو يفكر في الخيانة. قال لنفسه: لن أنسى أبدا!\n";
    paragraph.repeat(200)
}

#[test]
fn chunks_fit_limit_and_keep_word_order() {
    let est = estimator();
    let text = novel_text();
    let chunks = split_by_tokens(&est, &text, 300);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        let tokens = est.estimate_tokens(chunk);
        assert!(
            tokens <= 300 || chunk.split_whitespace().count() == 1,
            "chunk of {tokens} tokens"
        );
    }

    let original: Vec<&str> = text.split_whitespace().collect();
    let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
    assert_eq!(rejoined, original);
}

#[test]
fn overlap_keeps_limit() {
    let est = estimator();
    let text = novel_text();
    let config = ChunkConfig {
        max_tokens: 250,
        overlap_words: 15,
    };
    let chunks = split_text(&est, &text, &config);
    for pair in chunks.windows(2) {
        assert!(pair[1].token_count <= 250);
        assert_eq!(pair[1].token_count, est.estimate_tokens(&pair[1].content));
    }
}

#[test]
fn trim_returns_longest_fitting_prefix() {
    let est = estimator();
    let text = novel_text();
    let trimmed = trim_to_token_limit(&est, &text, 100);

    assert!(text.starts_with(trimmed));
    assert!(est.estimate_tokens(trimmed) <= 100);
    assert!(!trimmed.is_empty() && trimmed.len() < text.len());
}

#[test]
fn sample_respects_segment_limit() {
    let est = estimator();
    let text = novel_text();
    let config = SampleConfig {
        segment_max_tokens: 400,
        total_budget: 1_100,
        chars_per_token: 4,
        min_segment_tokens: 100,
    };
    let sample = build_sample(&est, &text, &config);

    assert_eq!(sample.segments.len(), 3);
    for segment in &sample.segments {
        assert!(est.estimate_tokens(&segment.text) <= sample.meta.effective_segment_tokens);
    }
    assert_eq!(sample.meta.actual_total_sample_tokens, est.estimate_tokens(&sample.text));
    assert!(sample.meta.actual_total_sample_tokens <= 1_100 || sample.meta.over_budget);
}
