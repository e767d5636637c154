//! Token estimation.
//!
//! [`TokenEstimator`] is the infallible interface the splitter, trimmer and
//! sampler call. Exact counters (local BPE, remote count endpoints) implement
//! the fallible [`TokenCounter`] instead and are wrapped in a
//! [`FallbackEstimator`], which substitutes a character-ratio estimate when
//! the counter errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CountError {
    #[error("token counter unavailable: {0}")]
    Unavailable(String),
    #[error("token count request failed: {0}")]
    Request(String),
    #[error("invalid token count response: {0}")]
    InvalidResponse(String),
}

/// Maps text to a token count. Must always return a value.
pub trait TokenEstimator: Send + Sync {
    fn estimate_tokens(&self, text: &str) -> usize;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}

impl<T: TokenEstimator + ?Sized> TokenEstimator for &T {
    fn estimate_tokens(&self, text: &str) -> usize {
        (**self).estimate_tokens(text)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: TokenEstimator + ?Sized> TokenEstimator for Box<T> {
    fn estimate_tokens(&self, text: &str) -> usize {
        (**self).estimate_tokens(text)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: TokenEstimator + ?Sized> TokenEstimator for Arc<T> {
    fn estimate_tokens(&self, text: &str) -> usize {
        (**self).estimate_tokens(text)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// An exact token counter that may fail (network, missing model files).
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize, CountError>;

    fn name(&self) -> &str;
}

// ── Character ratio ─────────────────────────────────────────────────────────

/// `ceil(chars / chars_per_token)`, counted in Unicode scalar values.
///
/// Rounding up keeps the estimate subadditive, so a buffer assembled from
/// pieces never measures more than the sum of its pieces.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_token: usize,
}

impl CharRatioEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    pub fn chars_per_token(&self) -> usize {
        self.chars_per_token
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(3)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    fn name(&self) -> &str {
        "chars"
    }
}

// ── tiktoken ────────────────────────────────────────────────────────────────

/// Local `cl100k_base` BPE. Not the tokenizer Gemini uses, but close enough
/// for budgeting and free of network calls.
pub struct TiktokenCounter {
    bpe: tiktoken_rs::CoreBPE,
}

impl TiktokenCounter {
    pub fn new() -> Result<Self, CountError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| CountError::Unavailable(format!("cl100k_base: {e}")))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, CountError> {
        Ok(self.bpe.encode_with_special_tokens(text).len())
    }

    fn name(&self) -> &str {
        "tiktoken"
    }
}

// ── Fallback wrapper ────────────────────────────────────────────────────────

/// Turns a fallible [`TokenCounter`] into a [`TokenEstimator`].
///
/// Counter errors are logged (warn on the first, debug afterwards) and
/// replaced with the character-ratio estimate. They never reach the caller.
pub struct FallbackEstimator<C> {
    counter: C,
    fallback: CharRatioEstimator,
    warned: AtomicBool,
}

impl<C: TokenCounter> FallbackEstimator<C> {
    pub fn new(counter: C, fallback: CharRatioEstimator) -> Self {
        Self {
            counter,
            fallback,
            warned: AtomicBool::new(false),
        }
    }
}

impl<C: TokenCounter> TokenEstimator for FallbackEstimator<C> {
    fn estimate_tokens(&self, text: &str) -> usize {
        match self.counter.count_tokens(text) {
            Ok(n) => n,
            Err(e) => {
                if !self.warned.swap(true, Ordering::Relaxed) {
                    warn!(
                        counter = self.counter.name(),
                        error = %e,
                        "token counting failed, using character estimate"
                    );
                } else {
                    debug!(counter = self.counter.name(), error = %e, "token counting failed");
                }
                self.fallback.estimate_tokens(text)
            }
        }
    }

    fn name(&self) -> &str {
        self.counter.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct FailingCounter {
        calls: AtomicUsize,
    }

    impl TokenCounter for FailingCounter {
        fn count_tokens(&self, _text: &str) -> Result<usize, CountError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(CountError::Request("connection refused".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct FixedCounter(usize);

    impl TokenCounter for FixedCounter {
        fn count_tokens(&self, _text: &str) -> Result<usize, CountError> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn char_ratio_rounds_up() {
        let est = CharRatioEstimator::new(3);
        assert_eq!(est.estimate_tokens(""), 0);
        assert_eq!(est.estimate_tokens("a"), 1);
        assert_eq!(est.estimate_tokens("abc"), 1);
        assert_eq!(est.estimate_tokens("abcd"), 2);
    }

    #[test]
    fn char_ratio_counts_scalar_values_not_bytes() {
        let est = CharRatioEstimator::new(1);
        assert_eq!(est.estimate_tokens("نص"), 2);
    }

    #[test]
    fn zero_ratio_is_clamped() {
        let est = CharRatioEstimator::new(0);
        assert_eq!(est.chars_per_token(), 1);
        assert_eq!(est.estimate_tokens("abcd"), 4);
    }

    #[test]
    fn fallback_used_when_counter_fails() {
        let est = FallbackEstimator::new(
            FailingCounter { calls: AtomicUsize::new(0) },
            CharRatioEstimator::new(3),
        );
        assert_eq!(est.estimate_tokens("abcdef"), 2);
        assert_eq!(est.estimate_tokens("abcdefg"), 3);
        assert_eq!(est.counter.calls.load(Ordering::Relaxed), 2);
        assert_eq!(est.name(), "failing");
    }

    #[test]
    fn counter_value_wins_when_available() {
        let est = FallbackEstimator::new(FixedCounter(42), CharRatioEstimator::default());
        assert_eq!(est.estimate_tokens("anything"), 42);
    }

    #[test]
    fn smart_pointers_delegate() {
        let est: Arc<dyn TokenEstimator> = Arc::new(CharRatioEstimator::new(2));
        assert_eq!(est.estimate_tokens("abcd"), 2);
        let boxed: Box<dyn TokenEstimator> = Box::new(CharRatioEstimator::new(2));
        assert_eq!(boxed.estimate_tokens("abc"), 2);
    }

    #[test]
    fn tiktoken_counts_english() {
        let counter = TiktokenCounter::new().unwrap();
        let n = counter.count_tokens("hello world").unwrap();
        assert_eq!(n, 2);
    }
}
