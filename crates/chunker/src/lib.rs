//! Token-bounded chunking and representative sampling.
//!
//! - [`split_text`] / [`split_by_tokens`] cut a full text into chunks that each
//!   fit a token limit, preferring line boundaries and falling back to words.
//! - [`trim_to_token_limit`] finds the longest prefix within a limit by binary
//!   search over character positions.
//! - [`build_sample`] selects begin / middle / end segments that together fit
//!   a total budget.
//!
//! All of them measure text through a [`TokenEstimator`].

pub mod estimator;
mod sampler;
mod splitter;
mod trimmer;
mod types;

pub use estimator::{
    CharRatioEstimator, CountError, FallbackEstimator, TiktokenCounter, TokenCounter,
    TokenEstimator,
};
pub use sampler::build_sample;
pub use splitter::{split_by_tokens, split_text};
pub use trimmer::trim_to_token_limit;
pub use types::{Chunk, ChunkConfig, Sample, SampleConfig, SampleMeta, Segment, SegmentKind};
