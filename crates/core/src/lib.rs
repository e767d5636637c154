pub mod config;
pub mod error;
pub mod source;
pub mod stats;

pub use config::Config;
pub use error::*;
pub use source::NovelSource;
pub use stats::TextStats;
