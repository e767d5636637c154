use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Token-bounded chunking, sampling and metadata extraction for Arabic novels.
#[derive(Parser, Debug)]
#[command(name = "novelmeta", version)]
pub struct CliArgs {
    /// Config profile; keys are read as {PROFILE}_{KEY} before {KEY}
    #[arg(long, env = "NOVELMETA_PROFILE")]
    pub profile: Option<String>,

    /// Token estimator (overrides TOKEN_ESTIMATOR)
    #[arg(long, value_parser = ["gemini", "tiktoken", "chars"])]
    pub estimator: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split a novel into token-bounded chunks and print a summary
    Chunk {
        /// Novel file (.txt or page-JSON)
        path: PathBuf,

        /// Maximum tokens per chunk
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Words carried over from the previous chunk
        #[arg(long)]
        overlap_words: Option<usize>,
    },

    /// Build the begin/middle/end sample and print its metadata
    Sample {
        path: PathBuf,

        /// Token limit for each segment
        #[arg(long)]
        segment_tokens: Option<usize>,

        /// Token budget for the whole sample
        #[arg(long)]
        total_tokens: Option<usize>,

        /// Also print the sample text
        #[arg(long)]
        print_text: bool,
    },

    /// Extract novel metadata with the LLM and save it
    Metadata {
        path: PathBuf,

        /// Output file (default: {DATA_DIR}/outputs/metadata/{name}_metadata.json)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Extract characters and dialogues chunk by chunk and save them
    Ingest {
        path: PathBuf,

        /// Directory for the characters/dialogues files
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Novel ID (default: file name with spaces replaced by underscores)
        #[arg(long)]
        novel_id: Option<String>,
    },
}
