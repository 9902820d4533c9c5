//! Command line argument parsing for the Tessera CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::chunking::ChunkingScheme;

/// Tessera - feature encoding and training data plumbing for ML pipelines
#[derive(Parser, Debug, Clone)]
#[command(name = "tessera")]
#[command(about = "Encode feature trees into training data, IDF tables and chunk outcomes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct TesseraArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl TesseraArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Encode labeled instances and write training data
    Train(TrainArgs),

    /// Collect document frequencies into a stored IDF table
    Idf(IdfArgs),

    /// Encode instances with a trained feature dictionary
    Encode(EncodeArgs),

    /// Convert between chunks and per-token outcomes
    Chunk(ChunkArgs),
}

/// Arguments for writing training data
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Instances, one JSON object per line: {"features": [...], "outcome": ...}
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory receiving the training files, lookups and manifest
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Training data layout
    #[arg(short, long, default_value = "binary")]
    pub writer: WriterKind,

    /// Directory holding IDF tables for tfidf encoders
    #[arg(long, value_name = "IDF_DIR")]
    pub idf_dir: Option<PathBuf>,
}

/// Arguments for collecting document frequencies
#[derive(Parser, Debug, Clone)]
pub struct IdfArgs {
    /// Instances, one JSON object per line: {"features": [...]}
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory holding the tables
    #[arg(value_name = "ROOT_DIR")]
    pub root: PathBuf,

    /// Table name (default table if omitted)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Only consume counts carrying this identifier
    #[arg(short, long)]
    pub identifier: Option<String>,
}

/// Arguments for encoding with a trained dictionary
#[derive(Parser, Debug, Clone)]
pub struct EncodeArgs {
    /// Directory written by `train`
    #[arg(value_name = "MODEL_DIR")]
    pub model_dir: PathBuf,

    /// Instances, one JSON object per line: {"features": [...]}
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding IDF tables for tfidf encoders
    #[arg(long, value_name = "IDF_DIR")]
    pub idf_dir: Option<PathBuf>,
}

/// Arguments for chunk conversion
#[derive(Parser, Debug, Clone)]
pub struct ChunkArgs {
    /// Sequences, one JSON object per line:
    /// {"tokens": [{"start": 0, "end": 3}, ...], "chunks": [...]} or {"tokens": ..., "outcomes": [...]}
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Chunking scheme (overrides the configuration)
    #[arg(short, long)]
    pub scheme: Option<SchemeArg>,

    /// Conversion direction
    #[arg(short, long, default_value = "outcomes")]
    pub to: ChunkTarget,

    /// Drop labels from outcomes and chunks
    #[arg(long)]
    pub no_labels: bool,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Training data layouts
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterKind {
    /// One SVMlight file with +1/-1 labels
    Binary,
    /// One SVMlight file per class (one-vs-all)
    Ova,
}

/// Chunking schemes selectable on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeArg {
    Io,
    Bio,
}

impl From<SchemeArg> for ChunkingScheme {
    fn from(scheme: SchemeArg) -> Self {
        match scheme {
            SchemeArg::Io => ChunkingScheme::Io,
            SchemeArg::Bio => ChunkingScheme::Bio,
        }
    }
}

/// What `chunk` produces
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkTarget {
    /// Chunks in, one outcome per token out
    Outcomes,
    /// Outcomes in, chunks out
    Chunks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_args() {
        let args = TesseraArgs::try_parse_from([
            "tessera",
            "train",
            "instances.jsonl",
            "/tmp/model",
            "--writer",
            "ova",
            "--config",
            "pipeline.json",
        ])
        .unwrap();

        if let Command::Train(train_args) = args.command {
            assert_eq!(train_args.input, PathBuf::from("instances.jsonl"));
            assert_eq!(train_args.output_dir, PathBuf::from("/tmp/model"));
            assert_eq!(train_args.writer, WriterKind::Ova);
            assert_eq!(train_args.config, Some(PathBuf::from("pipeline.json")));
            assert!(train_args.idf_dir.is_none());
        } else {
            panic!("Expected Train command");
        }
    }

    #[test]
    fn test_idf_args() {
        let args = TesseraArgs::try_parse_from([
            "tessera", "idf", "docs.jsonl", "/tmp/idf", "--name", "body", "-i", "tokens",
        ])
        .unwrap();

        if let Command::Idf(idf_args) = args.command {
            assert_eq!(idf_args.name.as_deref(), Some("body"));
            assert_eq!(idf_args.identifier.as_deref(), Some("tokens"));
        } else {
            panic!("Expected Idf command");
        }
    }

    #[test]
    fn test_chunk_args() {
        let args = TesseraArgs::try_parse_from([
            "tessera",
            "chunk",
            "sequences.jsonl",
            "--scheme",
            "io",
            "--to",
            "chunks",
            "--no-labels",
        ])
        .unwrap();

        if let Command::Chunk(chunk_args) = args.command {
            assert_eq!(chunk_args.scheme, Some(SchemeArg::Io));
            assert_eq!(chunk_args.to, ChunkTarget::Chunks);
            assert!(chunk_args.no_labels);
        } else {
            panic!("Expected Chunk command");
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let args = TesseraArgs::try_parse_from(["tessera", "chunk", "in.jsonl"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = TesseraArgs::try_parse_from(["tessera", "-vv", "chunk", "in.jsonl"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        let args =
            TesseraArgs::try_parse_from(["tessera", "--quiet", "-vvv", "chunk", "in.jsonl"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args =
            TesseraArgs::try_parse_from(["tessera", "--format", "json", "chunk", "in.jsonl"]).unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
        assert!(TesseraArgs::try_parse_from(["tessera", "--format", "yaml", "chunk", "x"]).is_err());
    }
}
