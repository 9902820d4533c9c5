//! # Tessera
//!
//! Feature encoding and training data plumbing for machine learning
//! pipelines.
//!
//! ## Features
//!
//! - Feature trees with scalar, nested collection and count values
//! - An ordered encoder chain turning features into named numbers
//! - Growing and frozen string dictionaries for feature and outcome indices
//! - Sparse vectors written as SVMlight training data, binary or one-vs-all
//! - Document frequency tables for TF-IDF encoding
//! - IO and BIO conversion between labeled spans and per-token outcomes
//! - Pluggable storage backends (file and in-memory)

pub mod chunking;
pub mod cli;
pub mod config;
pub mod context;
pub mod dictionary;
pub mod encoder;
pub mod error;
pub mod feature;
pub mod idf;
pub mod storage;
pub mod util;
pub mod vector;
pub mod writer;

pub mod prelude {
    pub use crate::chunking::{BioChunking, Chunk, Chunking, ChunkingScheme, IoChunking, Span};
    pub use crate::config::PipelineConfig;
    pub use crate::context::PipelineContext;
    pub use crate::dictionary::StringDictionary;
    pub use crate::encoder::{EncoderChain, FeatureEncoder, FeaturesEncoder};
    pub use crate::error::{Result, TesseraError};
    pub use crate::feature::{Counts, Feature, FeatureCollection, FeatureValue};
    pub use crate::idf::{DocumentFrequencyTable, IdfCollector, IdfStore};
    pub use crate::storage::{Storage, StorageFactory};
    pub use crate::vector::SparseVector;
    pub use crate::writer::{BinarySession, DataWriter, OvaSession};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
