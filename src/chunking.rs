//! Conversion between labeled spans and per-token chunk outcomes.
//!
//! Encoding marks every token covered by a chunk with `I` (IO) or with `B`
//! on the first token and `I` after it (BIO), optionally followed by
//! `-label`. Uncovered tokens get `O`.
//!
//! Decoding scans the outcomes with a synthetic trailing `O`. A chunk starts
//! at any token whose prefix is not `O` and extends until
//! [`Chunking::is_end_of_chunk`] says the next token starts something else.
//! Under IO, adjacent chunks with the same label therefore merge; BIO keeps
//! them apart because the second one starts with `B`.
//!
//! # Example
//!
//! ```
//! use tessera::chunking::{BioChunking, Chunk, Chunking, Span};
//!
//! # fn main() -> tessera::error::Result<()> {
//! let tokens = vec![Span::new(0, 4), Span::new(5, 10), Span::new(11, 14)];
//! let chunks = vec![Chunk::labeled(0, 10, "PER")];
//!
//! let scheme = BioChunking::new(true);
//! let outcomes = scheme.to_outcomes(&tokens, &chunks);
//! assert_eq!(outcomes, vec!["B-PER", "I-PER", "O"]);
//! assert_eq!(scheme.to_chunks(&tokens, &outcomes)?, chunks);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesseraError};

pub mod bio;
pub mod io;
pub mod outcome;

pub use bio::BioChunking;
pub use io::IoChunking;
pub use outcome::{ChunkOutcome, Prefix};

/// Character offsets `[start, end)` of a token or chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Whether `other` lies entirely within this span.
    pub fn covers(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A span with an optional label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Chunk {
    pub fn new(start: usize, end: usize) -> Self {
        Chunk {
            start,
            end,
            label: None,
        }
    }

    pub fn labeled<S: Into<String>>(start: usize, end: usize, label: S) -> Self {
        Chunk {
            start,
            end,
            label: Some(label.into()),
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// A chunk encoding scheme.
pub trait Chunking: Send + Sync + fmt::Debug {
    /// Get the name of this scheme.
    fn name(&self) -> &'static str;

    /// Whether outcomes carry `-label` and decoded chunks carry labels.
    fn with_labels(&self) -> bool;

    /// Prefix of the token at `position` (0-based) inside a chunk.
    fn prefix_at(&self, position: usize) -> Prefix;

    /// Whether the chunk containing `current` ends before `next`.
    fn is_end_of_chunk(&self, current: &ChunkOutcome, next: &ChunkOutcome) -> bool;

    /// One outcome per token. Where chunks overlap, the later chunk wins.
    fn to_outcomes(&self, tokens: &[Span], chunks: &[Chunk]) -> Vec<String> {
        let mut outcomes = vec![ChunkOutcome::outside(); tokens.len()];

        for chunk in chunks {
            let span = chunk.span();
            let label = match (&chunk.label, self.with_labels()) {
                (Some(label), true) => label.as_str(),
                _ => "",
            };
            let covered = tokens
                .iter()
                .enumerate()
                .filter(|(_, token)| span.covers(token));
            for (position, (index, _)) in covered.enumerate() {
                outcomes[index] = ChunkOutcome::new(self.prefix_at(position), label);
            }
        }

        outcomes.iter().map(ChunkOutcome::to_string).collect()
    }

    /// Rebuild chunks from one outcome per token.
    fn to_chunks(&self, tokens: &[Span], outcomes: &[String]) -> Result<Vec<Chunk>> {
        if tokens.len() != outcomes.len() {
            return Err(TesseraError::InstanceShapeMismatch {
                tokens: tokens.len(),
                outcomes: outcomes.len(),
            });
        }

        let mut parsed = outcomes
            .iter()
            .map(|outcome| ChunkOutcome::parse(outcome))
            .collect::<Result<Vec<_>>>()?;
        parsed.push(ChunkOutcome::outside());

        let mut chunks = Vec::new();
        let mut index = 0;
        while index < tokens.len() {
            if parsed[index].is_outside() {
                index += 1;
                continue;
            }

            let begin = index;
            while !self.is_end_of_chunk(&parsed[index], &parsed[index + 1]) {
                index += 1;
            }

            let label = &parsed[begin].label;
            chunks.push(Chunk {
                start: tokens[begin].start,
                end: tokens[index].end,
                label: (self.with_labels() && !label.is_empty()).then(|| label.clone()),
            });
            index += 1;
        }

        Ok(chunks)
    }
}

/// Serializable choice of a chunking scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingScheme {
    Io,
    #[default]
    Bio,
}

impl ChunkingScheme {
    pub fn build(self, with_labels: bool) -> Box<dyn Chunking> {
        match self {
            ChunkingScheme::Io => Box::new(IoChunking::new(with_labels)),
            ChunkingScheme::Bio => Box::new(BioChunking::new(with_labels)),
        }
    }
}
