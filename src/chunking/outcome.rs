//! Per-token chunk outcomes such as `B-PER`, `I-PER` and `O`.

use std::fmt;

use crate::error::{Result, TesseraError};

/// Position of a token relative to a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// First token of a chunk.
    B,
    /// Inside a chunk.
    I,
    /// Outside any chunk.
    O,
}

impl Prefix {
    pub fn as_char(self) -> char {
        match self {
            Prefix::B => 'B',
            Prefix::I => 'I',
            Prefix::O => 'O',
        }
    }
}

/// A parsed outcome: a prefix and an optional label (empty if absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub prefix: Prefix,
    pub label: String,
}

impl ChunkOutcome {
    pub fn new<S: Into<String>>(prefix: Prefix, label: S) -> Self {
        ChunkOutcome {
            prefix,
            label: label.into(),
        }
    }

    /// The outcome of a token outside every chunk.
    pub fn outside() -> Self {
        ChunkOutcome::new(Prefix::O, "")
    }

    /// Parse `B`, `I`, `O`, optionally followed by `-label`.
    pub fn parse(outcome: &str) -> Result<Self> {
        let mut chars = outcome.chars();
        let prefix = match chars.next() {
            Some('B') => Prefix::B,
            Some('I') => Prefix::I,
            Some('O') => Prefix::O,
            _ => {
                return Err(TesseraError::malformed_outcome(format!(
                    "{outcome:?} does not start with B, I or O"
                )));
            }
        };
        let label = match chars.next() {
            None => "",
            Some('-') => &outcome[2..],
            Some(_) => {
                return Err(TesseraError::malformed_outcome(format!(
                    "{outcome:?} has no '-' between prefix and label"
                )));
            }
        };
        Ok(ChunkOutcome::new(prefix, label))
    }

    pub fn is_outside(&self) -> bool {
        self.prefix == Prefix::O
    }
}

impl fmt::Display for ChunkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "{}", self.prefix.as_char())
        } else {
            write!(f, "{}-{}", self.prefix.as_char(), self.label)
        }
    }
}
