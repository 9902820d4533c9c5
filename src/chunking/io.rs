//! IO chunking: every covered token is `I`.

use crate::chunking::Chunking;
use crate::chunking::outcome::{ChunkOutcome, Prefix};

/// IO scheme. Adjacent chunks with the same label cannot be told apart and
/// decode as one chunk.
#[derive(Debug, Clone, Copy)]
pub struct IoChunking {
    with_labels: bool,
}

impl IoChunking {
    pub fn new(with_labels: bool) -> Self {
        IoChunking { with_labels }
    }
}

impl Chunking for IoChunking {
    fn name(&self) -> &'static str {
        "io"
    }

    fn with_labels(&self) -> bool {
        self.with_labels
    }

    fn prefix_at(&self, _position: usize) -> Prefix {
        Prefix::I
    }

    fn is_end_of_chunk(&self, current: &ChunkOutcome, next: &ChunkOutcome) -> bool {
        next.prefix == Prefix::O || next.label != current.label
    }
}
