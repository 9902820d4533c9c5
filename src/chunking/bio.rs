//! BIO chunking: `B` on the first covered token, `I` on the rest.

use crate::chunking::Chunking;
use crate::chunking::outcome::{ChunkOutcome, Prefix};

#[derive(Debug, Clone, Copy)]
pub struct BioChunking {
    with_labels: bool,
}

impl BioChunking {
    pub fn new(with_labels: bool) -> Self {
        BioChunking { with_labels }
    }
}

impl Chunking for BioChunking {
    fn name(&self) -> &'static str {
        "bio"
    }

    fn with_labels(&self) -> bool {
        self.with_labels
    }

    fn prefix_at(&self, position: usize) -> Prefix {
        if position == 0 { Prefix::B } else { Prefix::I }
    }

    fn is_end_of_chunk(&self, current: &ChunkOutcome, next: &ChunkOutcome) -> bool {
        next.prefix == Prefix::O || next.prefix == Prefix::B || next.label != current.label
    }
}
