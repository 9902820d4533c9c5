//! Training data writers.
//!
//! A [`DataWriter`] serializes one encoded instance at a time. Writers are
//! generic over the outcome type they accept: the binary writer takes `bool`,
//! the one-vs-all writer takes any orderable label (class ids in practice).
//! [`session::TrainingSession`] ties a features encoder, an outcome encoder
//! and a writer to one output directory.

use crate::error::Result;
use crate::vector::SparseVector;

pub mod binary;
pub mod outcome;
pub mod ova;
pub mod session;
pub mod svmlight;

pub use binary::BinaryDataWriter;
pub use outcome::{BooleanOutcomeEncoder, OutcomeEncoder, StringOutcomeEncoder};
pub use ova::OvaDataWriter;
pub use session::{BinarySession, Manifest, OvaSession, TrainingSession};

/// Sink for encoded training instances.
pub trait DataWriter<O> {
    /// Short name recorded in the run manifest.
    fn kind(&self) -> &'static str;

    /// Write one labeled instance.
    fn write(&mut self, vector: &SparseVector, outcome: O) -> Result<()>;

    /// Write one instance without a label.
    fn write_unlabeled(&mut self, vector: &SparseVector) -> Result<()>;

    /// Flush and close every output. Calling it again is a no-op.
    fn finish(&mut self) -> Result<()>;

    /// Labels of the classes seen so far, for writers that track them.
    fn classes(&self) -> Vec<String> {
        Vec::new()
    }
}
