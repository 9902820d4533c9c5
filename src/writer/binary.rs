//! Binary SVMlight writer: one file, `+1`/`-1` labels.

use std::io::Write;
use std::sync::Arc;

use crate::context::PipelineContext;
use crate::error::{Result, TesseraError};
use crate::storage::{Storage, StorageOutput};
use crate::vector::SparseVector;
use crate::writer::DataWriter;
use crate::writer::svmlight::{self, NEGATIVE, POSITIVE, UNLABELED};

/// File written by [`BinaryDataWriter::create`].
pub const BINARY_TRAINING_FILE: &str = "training-data.svmlight";

#[derive(Debug)]
pub struct BinaryDataWriter {
    output: Option<Box<dyn StorageOutput>>,
    context: PipelineContext,
    instances: u64,
}

impl BinaryDataWriter {
    /// Create [`BINARY_TRAINING_FILE`] in `storage`.
    pub fn create(storage: &Arc<dyn Storage>, context: PipelineContext) -> Result<Self> {
        let output = storage.create_output(BINARY_TRAINING_FILE)?;
        Ok(Self::from_output(output, context))
    }

    /// Write to an already opened output.
    pub fn from_output(output: Box<dyn StorageOutput>, context: PipelineContext) -> Self {
        BinaryDataWriter {
            output: Some(output),
            context: context.child("binary"),
            instances: 0,
        }
    }

    pub fn instances(&self) -> u64 {
        self.instances
    }

    fn write_line(&mut self, label: &str, vector: &SparseVector) -> Result<()> {
        let line = svmlight::format_line(label, vector)?;
        let output = self
            .output
            .as_mut()
            .ok_or_else(|| TesseraError::invalid_operation("binary writer is finished"))?;
        output.write_all(line.as_bytes())?;
        self.instances += 1;
        Ok(())
    }
}

impl DataWriter<bool> for BinaryDataWriter {
    fn kind(&self) -> &'static str {
        "binary"
    }

    fn write(&mut self, vector: &SparseVector, outcome: bool) -> Result<()> {
        self.write_line(if outcome { POSITIVE } else { NEGATIVE }, vector)
    }

    fn write_unlabeled(&mut self, vector: &SparseVector) -> Result<()> {
        self.write_line(UNLABELED, vector)
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut output) = self.output.take() {
            output.close().map_err(|e| {
                TesseraError::persistence(format!("Failed to close {BINARY_TRAINING_FILE}: {e}"))
            })?;
            log::info!(
                target: self.context.target(),
                "wrote {} binary instances",
                self.instances
            );
        }
        Ok(())
    }
}

impl Drop for BinaryDataWriter {
    fn drop(&mut self) {
        if let Some(mut output) = self.output.take() {
            log::warn!(
                target: self.context.target(),
                "binary writer dropped before finish; output is incomplete"
            );
            let _ = output.close();
        }
    }
}
