//! One-vs-all SVMlight writer.
//!
//! Every instance is appended as a negative example to an all-false template
//! file. The first time a class shows up, the template is copied to that
//! class's file, which therefore already holds every earlier instance as a
//! negative. From then on each instance is written as `+1` to its own class
//! file and `-1` to all the others. The template is deleted by
//! [`DataWriter::finish`].

use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::Write;
use std::sync::Arc;

use crate::context::PipelineContext;
use crate::error::{Result, TesseraError};
use crate::storage::{Storage, StorageOutput};
use crate::vector::SparseVector;
use crate::writer::DataWriter;
use crate::writer::svmlight::{self, NEGATIVE, POSITIVE, UNLABELED};

/// Template file holding every instance as a negative example.
pub const ALL_FALSE_FILE: &str = "training-data-allfalse.svmlight";

/// File holding the binary problem for one class.
pub fn class_file_name<L: Display>(label: &L) -> String {
    format!("training-data-{label}.svmlight")
}

#[derive(Debug)]
pub struct OvaDataWriter<L: Ord + Clone + Display> {
    storage: Arc<dyn Storage>,
    context: PipelineContext,
    all_false: Option<Box<dyn StorageOutput>>,
    classes: BTreeMap<L, Box<dyn StorageOutput>>,
    instances: u64,
    finished: bool,
}

impl<L: Ord + Clone + Display> OvaDataWriter<L> {
    /// Start a new one-vs-all data set in `storage`.
    pub fn create(storage: Arc<dyn Storage>, context: PipelineContext) -> Result<Self> {
        let all_false = storage.create_output(ALL_FALSE_FILE)?;
        Ok(OvaDataWriter {
            storage,
            context: context.child("ova"),
            all_false: Some(all_false),
            classes: BTreeMap::new(),
            instances: 0,
            finished: false,
        })
    }

    pub fn instances(&self) -> u64 {
        self.instances
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    fn all_false(&mut self) -> Result<&mut Box<dyn StorageOutput>> {
        self.all_false
            .as_mut()
            .ok_or_else(|| TesseraError::invalid_operation("one-vs-all writer is finished"))
    }

    /// Register `label`, seeding its file with every instance written so far.
    fn add_class(&mut self, label: &L) -> Result<()> {
        let file_name = class_file_name(label);
        self.all_false()?.flush_and_sync()?;

        self.storage.delete_file(&file_name)?;
        self.storage.copy_file(ALL_FALSE_FILE, &file_name)?;
        let output = self.storage.create_output_append(&file_name)?;
        self.classes.insert(label.clone(), output);

        log::info!(
            target: self.context.target(),
            "new class {label} after {} instances",
            self.instances
        );
        Ok(())
    }

    fn write_to_all(
        &mut self,
        label_for: impl Fn(Option<&L>) -> &'static str,
        features: &str,
    ) -> Result<()> {
        if self.finished {
            return Err(TesseraError::invalid_operation("one-vs-all writer is finished"));
        }
        for (label, output) in self.classes.iter_mut() {
            writeln!(output, "{}{features}", label_for(Some(label)))?;
        }
        let template_label = label_for(None);
        writeln!(self.all_false()?, "{template_label}{features}")?;
        self.instances += 1;
        Ok(())
    }
}

impl<L: Ord + Clone + Display> DataWriter<L> for OvaDataWriter<L> {
    fn kind(&self) -> &'static str {
        "one-vs-all"
    }

    fn write(&mut self, vector: &SparseVector, outcome: L) -> Result<()> {
        let features = svmlight::format_features(vector)?;
        if self.finished {
            return Err(TesseraError::invalid_operation("one-vs-all writer is finished"));
        }
        if !self.classes.contains_key(&outcome) {
            self.add_class(&outcome)?;
        }

        self.write_to_all(
            |label| match label {
                Some(label) if *label == outcome => POSITIVE,
                _ => NEGATIVE,
            },
            &features,
        )
    }

    fn write_unlabeled(&mut self, vector: &SparseVector) -> Result<()> {
        let features = svmlight::format_features(vector)?;
        self.write_to_all(|_| UNLABELED, &features)
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let mut errors = Vec::new();
        if let Some(mut all_false) = self.all_false.take() {
            if let Err(e) = all_false.close() {
                errors.push(TesseraError::persistence(format!(
                    "Failed to close {ALL_FALSE_FILE}: {e}"
                )));
            }
        }
        if let Err(e) = self.storage.delete_file(ALL_FALSE_FILE) {
            errors.push(TesseraError::persistence(format!(
                "Failed to delete {ALL_FALSE_FILE}: {e}"
            )));
        }
        for (label, output) in self.classes.iter_mut() {
            if let Err(e) = output.close() {
                errors.push(TesseraError::persistence(format!(
                    "Failed to close {}: {e}",
                    class_file_name(label)
                )));
            }
        }

        for error in &errors {
            log::error!(target: self.context.target(), "{error}");
        }
        log::info!(
            target: self.context.target(),
            "wrote {} instances for {} classes",
            self.instances,
            self.classes.len()
        );
        TesseraError::aggregate(errors)
    }

    fn classes(&self) -> Vec<String> {
        self.classes.keys().map(|label| label.to_string()).collect()
    }
}

impl<L: Ord + Clone + Display> Drop for OvaDataWriter<L> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        log::warn!(
            target: self.context.target(),
            "one-vs-all writer dropped before finish; output is incomplete"
        );
        if let Some(mut all_false) = self.all_false.take() {
            let _ = all_false.close();
        }
        for output in self.classes.values_mut() {
            let _ = output.close();
        }
    }
}
