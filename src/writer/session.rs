//! A training run writing to one output directory.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::PipelineContext;
use crate::encoder::FeaturesEncoder;
use crate::error::{Result, TesseraError};
use crate::feature::Feature;
use crate::storage::Storage;
use crate::writer::DataWriter;
use crate::writer::binary::BinaryDataWriter;
use crate::writer::outcome::{BooleanOutcomeEncoder, OutcomeEncoder, StringOutcomeEncoder};
use crate::writer::ova::OvaDataWriter;

/// File describing a finished run.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current manifest layout.
pub const MANIFEST_VERSION: u32 = 1;

/// Summary of a finished training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub writer: String,
    pub instances: u64,
    pub unlabeled: u64,
    pub features: usize,
    pub classes: Vec<String>,
}

impl Manifest {
    pub fn save(&self, storage: &dyn Storage) -> Result<()> {
        let mut output = storage.create_output(MANIFEST_FILE)?;
        serde_json::to_writer_pretty(&mut output, self)?;
        output.close()
    }

    pub fn load(storage: &dyn Storage) -> Result<Self> {
        let text = storage.read_to_string(MANIFEST_FILE)?;
        let manifest: Manifest = serde_json::from_str(&text)?;
        if manifest.format_version != MANIFEST_VERSION {
            return Err(TesseraError::persistence(format!(
                "Unsupported manifest version {}",
                manifest.format_version
            )));
        }
        Ok(manifest)
    }
}

/// Encodes instances and hands them to a data writer.
///
/// [`TrainingSession::finish`] closes the writer, freezes and persists both
/// dictionaries and writes the [`Manifest`]. Every step is attempted even if
/// an earlier one fails; all failures are reported together.
pub struct TrainingSession<E, W>
where
    E: OutcomeEncoder,
    W: DataWriter<E::Encoded>,
{
    storage: Arc<dyn Storage>,
    context: PipelineContext,
    features: FeaturesEncoder,
    outcomes: E,
    writer: W,
    sort_lookup: bool,
    instances: u64,
    unlabeled: u64,
}

/// Binary classifier data: `bool` outcomes, one file.
pub type BinarySession = TrainingSession<BooleanOutcomeEncoder, BinaryDataWriter>;

/// Multi-class data: string outcomes, one file per class id.
pub type OvaSession = TrainingSession<StringOutcomeEncoder, OvaDataWriter<u32>>;

impl BinarySession {
    pub fn binary(
        storage: Arc<dyn Storage>,
        context: PipelineContext,
        features: FeaturesEncoder,
    ) -> Result<Self> {
        let writer = BinaryDataWriter::create(&storage, context.clone())?;
        Ok(TrainingSession::new(
            storage,
            context,
            features,
            BooleanOutcomeEncoder,
            writer,
        ))
    }
}

impl OvaSession {
    pub fn one_vs_all(
        storage: Arc<dyn Storage>,
        context: PipelineContext,
        features: FeaturesEncoder,
    ) -> Result<Self> {
        let writer = OvaDataWriter::create(Arc::clone(&storage), context.clone())?;
        Ok(TrainingSession::new(
            storage,
            context,
            features,
            StringOutcomeEncoder::new(),
            writer,
        ))
    }
}

impl<E, W> TrainingSession<E, W>
where
    E: OutcomeEncoder,
    W: DataWriter<E::Encoded>,
{
    pub fn new(
        storage: Arc<dyn Storage>,
        context: PipelineContext,
        features: FeaturesEncoder,
        outcomes: E,
        writer: W,
    ) -> Self {
        log::debug!(
            target: context.target(),
            "starting {} training run {}",
            writer.kind(),
            context.run_id()
        );
        TrainingSession {
            storage,
            context,
            features,
            outcomes,
            writer,
            sort_lookup: false,
            instances: 0,
            unlabeled: 0,
        }
    }

    /// Sort the persisted feature lookup by name instead of index.
    pub fn with_sorted_lookup(mut self, sort_lookup: bool) -> Self {
        self.sort_lookup = sort_lookup;
        self
    }

    pub fn features(&self) -> &FeaturesEncoder {
        &self.features
    }

    pub fn outcomes(&self) -> &E {
        &self.outcomes
    }

    pub fn instances(&self) -> u64 {
        self.instances
    }

    /// Encode and write one labeled instance.
    ///
    /// The outcome is only encoded once the features have encoded cleanly, so
    /// a rejected instance registers neither names nor classes.
    pub fn write(&mut self, features: &[Feature], outcome: &E::Outcome) -> Result<()> {
        let vector = self.features.encode_all(features)?;
        let encoded = self.outcomes.encode(outcome)?;
        self.writer.write(&vector, encoded)?;
        self.instances += 1;
        Ok(())
    }

    /// Encode and write one instance without an outcome.
    pub fn write_unlabeled(&mut self, features: &[Feature]) -> Result<()> {
        let vector = self.features.encode_all(features)?;
        self.writer.write_unlabeled(&vector)?;
        self.instances += 1;
        self.unlabeled += 1;
        Ok(())
    }

    /// Close the writer, persist the dictionaries and write the manifest.
    pub fn finish(mut self) -> Result<Manifest> {
        let mut errors = Vec::new();

        if let Err(e) = self.writer.finish() {
            errors.push(e);
        }

        self.features.freeze();
        log::info!(
            target: self.context.target(),
            "froze feature dictionary with {} entries",
            self.features.dictionary().len()
        );
        if let Err(e) = self.features.save(self.storage.as_ref(), self.sort_lookup) {
            errors.push(e);
        }

        self.outcomes.freeze();
        if let Err(e) = self.outcomes.save(self.storage.as_ref()) {
            errors.push(e);
        }

        let manifest = Manifest {
            format_version: MANIFEST_VERSION,
            run_id: self.context.run_id(),
            created_at: Utc::now(),
            writer: self.writer.kind().to_string(),
            instances: self.instances,
            unlabeled: self.unlabeled,
            features: self.features.dictionary().len(),
            classes: self.writer.classes(),
        };
        if let Err(e) = manifest.save(self.storage.as_ref()) {
            errors.push(e);
        }

        for error in &errors {
            log::error!(target: self.context.target(), "{error}");
        }
        TesseraError::aggregate(errors)?;

        log::info!(
            target: self.context.target(),
            "finished {} run: {} instances, {} features, {} classes",
            manifest.writer,
            manifest.instances,
            manifest.features,
            manifest.classes.len()
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncoderChain;
    use crate::storage::memory::MemoryStorage;

    fn storage() -> Arc<dyn Storage> {
        Arc::new(MemoryStorage::new_default())
    }

    #[test]
    fn test_binary_session() {
        let storage = storage();
        let mut session = BinarySession::binary(
            Arc::clone(&storage),
            PipelineContext::default(),
            FeaturesEncoder::new(EncoderChain::default()),
        )
        .unwrap();

        session.write(&[Feature::new("pos", "NN")], &true).unwrap();
        session.write(&[Feature::new("pos", "VB"), Feature::new("len", 2)], &false).unwrap();
        session.write_unlabeled(&[Feature::new("pos", "NN")]).unwrap();
        let manifest = session.finish().unwrap();

        assert_eq!(manifest.writer, "binary");
        assert_eq!(manifest.instances, 3);
        assert_eq!(manifest.unlabeled, 1);
        assert_eq!(manifest.features, 3);
        assert!(manifest.classes.is_empty());
        assert_eq!(
            storage.read_to_string("training-data.svmlight").unwrap(),
            "+1 1:1.0000000\n-1 2:1.0000000 3:2.0000000\n0 1:1.0000000\n"
        );
        assert_eq!(
            storage.read_to_string("feature-lookup.txt").unwrap(),
            "1\tpos_NN\n2\tpos_VB\n3\tlen\n"
        );
        assert_eq!(Manifest::load(storage.as_ref()).unwrap(), manifest);
    }

    #[test]
    fn test_ova_session_uses_class_ids() {
        let storage = storage();
        let mut session = OvaSession::one_vs_all(
            Arc::clone(&storage),
            PipelineContext::default(),
            FeaturesEncoder::new(EncoderChain::default()),
        )
        .unwrap();

        session.write(&[Feature::new("w", "Paris")], &"LOC".to_string()).unwrap();
        session.write(&[Feature::new("w", "Ann")], &"PER".to_string()).unwrap();
        let manifest = session.finish().unwrap();

        assert_eq!(manifest.classes, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(
            storage.read_to_string("outcome-lookup.txt").unwrap(),
            "1\tLOC\n2\tPER\n"
        );
        assert_eq!(
            storage.read_to_string("training-data-2.svmlight").unwrap(),
            "-1 1:1.0000000\n+1 2:1.0000000\n"
        );
    }

    #[test]
    fn test_invalid_instance_is_not_counted() {
        let storage = storage();
        let mut session = BinarySession::binary(
            Arc::clone(&storage),
            PipelineContext::default(),
            FeaturesEncoder::new(EncoderChain::default()),
        )
        .unwrap();

        assert!(session.write(&[Feature::new("w", f64::NAN)], &true).is_err());
        assert_eq!(session.instances(), 0);
        assert!(session.features().dictionary().is_empty());
    }

    #[test]
    fn test_cancelled_feature_is_not_written() {
        let storage = storage();
        let mut session = BinarySession::binary(
            Arc::clone(&storage),
            PipelineContext::default(),
            FeaturesEncoder::new(EncoderChain::default()),
        )
        .unwrap();

        session
            .write(
                &[Feature::new("x", 3), Feature::new("x", -3), Feature::new("y", 1)],
                &true,
            )
            .unwrap();
        session.finish().unwrap();

        assert_eq!(
            storage.read_to_string("training-data.svmlight").unwrap(),
            "+1 2:1.0000000\n"
        );
    }

    #[test]
    fn test_overflowing_instance_registers_nothing() {
        let storage = storage();
        let mut session = OvaSession::one_vs_all(
            Arc::clone(&storage),
            PipelineContext::default(),
            FeaturesEncoder::new(EncoderChain::default()),
        )
        .unwrap();

        let big = [Feature::new("big", 1e308), Feature::new("big", 1e308)];
        let err = session.write(&big, &"A".to_string()).unwrap_err();
        assert!(matches!(err, TesseraError::InvalidFeatureValue(_)));
        assert!(session.features().dictionary().is_empty());
        assert!(session.outcomes().classes().is_empty());

        session.write(&[Feature::new("w", "x")], &"B".to_string()).unwrap();
        let manifest = session.finish().unwrap();
        assert_eq!(manifest.instances, 1);
        assert_eq!(manifest.features, 1);
        assert_eq!(
            storage.read_to_string("outcome-lookup.txt").unwrap(),
            "1\tB\n"
        );
    }

    #[test]
    fn test_manifest_version_check() {
        let storage = storage();
        let mut output = storage.create_output(MANIFEST_FILE).unwrap();
        std::io::Write::write_all(
            &mut output,
            br#"{"format_version": 9, "run_id": "00000000-0000-0000-0000-000000000000",
                "created_at": "2024-01-01T00:00:00Z", "writer": "binary", "instances": 0,
                "unlabeled": 0, "features": 0, "classes": []}"#,
        )
        .unwrap();
        output.close().unwrap();

        assert!(Manifest::load(storage.as_ref()).is_err());
    }
}
