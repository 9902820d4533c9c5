//! Feature encoding: from feature trees to sparse vectors.
//!
//! An [`EncoderChain`] holds an ordered list of [`FeatureEncoder`]s; the first
//! one whose guard accepts a feature encodes it into [`NameNumber`] pairs.
//! [`FeaturesEncoder`] drives the chain over a whole instance, drops zero
//! values, escapes names, resolves them through a [`StringDictionary`] and
//! accumulates a [`SparseVector`].
//!
//! # Example
//!
//! ```
//! use tessera::encoder::{EncoderChain, FeaturesEncoder};
//! use tessera::feature::Feature;
//!
//! # fn main() -> tessera::error::Result<()> {
//! let mut encoder = FeaturesEncoder::new(EncoderChain::default());
//! let vector = encoder.encode_all(&[Feature::new("pos", "NN"), Feature::new("length", 4)])?;
//! assert_eq!(vector.get(1), 1.0);
//! assert_eq!(vector.get(2), 4.0);
//! # Ok(())
//! # }
//! ```

use std::io::BufReader;
use std::sync::Arc;

use ahash::AHashMap;
use rayon::prelude::*;

use crate::dictionary::StringDictionary;
use crate::error::{Result, TesseraError};
use crate::feature::{Counts, Feature, FeatureValue, NameNumber, join_name};
use crate::idf::DocumentFrequencyTable;
use crate::storage::Storage;
use crate::vector::SparseVector;

pub mod escape;
pub mod normalizer;

pub use escape::NameEscaper;
pub use normalizer::{EuclideanNormalizer, NoOpNormalizer, Normalizer, NormalizerKind};

/// File the feature dictionary is persisted to.
pub const FEATURE_LOOKUP_FILE: &str = "feature-lookup.txt";

/// One step of the encoder chain.
#[derive(Debug, Clone)]
pub enum FeatureEncoder {
    /// Integer and float values: `(name, value)`.
    Number,
    /// `true` as `(name, 1)`, `false` as `(name, 0)`.
    Boolean,
    /// Text values: `(name_text, 1)`.
    Text,
    /// Valueless features: `(name, 1)`.
    Name,
    /// Nested collections, re-encoded through the chain and prefixed with the
    /// parent name.
    Collection { identifier: Option<String> },
    /// Bag of values: `(feature_name_value, 1)` for every value with a
    /// positive count.
    Bag {
        identifier: Option<String>,
        normalizer: Arc<dyn Normalizer>,
    },
    /// `(feature_name_value, tf * idf)` with `tf = count / total`.
    TfIdf {
        identifier: Option<String>,
        table: Arc<DocumentFrequencyTable>,
        normalizer: Arc<dyn Normalizer>,
    },
}

fn identifier_matches(filter: &Option<String>, identifier: &Option<String>) -> bool {
    match filter {
        None => true,
        Some(filter) => identifier.as_deref() == Some(filter.as_str()),
    }
}

impl FeatureEncoder {
    pub fn collection() -> Self {
        FeatureEncoder::Collection { identifier: None }
    }

    pub fn bag(identifier: Option<String>, normalizer: NormalizerKind) -> Self {
        FeatureEncoder::Bag {
            identifier,
            normalizer: normalizer.build(),
        }
    }

    pub fn tf_idf(
        identifier: Option<String>,
        table: Arc<DocumentFrequencyTable>,
        normalizer: NormalizerKind,
    ) -> Self {
        FeatureEncoder::TfIdf {
            identifier,
            table,
            normalizer: normalizer.build(),
        }
    }

    /// Get the name of this encoder.
    pub fn name(&self) -> &'static str {
        match self {
            FeatureEncoder::Number => "number",
            FeatureEncoder::Boolean => "boolean",
            FeatureEncoder::Text => "text",
            FeatureEncoder::Name => "name",
            FeatureEncoder::Collection { .. } => "collection",
            FeatureEncoder::Bag { .. } => "bag",
            FeatureEncoder::TfIdf { .. } => "tfidf",
        }
    }

    /// Whether this encoder accepts `feature`.
    pub fn encodes(&self, feature: &Feature) -> bool {
        match (self, &feature.value) {
            (FeatureEncoder::Number, FeatureValue::Integer(_) | FeatureValue::Float(_)) => true,
            (FeatureEncoder::Boolean, FeatureValue::Boolean(_)) => true,
            (FeatureEncoder::Text, FeatureValue::Text(_)) => true,
            (FeatureEncoder::Name, FeatureValue::Null) => true,
            (FeatureEncoder::Collection { identifier }, FeatureValue::Collection(collection)) => {
                identifier_matches(identifier, &collection.identifier)
            }
            (FeatureEncoder::Bag { identifier, .. }, FeatureValue::Counts(counts))
            | (FeatureEncoder::TfIdf { identifier, .. }, FeatureValue::Counts(counts)) => {
                identifier_matches(identifier, &counts.identifier)
            }
            _ => false,
        }
    }

    /// Encode `feature`, which this encoder must accept. Collections recurse
    /// through `chain`.
    pub fn encode(&self, feature: &Feature, chain: &EncoderChain) -> Result<Vec<NameNumber>> {
        let name = feature.name.as_str();
        match (self, &feature.value) {
            (FeatureEncoder::Number, FeatureValue::Integer(value)) => {
                Ok(vec![NameNumber::new(name, *value as f64)])
            }
            (FeatureEncoder::Number, FeatureValue::Float(value)) => {
                Ok(vec![NameNumber::new(name, *value)])
            }
            (FeatureEncoder::Boolean, FeatureValue::Boolean(value)) => {
                Ok(vec![NameNumber::new(name, if *value { 1.0 } else { 0.0 })])
            }
            (FeatureEncoder::Text, FeatureValue::Text(text)) => {
                Ok(vec![NameNumber::new(join_name(name, text), 1.0)])
            }
            (FeatureEncoder::Name, FeatureValue::Null) => Ok(vec![NameNumber::new(name, 1.0)]),
            (FeatureEncoder::Collection { .. }, FeatureValue::Collection(collection)) => {
                let mut encoded = Vec::new();
                for child in &collection.features {
                    for mut value in chain.encode(child)? {
                        if !name.is_empty() {
                            value.name = join_name(name, &value.name);
                        }
                        encoded.push(value);
                    }
                }
                Ok(encoded)
            }
            (FeatureEncoder::Bag { normalizer, .. }, FeatureValue::Counts(counts)) => {
                let mut encoded: Vec<NameNumber> = counts
                    .iter()
                    .filter(|(_, count)| *count > 0)
                    .map(|(value, _)| NameNumber::new(join_name(&counts.feature_name, value), 1.0))
                    .collect();
                normalizer.normalize(&mut encoded);
                Ok(encoded)
            }
            (
                FeatureEncoder::TfIdf {
                    table, normalizer, ..
                },
                FeatureValue::Counts(counts),
            ) => {
                let mut encoded = tf_idf_values(counts, table);
                normalizer.normalize(&mut encoded);
                Ok(encoded)
            }
            (encoder, value) => Err(TesseraError::invalid_feature(format!(
                "{} encoder cannot encode {} value of feature {name:?}",
                encoder.name(),
                value.kind()
            ))),
        }
    }
}

fn tf_idf_values(counts: &Counts, table: &DocumentFrequencyTable) -> Vec<NameNumber> {
    let total = counts.total();
    if total == 0 {
        return Vec::new();
    }
    counts
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(value, count)| {
            let tf = count as f64 / total as f64;
            NameNumber::new(join_name(&counts.feature_name, value), tf * table.idf(value))
        })
        .collect()
}

/// Merge values with equal names, keeping first-seen order.
fn sum_by_name(values: Vec<NameNumber>) -> Vec<NameNumber> {
    let mut positions: AHashMap<String, usize> = AHashMap::with_capacity(values.len());
    let mut totals: Vec<NameNumber> = Vec::with_capacity(values.len());
    for value in values {
        match positions.get(&value.name) {
            Some(&position) => totals[position].number += value.number,
            None => {
                positions.insert(value.name.clone(), totals.len());
                totals.push(value);
            }
        }
    }
    totals
}

fn check_finite(totals: Vec<NameNumber>) -> Result<Vec<NameNumber>> {
    if let Some(total) = totals.iter().find(|total| !total.number.is_finite()) {
        return Err(TesseraError::invalid_feature(format!(
            "feature {:?} sums to non-finite value {}",
            total.name, total.number
        )));
    }
    Ok(totals)
}

/// Ordered encoder list with first-match dispatch.
#[derive(Debug, Clone)]
pub struct EncoderChain {
    encoders: Vec<FeatureEncoder>,
}

impl EncoderChain {
    pub fn new(encoders: Vec<FeatureEncoder>) -> Self {
        EncoderChain { encoders }
    }

    /// Append an encoder with the lowest priority.
    pub fn push(&mut self, encoder: FeatureEncoder) {
        self.encoders.push(encoder);
    }

    pub fn encoders(&self) -> &[FeatureEncoder] {
        &self.encoders
    }

    /// First encoder accepting `feature`.
    pub fn encoder_for(&self, feature: &Feature) -> Option<&FeatureEncoder> {
        self.encoders.iter().find(|encoder| encoder.encodes(feature))
    }

    /// Encode one feature. Features no encoder accepts are an error.
    pub fn encode(&self, feature: &Feature) -> Result<Vec<NameNumber>> {
        match self.encoder_for(feature) {
            Some(encoder) => encoder.encode(feature, self),
            None => Err(TesseraError::invalid_feature(format!(
                "no encoder accepts {} value of feature {:?}",
                feature.value.kind(),
                feature.name
            ))),
        }
    }
}

impl Default for EncoderChain {
    /// Scalars, valueless features, any collection and any counts (as a bag).
    fn default() -> Self {
        EncoderChain::new(vec![
            FeatureEncoder::Number,
            FeatureEncoder::Boolean,
            FeatureEncoder::Text,
            FeatureEncoder::Name,
            FeatureEncoder::collection(),
            FeatureEncoder::bag(None, NormalizerKind::None),
        ])
    }
}

/// Encodes whole instances into sparse vectors through a shared dictionary.
#[derive(Debug, Clone)]
pub struct FeaturesEncoder {
    chain: EncoderChain,
    dictionary: StringDictionary,
    escaper: NameEscaper,
    normalize_vectors: bool,
}

impl FeaturesEncoder {
    pub fn new(chain: EncoderChain) -> Self {
        FeaturesEncoder {
            chain,
            dictionary: StringDictionary::new(),
            escaper: NameEscaper::default(),
            normalize_vectors: false,
        }
    }

    pub fn with_dictionary(mut self, dictionary: StringDictionary) -> Self {
        self.dictionary = dictionary;
        self
    }

    pub fn with_escaper(mut self, escaper: NameEscaper) -> Self {
        self.escaper = escaper;
        self
    }

    /// Scale every finished vector to unit length.
    pub fn with_vector_normalization(mut self, normalize_vectors: bool) -> Self {
        self.normalize_vectors = normalize_vectors;
        self
    }

    pub fn chain(&self) -> &EncoderChain {
        &self.chain
    }

    pub fn dictionary(&self) -> &StringDictionary {
        &self.dictionary
    }

    pub fn freeze(&mut self) {
        self.dictionary.freeze();
    }

    pub fn is_frozen(&self) -> bool {
        self.dictionary.is_frozen()
    }

    /// Flatten an instance into escaped, non-zero, finite name/number pairs.
    pub fn flatten(&self, features: &[Feature]) -> Result<Vec<NameNumber>> {
        let mut flattened = Vec::new();
        for feature in features {
            for value in self.chain.encode(feature)? {
                if value.number == 0.0 {
                    continue;
                }
                if !value.number.is_finite() {
                    return Err(TesseraError::invalid_feature(format!(
                        "feature {:?} encodes to non-finite value {}",
                        value.name, value.number
                    )));
                }
                let name = self.escaper.escape(&value.name).into_owned();
                flattened.push(NameNumber::new(name, value.number));
            }
        }
        Ok(flattened)
    }

    /// Encode an instance, growing the dictionary unless it is frozen.
    ///
    /// Names a frozen dictionary does not know are dropped silently. Values
    /// sharing a name are summed first; an instance whose sums are not all
    /// finite fails without adding anything to the dictionary.
    pub fn encode_all(&mut self, features: &[Feature]) -> Result<SparseVector> {
        let totals = check_finite(sum_by_name(self.flatten(features)?))?;
        let mut vector = SparseVector::new();
        for total in totals {
            if let Some(index) = self.dictionary.resolve(&total.name)? {
                vector.add(index, total.number);
            }
        }
        Ok(self.finish_vector(vector))
    }

    /// Encode an instance without ever touching the dictionary.
    pub fn encode_frozen(&self, features: &[Feature]) -> Result<SparseVector> {
        let totals = check_finite(sum_by_name(self.flatten(features)?))?;
        let mut vector = SparseVector::new();
        for total in totals {
            if let Some(index) = self.dictionary.lookup(&total.name) {
                vector.add(index, total.number);
            }
        }
        Ok(self.finish_vector(vector))
    }

    /// [`FeaturesEncoder::encode_frozen`] over many instances in parallel.
    pub fn encode_batch(&self, instances: &[Vec<Feature>]) -> Result<Vec<SparseVector>> {
        instances
            .par_iter()
            .map(|features| self.encode_frozen(features))
            .collect()
    }

    fn finish_vector(&self, mut vector: SparseVector) -> SparseVector {
        if self.normalize_vectors {
            vector.normalize_l2();
        }
        vector
    }

    /// Persist the dictionary as [`FEATURE_LOOKUP_FILE`].
    pub fn save(&self, storage: &dyn Storage, sort_by_name: bool) -> Result<()> {
        self.dictionary
            .save(storage, FEATURE_LOOKUP_FILE, sort_by_name)
    }

    /// Rebuild a frozen encoder from the dictionary stored in `storage`.
    pub fn load(storage: &dyn Storage, chain: EncoderChain) -> Result<Self> {
        let input = storage.open_input(FEATURE_LOOKUP_FILE)?;
        let dictionary = StringDictionary::read_from(BufReader::new(input)).map_err(|e| {
            TesseraError::persistence(format!("Failed to load {FEATURE_LOOKUP_FILE}: {e}"))
        })?;
        Ok(FeaturesEncoder::new(chain).with_dictionary(dictionary))
    }
}
