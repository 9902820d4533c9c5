//! Outcome encoders: from user-facing outcomes to what a writer accepts.

use std::io::BufReader;

use crate::dictionary::StringDictionary;
use crate::error::{Result, TesseraError};
use crate::storage::Storage;

/// File the outcome dictionary of a [`StringOutcomeEncoder`] is persisted to.
pub const OUTCOME_LOOKUP_FILE: &str = "outcome-lookup.txt";

/// Maps outcomes to their encoded form and back.
pub trait OutcomeEncoder {
    type Outcome;
    type Encoded;

    fn encode(&mut self, outcome: &Self::Outcome) -> Result<Self::Encoded>;

    fn decode(&self, encoded: &Self::Encoded) -> Result<Self::Outcome>;

    /// Stop accepting unseen outcomes.
    fn freeze(&mut self) {}

    /// Persist whatever is needed to decode at inference time.
    fn save(&self, _storage: &dyn Storage) -> Result<()> {
        Ok(())
    }
}

/// Identity encoding for binary classifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanOutcomeEncoder;

impl OutcomeEncoder for BooleanOutcomeEncoder {
    type Outcome = bool;
    type Encoded = bool;

    fn encode(&mut self, outcome: &bool) -> Result<bool> {
        Ok(*outcome)
    }

    fn decode(&self, encoded: &bool) -> Result<bool> {
        Ok(*encoded)
    }
}

/// Dense integer class ids (from 1) for string outcomes.
#[derive(Debug, Clone, Default)]
pub struct StringOutcomeEncoder {
    dictionary: StringDictionary,
}

impl StringOutcomeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frozen encoder from the lookup file in `storage`.
    pub fn load(storage: &dyn Storage) -> Result<Self> {
        let input = storage.open_input(OUTCOME_LOOKUP_FILE)?;
        let dictionary = StringDictionary::read_from(BufReader::new(input)).map_err(|e| {
            TesseraError::persistence(format!("Failed to load {OUTCOME_LOOKUP_FILE}: {e}"))
        })?;
        Ok(StringOutcomeEncoder { dictionary })
    }

    /// Outcome names in class id order.
    pub fn classes(&self) -> Vec<String> {
        self.dictionary
            .iter()
            .map(|(_, name)| name.to_string())
            .collect()
    }

    pub fn dictionary(&self) -> &StringDictionary {
        &self.dictionary
    }
}

impl OutcomeEncoder for StringOutcomeEncoder {
    type Outcome = String;
    type Encoded = u32;

    fn encode(&mut self, outcome: &String) -> Result<u32> {
        self.dictionary.resolve(outcome)?.ok_or_else(|| {
            TesseraError::invalid_operation(format!("unknown outcome {outcome:?}"))
        })
    }

    fn decode(&self, encoded: &u32) -> Result<String> {
        self.dictionary
            .name_of(*encoded)
            .map(str::to_string)
            .ok_or_else(|| TesseraError::invalid_operation(format!("unknown class id {encoded}")))
    }

    fn freeze(&mut self) {
        self.dictionary.freeze();
    }

    fn save(&self, storage: &dyn Storage) -> Result<()> {
        self.dictionary.save(storage, OUTCOME_LOOKUP_FILE, false)
    }
}
