//! Training pass that fills a frequency table from extracted features.

use crate::error::Result;
use crate::feature::{Counts, Feature, FeatureValue};
use crate::idf::store::IdfStore;
use crate::idf::table::DocumentFrequencyTable;

/// Collects document frequencies from every [`Counts`] leaf whose identifier
/// matches, descending into nested collections.
///
/// The collector starts from the table already stored under its name, so
/// repeated passes over different corpora accumulate.
#[derive(Debug)]
pub struct IdfCollector {
    name: Option<String>,
    identifier: Option<String>,
    table: DocumentFrequencyTable,
}

impl IdfCollector {
    /// Collector with an empty table.
    pub fn new(name: Option<String>, identifier: Option<String>) -> Self {
        IdfCollector {
            name,
            identifier,
            table: DocumentFrequencyTable::new(),
        }
    }

    /// Collector seeded with the table stored under `name`, if any.
    pub fn open(store: &IdfStore, name: Option<String>, identifier: Option<String>) -> Result<Self> {
        let table = store.load_or_default(name.as_deref())?;
        Ok(IdfCollector {
            name,
            identifier,
            table,
        })
    }

    /// Whether `counts` passes the identifier filter. No filter accepts all.
    pub fn accepts(&self, counts: &Counts) -> bool {
        match &self.identifier {
            None => true,
            Some(identifier) => counts.identifier.as_deref() == Some(identifier.as_str()),
        }
    }

    /// Consume every matching [`Counts`] in `features`. Returns how many were consumed.
    pub fn consume_features(&mut self, features: &[Feature]) -> usize {
        features
            .iter()
            .map(|feature| self.consume_value(&feature.value))
            .sum()
    }

    fn consume_value(&mut self, value: &FeatureValue) -> usize {
        match value {
            FeatureValue::Counts(counts) if self.accepts(counts) => {
                self.table.consume(counts);
                1
            }
            FeatureValue::Collection(collection) => self.consume_features(&collection.features),
            _ => 0,
        }
    }

    pub fn table(&self) -> &DocumentFrequencyTable {
        &self.table
    }

    /// Write the table back under the collector's name.
    pub fn finish(self, store: &IdfStore) -> Result<DocumentFrequencyTable> {
        store.write(self.name.as_deref(), &self.table)?;
        Ok(self.table)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::PipelineContext;
    use crate::feature::FeatureCollection;
    use crate::storage::memory::MemoryStorage;

    fn instance() -> Vec<Feature> {
        vec![
            Feature::new("pos", "NN"),
            Feature::new(
                "bag",
                Counts::from_values("token", ["the", "cat"]).with_identifier("tokens"),
            ),
            Feature::new(
                "window",
                FeatureCollection::new(vec![Feature::new(
                    "inner",
                    Counts::from_values("lemma", ["be"]).with_identifier("lemmas"),
                )]),
            ),
        ]
    }

    #[test]
    fn test_identifier_filter() {
        let mut collector = IdfCollector::new(None, Some("tokens".to_string()));
        assert_eq!(collector.consume_features(&instance()), 1);
        assert_eq!(collector.table().document_frequency("cat"), 1);
        assert_eq!(collector.table().document_frequency("be"), 0);
    }

    #[test]
    fn test_no_filter_recurses_into_collections() {
        let mut collector = IdfCollector::new(None, None);
        assert_eq!(collector.consume_features(&instance()), 2);
        assert_eq!(collector.table().total_documents(), 2);
        assert_eq!(collector.table().document_frequency("be"), 1);
    }

    #[test]
    fn test_open_merges_with_stored_table() {
        let store = IdfStore::new(Arc::new(MemoryStorage::new_default()), PipelineContext::default());

        let mut first = IdfCollector::open(&store, Some("tok".to_string()), None).unwrap();
        first.consume_features(&instance());
        first.finish(&store).unwrap();

        let mut second = IdfCollector::open(&store, Some("tok".to_string()), None).unwrap();
        second.consume_features(&instance());
        let table = second.finish(&store).unwrap();

        assert_eq!(table.total_documents(), 4);
        assert_eq!(store.load(Some("tok")).unwrap().document_frequency("the"), 2);
    }
}
