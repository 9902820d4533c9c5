use std::fs;
use std::sync::Arc;

use tempfile::tempdir;
use tessera::context::PipelineContext;
use tessera::encoder::{EncoderChain, FeatureEncoder, NormalizerKind};
use tessera::feature::{Counts, Feature, FeatureCollection};
use tessera::idf::{DocumentFrequencyTable, IdfCollector, IdfStore};
use tessera::storage::StorageFactory;

fn document(words: &[&str]) -> Vec<Feature> {
    vec![
        Feature::new("title", "ignored"),
        Feature::new(
            "body",
            FeatureCollection::new(vec![Feature::new(
                "bag",
                Counts::from_values("token", words.iter().copied()).with_identifier("tokens"),
            )]),
        ),
        Feature::new(
            "tags",
            Counts::from_values("tag", ["news"]).with_identifier("tags"),
        ),
    ]
}

#[test]
fn test_collector_filters_by_identifier() {
    let dir = tempdir().unwrap();
    let store = IdfStore::new(StorageFactory::open_dir(dir.path()).unwrap(), PipelineContext::default());

    let mut collector = IdfCollector::open(&store, None, Some("tokens".to_string())).unwrap();
    assert_eq!(collector.consume_features(&document(&["the", "cat", "the"])), 1);
    assert_eq!(collector.consume_features(&document(&["the", "dog"])), 1);
    let table = collector.finish(&store).unwrap();

    assert_eq!(table.total_documents(), 2);
    assert_eq!(table.document_frequency("the"), 2);
    assert_eq!(table.document_frequency("cat"), 1);
    assert_eq!(table.document_frequency("news"), 0);
    assert!((table.idf("cat") - 1.5f64.ln()).abs() < 1e-12);
    assert!((table.idf("unseen") - 3f64.ln()).abs() < 1e-12);

    let text = fs::read_to_string(dir.path().join("idf.table")).unwrap();
    assert_eq!(text, "#tessera-idf v1\ndocuments\t2\ncat\t1\ndog\t1\nthe\t2\n");
}

#[test]
fn test_second_pass_merges_on_load() {
    let dir = tempdir().unwrap();
    let store = IdfStore::new(StorageFactory::open_dir(dir.path()).unwrap(), PipelineContext::default());

    let tokens = Some("tokens".to_string());
    let mut first = IdfCollector::open(&store, Some("body".to_string()), tokens.clone()).unwrap();
    first.consume_features(&document(&["a"]));
    first.finish(&store).unwrap();

    let mut second = IdfCollector::open(&store, Some("body".to_string()), tokens).unwrap();
    assert_eq!(second.table().total_documents(), 1);
    second.consume_features(&document(&["a", "b"]));
    let merged = second.finish(&store).unwrap();

    assert_eq!(merged.total_documents(), 2);
    assert_eq!(merged.document_frequency("a"), 2);
    assert_eq!(merged.document_frequency("b"), 1);
    assert_eq!(store.load(Some("body")).unwrap(), merged);
    assert_eq!(store.list().unwrap(), vec![Some("body".to_string())]);
}

#[test]
fn test_unfiltered_collector_counts_every_leaf() {
    let mut collector = IdfCollector::new(None, None);
    assert_eq!(collector.consume_features(&document(&["a"])), 2);
    assert_eq!(collector.table().total_documents(), 2);
    assert_eq!(collector.table().document_frequency("news"), 1);
}

#[test]
fn test_write_all_and_merge_into() {
    let dir = tempdir().unwrap();
    let store = IdfStore::new(StorageFactory::open_dir(dir.path()).unwrap(), PipelineContext::default());

    let mut left = DocumentFrequencyTable::new();
    left.consume(&Counts::from_values("w", ["x"]));
    let mut right = DocumentFrequencyTable::new();
    right.consume(&Counts::from_values("w", ["y"]));

    store
        .write_all([(None, &left), (Some("right"), &right)])
        .unwrap();
    assert_eq!(store.list().unwrap(), vec![None, Some("right".to_string())]);

    let merged = store.merge_into(None, &right).unwrap();
    assert_eq!(merged.total_documents(), 2);
    assert_eq!(store.load(None).unwrap().document_frequency("y"), 1);
    assert!(!dir.path().join("idf.table.tmp").exists());
}

#[test]
fn test_stored_table_drives_tf_idf_encoding() {
    let dir = tempdir().unwrap();
    let store = IdfStore::new(StorageFactory::open_dir(dir.path()).unwrap(), PipelineContext::default());

    let mut collector = IdfCollector::new(None, Some("tokens".to_string()));
    for words in [&["the", "cat"][..], &["the"][..], &["the", "dog"][..]] {
        collector.consume_features(&document(words));
    }
    collector.finish(&store).unwrap();

    let table = Arc::new(store.load(None).unwrap());
    let chain = EncoderChain::new(vec![
        FeatureEncoder::collection(),
        FeatureEncoder::tf_idf(Some("tokens".to_string()), table, NormalizerKind::None),
    ]);
    let bag = Feature::new(
        "doc",
        FeatureCollection::new(vec![Feature::new(
            "bag",
            Counts::from_values("token", ["the", "cat"]).with_identifier("tokens"),
        )]),
    );
    let encoded = chain.encode(&bag).unwrap();

    assert_eq!(encoded.len(), 2);
    assert_eq!(encoded[0].name, "doc_token_cat");
    assert!((encoded[0].number - 0.5 * 2f64.ln()).abs() < 1e-12);
    assert_eq!(encoded[1].name, "doc_token_the");
    assert!(encoded[1].number.abs() < 1e-12);
}
