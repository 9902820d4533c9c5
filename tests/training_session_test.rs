use std::fs;
use std::sync::Arc;

use tempfile::tempdir;
use tessera::config::PipelineConfig;
use tessera::context::PipelineContext;
use tessera::encoder::{EncoderChain, FeaturesEncoder};
use tessera::feature::{Counts, Feature, FeatureCollection};
use tessera::storage::StorageFactory;
use tessera::writer::outcome::{OutcomeEncoder, StringOutcomeEncoder};
use tessera::writer::{BinarySession, Manifest, OvaSession};

fn token_features(word: &str, pos: &str) -> Vec<Feature> {
    vec![
        Feature::new("word", word),
        Feature::new("len", word.len() as i64),
        Feature::new(
            "left",
            FeatureCollection::new(vec![Feature::new("pos", pos)]),
        ),
    ]
}

#[test]
fn test_binary_training_and_inference_agree() {
    let dir = tempdir().unwrap();
    let storage = StorageFactory::open_dir(dir.path()).unwrap();

    let mut session = BinarySession::binary(
        Arc::clone(&storage),
        PipelineContext::new("binary-test"),
        FeaturesEncoder::new(EncoderChain::default()),
    )
    .unwrap();
    session.write(&token_features("Paris", "IN"), &true).unwrap();
    session.write(&token_features("the", "DT"), &false).unwrap();
    let manifest = session.finish().unwrap();

    assert_eq!(manifest.instances, 2);
    assert_eq!(manifest.features, 5);
    assert_eq!(
        fs::read_to_string(dir.path().join("training-data.svmlight")).unwrap(),
        "+1 1:1.0000000 2:5.0000000 3:1.0000000\n-1 2:3.0000000 4:1.0000000 5:1.0000000\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("feature-lookup.txt")).unwrap(),
        "1\tword_Paris\n2\tlen\n3\tleft_pos_IN\n4\tword_the\n5\tleft_pos_DT\n"
    );

    let loaded = FeaturesEncoder::load(storage.as_ref(), EncoderChain::default()).unwrap();
    let vector = loaded.encode_frozen(&token_features("Paris", "NNP")).unwrap();
    assert_eq!(vector.iter().collect::<Vec<_>>(), vec![(1, 1.0), (2, 5.0)]);
    assert_eq!(Manifest::load(storage.as_ref()).unwrap(), manifest);
}

#[test]
fn test_one_vs_all_session_persists_outcomes() {
    let dir = tempdir().unwrap();
    let storage = StorageFactory::open_dir(dir.path()).unwrap();

    let mut session = OvaSession::one_vs_all(
        Arc::clone(&storage),
        PipelineContext::default(),
        FeaturesEncoder::new(EncoderChain::default()),
    )
    .unwrap()
    .with_sorted_lookup(true);
    for (word, pos, label) in [
        ("Paris", "NNP", "LOC"),
        ("Ann", "NNP", "PER"),
        ("ran", "VBD", "O"),
        ("Rome", "NNP", "LOC"),
    ] {
        session
            .write(&token_features(word, pos), &label.to_string())
            .unwrap();
    }
    session.write_unlabeled(&token_features("it", "PRP")).unwrap();
    let manifest = session.finish().unwrap();

    assert_eq!(manifest.writer, "one-vs-all");
    assert_eq!(manifest.instances, 5);
    assert_eq!(manifest.unlabeled, 1);
    assert_eq!(manifest.classes, vec!["1", "2", "3"]);

    let mut files = storage.list_files().unwrap();
    files.sort();
    assert_eq!(
        files,
        vec![
            "feature-lookup.txt",
            "manifest.json",
            "outcome-lookup.txt",
            "training-data-1.svmlight",
            "training-data-2.svmlight",
            "training-data-3.svmlight",
        ]
    );

    let outcomes = StringOutcomeEncoder::load(storage.as_ref()).unwrap();
    assert_eq!(outcomes.classes(), vec!["LOC", "PER", "O"]);
    assert_eq!(outcomes.decode(&2).unwrap(), "PER");
    assert!(outcomes.decode(&9).is_err());

    let lookup = fs::read_to_string(dir.path().join("feature-lookup.txt")).unwrap();
    let names: Vec<&str> = lookup
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_configured_pipeline() {
    let dir = tempdir().unwrap();
    let storage = StorageFactory::open_dir(dir.path().join("model")).unwrap();
    let config = PipelineConfig::from_json(
        r#"{
            "encoder": {
                "escape_chars": ["=", ":"],
                "normalize_vectors": true,
                "chain": [{"type": "number"}, {"type": "text"}, {"type": "bag"}]
            },
            "dictionary": {"base_index": 0}
        }"#,
    )
    .unwrap();

    let mut session = BinarySession::binary(
        Arc::clone(&storage),
        PipelineContext::default(),
        config.build_features_encoder(None).unwrap(),
    )
    .unwrap();
    session
        .write(
            &[
                Feature::new("a", 3),
                Feature::new("url", "http://x"),
                Feature::new("bag", Counts::new("w").with_count("x", 2)),
            ],
            &true,
        )
        .unwrap();
    assert!(session.write(&[Feature::null("flag")], &false).is_err());
    let manifest = session.finish().unwrap();

    assert_eq!(manifest.instances, 1);
    let lookup = storage.read_to_string("feature-lookup.txt").unwrap();
    assert_eq!(lookup, "0\ta\n1\turl_http%U003A//x\n2\tw_x\n");
    let data = storage.read_to_string("training-data.svmlight").unwrap();
    let norm = (3f64 * 3.0 + 1.0 + 1.0).sqrt();
    assert_eq!(
        data,
        format!(
            "+1 0:{:.7} 1:{:.7} 2:{:.7}\n",
            3.0 / norm,
            1.0 / norm,
            1.0 / norm
        )
    );
}
