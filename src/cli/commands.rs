//! Command implementations for the Tessera CLI.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::chunking::{Chunk, ChunkingScheme, Span};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::encoder::FeaturesEncoder;
use crate::error::{Result, TesseraError};
use crate::feature::Feature;
use crate::idf::store::table_file_name;
use crate::idf::{IdfCollector, IdfStore};
use crate::storage::StorageFactory;
use crate::writer::{BinarySession, OvaSession};

/// A training instance. `outcome` is a boolean for binary data, a string for
/// one-vs-all data, and absent or null for unlabeled instances.
#[derive(Debug, Deserialize)]
pub struct TrainingRecord {
    pub features: Vec<Feature>,
    #[serde(default)]
    pub outcome: Option<OutcomeValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OutcomeValue {
    Boolean(bool),
    Text(String),
}

/// An instance without an outcome.
#[derive(Debug, Deserialize)]
pub struct FeatureRecord {
    pub features: Vec<Feature>,
}

/// A token sequence with either chunks or outcomes.
#[derive(Debug, Deserialize)]
pub struct ChunkRecord {
    pub tokens: Vec<Span>,
    #[serde(default)]
    pub chunks: Option<Vec<Chunk>>,
    #[serde(default)]
    pub outcomes: Option<Vec<String>>,
}

/// Execute a CLI command.
pub fn execute_command(args: TesseraArgs) -> Result<()> {
    let context = PipelineContext::default();
    match &args.command {
        Command::Train(train_args) => train(train_args.clone(), &args, &context),
        Command::Idf(idf_args) => collect_idf(idf_args.clone(), &args, &context),
        Command::Encode(encode_args) => encode(encode_args.clone(), &args, &context),
        Command::Chunk(chunk_args) => chunk(chunk_args.clone(), &args),
    }
}

/// Read one JSON value per non-blank line.
pub fn read_jsonl<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            TesseraError::other(format!(
                "{} line {}: {e}",
                path.display(),
                line_num + 1
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path),
        None => Ok(PipelineConfig::default()),
    }
}

fn open_idf_store(dir: Option<&Path>, context: &PipelineContext) -> Result<Option<IdfStore>> {
    match dir {
        Some(dir) => Ok(Some(IdfStore::new(StorageFactory::open_dir(dir)?, context.clone()))),
        None => Ok(None),
    }
}

/// Encode labeled instances and write training data.
fn train(args: TrainArgs, cli_args: &TesseraArgs, context: &PipelineContext) -> Result<()> {
    let start_time = Instant::now();
    let context = context.child("train");
    let config = load_config(args.config.as_deref())?;
    let idf = open_idf_store(args.idf_dir.as_deref(), &context)?;
    let features = config.build_features_encoder(idf.as_ref())?;
    let records: Vec<TrainingRecord> = read_jsonl(&args.input)?;
    log::info!(
        target: context.target(),
        "read {} instances from {}",
        records.len(),
        args.input.display()
    );

    let storage = StorageFactory::open_dir(&args.output_dir)?;
    let manifest = match args.writer {
        WriterKind::Binary => {
            let mut session = BinarySession::binary(storage, context.clone(), features)?
                .with_sorted_lookup(config.dictionary.sort_by_name);
            for (line, record) in records.iter().enumerate() {
                match &record.outcome {
                    Some(OutcomeValue::Boolean(outcome)) => session.write(&record.features, outcome)?,
                    None => session.write_unlabeled(&record.features)?,
                    Some(OutcomeValue::Text(outcome)) => {
                        return Err(TesseraError::invalid_operation(format!(
                            "instance {}: binary writer needs a boolean outcome, got {outcome:?}",
                            line + 1
                        )));
                    }
                }
            }
            session.finish()?
        }
        WriterKind::Ova => {
            let mut session = OvaSession::one_vs_all(storage, context.clone(), features)?
                .with_sorted_lookup(config.dictionary.sort_by_name);
            for record in &records {
                match &record.outcome {
                    Some(OutcomeValue::Text(outcome)) => session.write(&record.features, outcome)?,
                    Some(OutcomeValue::Boolean(outcome)) => {
                        session.write(&record.features, &outcome.to_string())?
                    }
                    None => session.write_unlabeled(&record.features)?,
                }
            }
            session.finish()?
        }
    };

    output_result(
        "Training data written",
        &TrainResult {
            output_dir: args.output_dir.to_string_lossy().to_string(),
            writer: manifest.writer,
            instances: manifest.instances,
            unlabeled: manifest.unlabeled,
            features: manifest.features,
            classes: manifest.classes,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Collect document frequencies into a stored table.
fn collect_idf(args: IdfArgs, cli_args: &TesseraArgs, context: &PipelineContext) -> Result<()> {
    let store = IdfStore::new(StorageFactory::open_dir(&args.root)?, context.clone());
    let mut collector = IdfCollector::open(&store, args.name.clone(), args.identifier.clone())?;

    let records: Vec<FeatureRecord> = read_jsonl(&args.input)?;
    let consumed: usize = records
        .iter()
        .map(|record| collector.consume_features(&record.features))
        .sum();
    if consumed == 0 {
        log::warn!(
            target: context.target(),
            "no counts matched identifier {:?} in {}",
            args.identifier,
            args.input.display()
        );
    }
    let table = collector.finish(&store)?;

    output_result(
        "Document frequencies written",
        &IdfResult {
            table_file: table_file_name(args.name.as_deref()),
            documents: table.total_documents(),
            terms: table.len(),
            counts_consumed: consumed,
        },
        cli_args,
    )
}

/// Encode instances with the dictionary stored in a training directory.
fn encode(args: EncodeArgs, cli_args: &TesseraArgs, context: &PipelineContext) -> Result<()> {
    let context = context.child("encode");
    let config = load_config(args.config.as_deref())?;
    let idf = open_idf_store(args.idf_dir.as_deref(), &context)?;
    let chain = config.encoder.build_chain(idf.as_ref())?;
    let storage = StorageFactory::open_dir(&args.model_dir)?;
    let encoder = config
        .encoder
        .apply(FeaturesEncoder::load(storage.as_ref(), chain)?);
    log::debug!(
        target: context.target(),
        "loaded dictionary with {} features from {}",
        encoder.dictionary().len(),
        args.model_dir.display()
    );

    let instances: Vec<Vec<Feature>> = read_jsonl::<FeatureRecord, _>(&args.input)?
        .into_iter()
        .map(|record| record.features)
        .collect();
    let vectors = encoder.encode_batch(&instances)?;

    output_result(
        "Encoded instances",
        &EncodeResult {
            instances: vectors.iter().map(|v| v.iter().collect()).collect(),
        },
        cli_args,
    )
}

/// Convert chunks to outcomes or back.
fn chunk(args: ChunkArgs, cli_args: &TesseraArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let scheme = args
        .scheme
        .map(ChunkingScheme::from)
        .unwrap_or(config.chunking.scheme);
    let codec = scheme.build(config.chunking.with_labels && !args.no_labels);

    let records: Vec<ChunkRecord> = read_jsonl(&args.input)?;
    let mut sequences = Vec::with_capacity(records.len());
    for (line, record) in records.into_iter().enumerate() {
        let converted = match args.to {
            ChunkTarget::Outcomes => {
                let chunks = record.chunks.ok_or_else(|| {
                    TesseraError::invalid_operation(format!("sequence {} has no chunks", line + 1))
                })?;
                ChunkLine::Outcomes(codec.to_outcomes(&record.tokens, &chunks))
            }
            ChunkTarget::Chunks => {
                let outcomes = record.outcomes.ok_or_else(|| {
                    TesseraError::invalid_operation(format!("sequence {} has no outcomes", line + 1))
                })?;
                ChunkLine::Chunks(codec.to_chunks(&record.tokens, &outcomes)?)
            }
        };
        sequences.push(converted);
    }

    output_result(
        "Converted sequences",
        &ChunkResult {
            scheme: codec.name().to_string(),
            sequences,
        },
        cli_args,
    )
}
