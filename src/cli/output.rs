//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::chunking::Chunk;
use crate::cli::args::{OutputFormat, TesseraArgs};
use crate::error::Result;

/// Result of writing training data.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainResult {
    pub output_dir: String,
    pub writer: String,
    pub instances: u64,
    pub unlabeled: u64,
    pub features: usize,
    pub classes: Vec<String>,
    pub duration_ms: u64,
}

/// Result of an IDF collection pass.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdfResult {
    pub table_file: String,
    pub documents: u64,
    pub terms: usize,
    pub counts_consumed: usize,
}

/// Encoded instances, each as ascending `(index, value)` pairs.
#[derive(Debug, Serialize, Deserialize)]
pub struct EncodeResult {
    pub instances: Vec<Vec<(u32, f64)>>,
}

/// One converted sequence.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChunkLine {
    Outcomes(Vec<String>),
    Chunks(Vec<Chunk>),
}

/// Converted sequences.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkResult {
    pub scheme: String,
    pub sequences: Vec<ChunkLine>,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &TesseraArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &TesseraArgs) -> Result<()> {
    let value = serde_json::to_value(result)?;

    match result {
        _ if std::any::type_name::<T>().ends_with("EncodeResult") => {
            output_encoded_human(&value, args)
        }
        _ if std::any::type_name::<T>().ends_with("ChunkResult") => {
            output_chunks_human(&value, args)
        }
        _ => {
            if args.verbosity() > 0 {
                println!("{message}");
                println!();
            }
            output_generic_human(&value, args)
        }
    }
}

/// One `index:value` line per instance, in SVMlight feature syntax.
fn output_encoded_human(value: &serde_json::Value, _args: &TesseraArgs) -> Result<()> {
    if let Some(instances) = value.get("instances").and_then(|i| i.as_array()) {
        for instance in instances {
            let pairs = instance
                .as_array()
                .map(|pairs| {
                    pairs
                        .iter()
                        .filter_map(|pair| {
                            let index = pair.get(0)?.as_u64()?;
                            let number = pair.get(1)?.as_f64()?;
                            Some(format!("{index}:{number:.7}"))
                        })
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            println!("{pairs}");
        }
    }
    Ok(())
}

/// Outcomes space-separated, or chunks as `start-end:label`.
fn output_chunks_human(value: &serde_json::Value, _args: &TesseraArgs) -> Result<()> {
    if let Some(sequences) = value.get("sequences").and_then(|s| s.as_array()) {
        for sequence in sequences {
            let items = sequence.as_array().map(Vec::as_slice).unwrap_or_default();
            let line = items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(outcome) => outcome.clone(),
                    chunk => format_chunk(chunk),
                })
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
        }
    }
    Ok(())
}

fn format_chunk(chunk: &serde_json::Value) -> String {
    let start = chunk.get("start").and_then(|s| s.as_u64()).unwrap_or(0);
    let end = chunk.get("end").and_then(|e| e.as_u64()).unwrap_or(0);
    match chunk.get("label").and_then(|l| l.as_str()) {
        Some(label) => format!("{start}-{end}:{label}"),
        None => format!("{start}-{end}"),
    }
}

/// Output generic data in human format.
fn output_generic_human(value: &serde_json::Value, _args: &TesseraArgs) -> Result<()> {
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                let formatted_val = format_value(val);
                println!("{key}: {formatted_val}");
            }
        }
        _ => {
            let formatted_value = format_value(value);
            println!("{formatted_value}");
        }
    }
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &TesseraArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "null".to_string(),
    }
}
