//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is read from JSON. Every section has a default, so
//! `{}` is a valid configuration equivalent to [`PipelineConfig::default`].

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunking::{Chunking, ChunkingScheme};
use crate::dictionary::{DEFAULT_BASE_INDEX, StringDictionary};
use crate::encoder::{EncoderChain, FeatureEncoder, FeaturesEncoder, NameEscaper, NormalizerKind};
use crate::error::{Result, TesseraError};
use crate::idf::IdfStore;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub encoder: EncoderConfig,
    pub dictionary: DictionaryConfig,
    pub chunking: ChunkingConfig,
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TesseraError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
            .map_err(|e| TesseraError::config(format!("Invalid config {}: {e}", path.display())))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Write this configuration as pretty JSON.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// A fresh, growing encoder built from the encoder and dictionary sections.
    pub fn build_features_encoder(&self, idf: Option<&IdfStore>) -> Result<FeaturesEncoder> {
        let chain = self.encoder.build_chain(idf)?;
        Ok(self
            .encoder
            .apply(FeaturesEncoder::new(chain))
            .with_dictionary(StringDictionary::with_base_index(self.dictionary.base_index)))
    }

    pub fn build_chunking(&self) -> Box<dyn Chunking> {
        self.chunking.scheme.build(self.chunking.with_labels)
    }
}

/// One entry of the configured encoder chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EncoderSpec {
    Number,
    Boolean,
    Text,
    Name,
    Collection {
        #[serde(default)]
        identifier: Option<String>,
    },
    Bag {
        #[serde(default)]
        identifier: Option<String>,
    },
    /// `table` names a stored IDF table; `None` is the default table.
    #[serde(rename = "tfidf")]
    TfIdf {
        #[serde(default)]
        identifier: Option<String>,
        #[serde(default)]
        table: Option<String>,
    },
}

/// Feature encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Characters escaped in feature names.
    pub escape_chars: Vec<char>,
    /// Scale every encoded vector to unit length.
    pub normalize_vectors: bool,
    /// Normalizer applied by bag and TF-IDF encoders.
    pub counts_normalizer: NormalizerKind,
    /// Encoders in priority order. Empty means the default chain.
    pub chain: Vec<EncoderSpec>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            escape_chars: NameEscaper::default().reserved().to_vec(),
            normalize_vectors: false,
            counts_normalizer: NormalizerKind::None,
            chain: Vec::new(),
        }
    }
}

impl EncoderConfig {
    /// Build the encoder chain. TF-IDF entries load their tables from `idf`,
    /// which must then be present.
    pub fn build_chain(&self, idf: Option<&IdfStore>) -> Result<EncoderChain> {
        if self.chain.is_empty() {
            let mut chain = EncoderChain::default();
            if self.counts_normalizer != NormalizerKind::None {
                chain = EncoderChain::new(
                    chain
                        .encoders()
                        .iter()
                        .map(|encoder| match encoder {
                            FeatureEncoder::Bag { identifier, .. } => {
                                FeatureEncoder::bag(identifier.clone(), self.counts_normalizer)
                            }
                            other => other.clone(),
                        })
                        .collect(),
                );
            }
            return Ok(chain);
        }

        let encoders = self
            .chain
            .iter()
            .map(|spec| self.build_encoder(spec, idf))
            .collect::<Result<Vec<_>>>()?;
        Ok(EncoderChain::new(encoders))
    }

    pub fn build_encoder(&self, spec: &EncoderSpec, idf: Option<&IdfStore>) -> Result<FeatureEncoder> {
        let encoder = match spec {
            EncoderSpec::Number => FeatureEncoder::Number,
            EncoderSpec::Boolean => FeatureEncoder::Boolean,
            EncoderSpec::Text => FeatureEncoder::Text,
            EncoderSpec::Name => FeatureEncoder::Name,
            EncoderSpec::Collection { identifier } => FeatureEncoder::Collection {
                identifier: identifier.clone(),
            },
            EncoderSpec::Bag { identifier } => {
                FeatureEncoder::bag(identifier.clone(), self.counts_normalizer)
            }
            EncoderSpec::TfIdf { identifier, table } => {
                let store = idf.ok_or_else(|| {
                    TesseraError::config("tfidf encoder configured without an IDF store")
                })?;
                let loaded = store.load(table.as_deref())?;
                FeatureEncoder::tf_idf(identifier.clone(), Arc::new(loaded), self.counts_normalizer)
            }
        };
        Ok(encoder)
    }

    /// Apply the escaping and vector normalization settings.
    pub fn apply(&self, encoder: FeaturesEncoder) -> FeaturesEncoder {
        encoder
            .with_escaper(NameEscaper::new(self.escape_chars.clone()))
            .with_vector_normalization(self.normalize_vectors)
    }
}

/// Feature dictionary settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Index given to the first name.
    pub base_index: u32,
    /// Write the lookup file sorted by name instead of index.
    pub sort_by_name: bool,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        DictionaryConfig {
            base_index: DEFAULT_BASE_INDEX,
            sort_by_name: false,
        }
    }
}

/// Chunk codec settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub scheme: ChunkingScheme,
    pub with_labels: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            scheme: ChunkingScheme::default(),
            with_labels: true,
        }
    }
}
