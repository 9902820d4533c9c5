//! Feature trees produced by upstream extractors.
//!
//! A [`Feature`] is a named value. Values are scalars, nested
//! [`FeatureCollection`]s, or [`Counts`] multisets. Encoders flatten the tree
//! into [`NameNumber`] pairs, joining ancestor names with [`SEPARATOR`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator used when joining feature names.
pub const SEPARATOR: &str = "_";

/// A named feature value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(default)]
    pub value: FeatureValue,
}

impl Feature {
    pub fn new<N: Into<String>, V: Into<FeatureValue>>(name: N, value: V) -> Self {
        Feature {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A feature whose presence is its only information.
    pub fn null<N: Into<String>>(name: N) -> Self {
        Feature {
            name: name.into(),
            value: FeatureValue::Null,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Feature({}, {:?})", self.name, self.value)
    }
}

/// The value side of a [`Feature`].
///
/// Serialized untagged, so JSON input reads naturally:
/// `null`, `true`, `3`, `0.5`, `"NN"`, `{"features": [...]}` or
/// `{"feature_name": "w", "values": {"the": 2}}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Collection(FeatureCollection),
    Counts(Counts),
}

impl FeatureValue {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureValue::Null => "null",
            FeatureValue::Boolean(_) => "boolean",
            FeatureValue::Integer(_) => "integer",
            FeatureValue::Float(_) => "float",
            FeatureValue::Text(_) => "text",
            FeatureValue::Collection(_) => "collection",
            FeatureValue::Counts(_) => "counts",
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Boolean(value)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Integer(value)
    }
}

impl From<i32> for FeatureValue {
    fn from(value: i32) -> Self {
        FeatureValue::Integer(value as i64)
    }
}

impl From<u32> for FeatureValue {
    fn from(value: u32) -> Self {
        FeatureValue::Integer(value as i64)
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Float(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}

impl From<FeatureCollection> for FeatureValue {
    fn from(value: FeatureCollection) -> Self {
        FeatureValue::Collection(value)
    }
}

impl From<Counts> for FeatureValue {
    fn from(value: Counts) -> Self {
        FeatureValue::Counts(value)
    }
}

/// An ordered group of sub-features, optionally tagged with an identifier
/// that encoders can filter on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            identifier: None,
            features,
        }
    }

    pub fn with_identifier<S: Into<String>>(identifier: S, features: Vec<Feature>) -> Self {
        FeatureCollection {
            identifier: Some(identifier.into()),
            features,
        }
    }
}

/// A multiset of string values, e.g. the token counts of one document.
///
/// Values are kept in sorted order so every consumer iterates them the same
/// way.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Counts {
    pub feature_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub values: BTreeMap<String, u64>,
}

impl Counts {
    pub fn new<S: Into<String>>(feature_name: S) -> Self {
        Counts {
            feature_name: feature_name.into(),
            identifier: None,
            values: BTreeMap::new(),
        }
    }

    pub fn with_identifier<S: Into<String>>(mut self, identifier: S) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Builder form of [`Counts::add`].
    pub fn with_count<S: Into<String>>(mut self, value: S, count: u64) -> Self {
        self.add(value, count);
        self
    }

    /// Count every item of an iterator once.
    pub fn from_values<S, I>(feature_name: S, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut counts = Counts::new(feature_name);
        for value in values {
            counts.add(value, 1);
        }
        counts
    }

    pub fn add<S: Into<String>>(&mut self, value: S, count: u64) {
        *self.values.entry(value.into()).or_insert(0) += count;
    }

    pub fn count(&self, value: &str) -> u64 {
        self.values.get(value).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.values.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(value, count)| (value.as_str(), *count))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A flattened feature: a name and the number it contributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameNumber {
    pub name: String,
    pub number: f64,
}

impl NameNumber {
    pub fn new<S: Into<String>>(name: S, number: f64) -> Self {
        NameNumber {
            name: name.into(),
            number,
        }
    }
}

/// Join two name parts with [`SEPARATOR`].
pub fn join_name(prefix: &str, suffix: &str) -> String {
    let mut name = String::with_capacity(prefix.len() + SEPARATOR.len() + suffix.len());
    name.push_str(prefix);
    name.push_str(SEPARATOR);
    name.push_str(suffix);
    name
}
