//! Post-flatten scaling of encoded values.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::feature::NameNumber;

/// Rescales the numbers of a list of encoded features in place.
///
/// Implementations must be deterministic. Idempotence is not required.
pub trait Normalizer: Send + Sync + fmt::Debug {
    /// Get the name of this normalizer.
    fn name(&self) -> &'static str;

    fn normalize(&self, values: &mut [NameNumber]);
}

/// Leaves values untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNormalizer;

impl Normalizer for NoOpNormalizer {
    fn name(&self) -> &'static str {
        "none"
    }

    fn normalize(&self, _values: &mut [NameNumber]) {}
}

/// Divides every value by the L2 norm of the list.
///
/// A list whose norm is zero is left unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanNormalizer;

impl Normalizer for EuclideanNormalizer {
    fn name(&self) -> &'static str {
        "euclidean"
    }

    fn normalize(&self, values: &mut [NameNumber]) {
        let norm = values
            .iter()
            .map(|value| value.number * value.number)
            .sum::<f64>()
            .sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return;
        }
        for value in values.iter_mut() {
            value.number /= norm;
        }
    }
}

/// Serializable choice of a built-in normalizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizerKind {
    #[default]
    None,
    Euclidean,
}

impl NormalizerKind {
    pub fn build(self) -> Arc<dyn Normalizer> {
        match self {
            NormalizerKind::None => Arc::new(NoOpNormalizer),
            NormalizerKind::Euclidean => Arc::new(EuclideanNormalizer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(numbers: &[f64]) -> Vec<NameNumber> {
        numbers
            .iter()
            .enumerate()
            .map(|(i, n)| NameNumber::new(format!("f{i}"), *n))
            .collect()
    }

    #[test]
    fn test_euclidean() {
        let mut list = values(&[3.0, 4.0]);
        EuclideanNormalizer.normalize(&mut list);
        assert!((list[0].number - 0.6).abs() < 1e-12);
        assert!((list[1].number - 0.8).abs() < 1e-12);

        EuclideanNormalizer.normalize(&mut list);
        assert!((list[0].number - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_euclidean_zero_norm() {
        let mut list = values(&[0.0, 0.0]);
        EuclideanNormalizer.normalize(&mut list);
        assert_eq!(list[0].number, 0.0);
        assert_eq!(list[1].number, 0.0);
    }

    #[test]
    fn test_noop() {
        let mut list = values(&[3.0]);
        NoOpNormalizer.normalize(&mut list);
        assert_eq!(list[0].number, 3.0);
    }

    #[test]
    fn test_kind_build() {
        assert_eq!(NormalizerKind::None.build().name(), "none");
        assert_eq!(NormalizerKind::Euclidean.build().name(), "euclidean");
        let kind: NormalizerKind = serde_json::from_str("\"euclidean\"").unwrap();
        assert_eq!(kind, NormalizerKind::Euclidean);
    }
}
