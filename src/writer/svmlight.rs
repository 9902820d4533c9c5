//! SVMlight instance lines.
//!
//! A line is a label followed by ` index:value` for every non-zero entry in
//! ascending index order, with seven fractional digits.

use std::fmt::Write as _;

use crate::error::{Result, TesseraError};
use crate::vector::SparseVector;

pub const POSITIVE: &str = "+1";
pub const NEGATIVE: &str = "-1";
/// Label of an instance whose outcome is unknown.
pub const UNLABELED: &str = "0";

/// The feature part of a line, starting with a space unless empty.
///
/// Fails without producing anything if a value is NaN or infinite.
pub fn format_features(vector: &SparseVector) -> Result<String> {
    if let Some((index, value)) = vector.first_non_finite() {
        return Err(TesseraError::invalid_feature(format!(
            "index {index} has non-finite value {value}"
        )));
    }

    let mut features = String::with_capacity(vector.len() * 14);
    for (index, value) in vector.iter().filter(|(_, value)| *value != 0.0) {
        let _ = write!(features, " {index}:{value:.7}");
    }
    Ok(features)
}

/// A full line, including the trailing newline.
pub fn format_line(label: &str, vector: &SparseVector) -> Result<String> {
    let features = format_features(vector)?;
    Ok(format!("{label}{features}\n"))
}
