//! Document frequency table.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesseraError};
use crate::feature::Counts;
use crate::util::line::{escape_field, split_record, unescape_field};

/// First line of a persisted table.
pub const TABLE_HEADER: &str = "#tessera-idf v1";

const HEADER_PREFIX: &str = "#tessera-idf ";
const DOCUMENTS_KEY: &str = "documents";

/// Number of documents seen and, per term, the number of documents containing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFrequencyTable {
    total_documents: u64,
    document_frequency: BTreeMap<String, u64>,
}

impl DocumentFrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one document.
    ///
    /// Every value with a non-zero count gains one document; the document
    /// total grows by one even if the multiset is empty.
    pub fn consume(&mut self, counts: &Counts) {
        self.total_documents += 1;
        for (value, count) in counts.iter() {
            if count > 0 {
                *self.document_frequency.entry(value.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// `ln((N + 1) / (df + 1))`. Terms present in every document score 0 and
    /// unseen terms score `ln(N + 1)`.
    pub fn idf(&self, term: &str) -> f64 {
        let documents = self.total_documents as f64 + 1.0;
        let frequency = self.document_frequency(term) as f64 + 1.0;
        (documents / frequency).ln()
    }

    pub fn document_frequency(&self, term: &str) -> u64 {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    pub fn total_documents(&self) -> u64 {
        self.total_documents
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.document_frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_documents == 0 && self.document_frequency.is_empty()
    }

    /// Terms and frequencies in sorted term order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.document_frequency
            .iter()
            .map(|(term, df)| (term.as_str(), *df))
    }

    /// Add another table's document total and term frequencies to this one.
    pub fn merge(&mut self, other: &DocumentFrequencyTable) {
        self.total_documents += other.total_documents;
        for (term, df) in &other.document_frequency {
            *self.document_frequency.entry(term.clone()).or_insert(0) += df;
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{TABLE_HEADER}")?;
        writeln!(writer, "{DOCUMENTS_KEY}\t{}", self.total_documents)?;
        for (term, df) in &self.document_frequency {
            writeln!(writer, "{}\t{df}", escape_field(term))?;
        }
        Ok(())
    }

    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();

        let header = lines
            .next()
            .transpose()?
            .ok_or_else(|| TesseraError::persistence("Frequency table is empty"))?;
        if header != TABLE_HEADER {
            return Err(match header.strip_prefix(HEADER_PREFIX) {
                Some(version) => TesseraError::persistence(format!(
                    "Unsupported frequency table version {version:?}"
                )),
                None => TesseraError::persistence(format!(
                    "Not a frequency table: header {header:?}"
                )),
            });
        }

        let documents = lines
            .next()
            .transpose()?
            .ok_or_else(|| TesseraError::persistence("Frequency table has no document count"))?;
        let total_documents = match split_record(&documents) {
            Some((DOCUMENTS_KEY, count)) => parse_count(count, 2)?,
            _ => {
                return Err(TesseraError::persistence(format!(
                    "Line 2 should hold the document count, found {documents:?}"
                )));
            }
        };

        let mut document_frequency = BTreeMap::new();
        for (offset, line) in lines.enumerate() {
            let line = line?;
            let line_number = offset + 3;
            if line.is_empty() {
                continue;
            }
            let (term, df) = split_record(&line).ok_or_else(|| {
                TesseraError::persistence(format!(
                    "Frequency table line {line_number} has no tab separator"
                ))
            })?;
            document_frequency.insert(unescape_field(term)?, parse_count(df, line_number)?);
        }

        Ok(DocumentFrequencyTable {
            total_documents,
            document_frequency,
        })
    }
}

fn parse_count(text: &str, line_number: usize) -> Result<u64> {
    text.parse().map_err(|_| {
        TesseraError::persistence(format!(
            "Frequency table line {line_number} has a non-numeric count {text:?}"
        ))
    })
}
