//! Bidirectional string/index vocabulary.
//!
//! A [`StringDictionary`] assigns dense indices to feature names in the order
//! they are first seen, starting at a fixed base (1 by default). During
//! training it grows; once frozen (explicitly, or by loading it from disk) it
//! only answers lookups and reports unseen names as `None`.
//!
//! The persisted form is one `index<TAB>name` record per line. Names are
//! written with tab and line breaks escaped (see [`crate::util::line`]).

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ahash::AHashMap;

use crate::error::{Result, TesseraError};
use crate::storage::Storage;
use crate::util::line::{escape_field, split_record, unescape_field};

/// Default first index handed out by a dictionary.
pub const DEFAULT_BASE_INDEX: u32 = 1;

/// A vocabulary mapping names to dense indices.
#[derive(Debug, Clone)]
pub struct StringDictionary {
    forward: AHashMap<String, u32>,
    names: Vec<String>,
    base_index: u32,
    frozen: bool,
}

impl StringDictionary {
    pub fn new() -> Self {
        Self::with_base_index(DEFAULT_BASE_INDEX)
    }

    pub fn with_base_index(base_index: u32) -> Self {
        StringDictionary {
            forward: AHashMap::new(),
            names: Vec::new(),
            base_index,
            frozen: false,
        }
    }

    /// Resolve a name to its index.
    ///
    /// While unfrozen, unseen names get the next free index. Once frozen,
    /// unseen names yield `None` and the dictionary is never modified. An
    /// unfrozen dictionary with no index left fails instead of dropping the name.
    pub fn resolve(&mut self, name: &str) -> Result<Option<u32>> {
        if let Some(index) = self.forward.get(name) {
            return Ok(Some(*index));
        }
        if self.frozen {
            return Ok(None);
        }

        let index = index_at(self.base_index, self.names.len()).ok_or_else(|| {
            TesseraError::invalid_operation(format!(
                "dictionary starting at {} has no index left for {name:?}",
                self.base_index
            ))
        })?;
        self.forward.insert(name.to_string(), index);
        self.names.push(name.to_string());
        Ok(Some(index))
    }

    /// Read-only lookup, regardless of the frozen state.
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.forward.get(name).copied()
    }

    /// Name stored at `index`.
    pub fn name_of(&self, index: u32) -> Option<&str> {
        let offset = index.checked_sub(self.base_index)? as usize;
        self.names.get(offset).map(String::as_str)
    }

    /// Stop handing out new indices.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn base_index(&self) -> u32 {
        self.base_index
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(index, name)` pairs in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.names
            .iter()
            .zip(self.base_index..=u32::MAX)
            .map(|(name, index)| (index, name.as_str()))
    }

    /// Write the lookup records, ordered by index or, if `sort_by_name`, by name.
    pub fn write_to<W: Write>(&self, writer: &mut W, sort_by_name: bool) -> Result<()> {
        let mut records: Vec<(u32, &str)> = self.iter().collect();
        if sort_by_name {
            records.sort_by(|a, b| a.1.cmp(b.1));
        }

        for (index, name) in records {
            writeln!(writer, "{index}\t{}", escape_field(name))?;
        }
        Ok(())
    }

    /// Read lookup records. The result is frozen.
    ///
    /// Indices must form one dense run (in any line order); the smallest
    /// index becomes the base.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut records: Vec<(u32, String)> = Vec::new();

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (index, name) = split_record(&line).ok_or_else(|| {
                TesseraError::persistence(format!(
                    "Lookup line {} has no tab separator",
                    line_number + 1
                ))
            })?;
            let index: u32 = index.parse().map_err(|_| {
                TesseraError::persistence(format!(
                    "Lookup line {} has a non-numeric index {index:?}",
                    line_number + 1
                ))
            })?;
            records.push((index, unescape_field(name)?));
        }

        records.sort_by_key(|(index, _)| *index);
        let base_index = records
            .first()
            .map(|(index, _)| *index)
            .unwrap_or(DEFAULT_BASE_INDEX);

        let mut dictionary = StringDictionary::with_base_index(base_index);
        for (offset, (index, name)) in records.into_iter().enumerate() {
            let expected = index_at(base_index, offset).ok_or_else(|| {
                TesseraError::persistence(format!(
                    "Lookup has more entries than indices from {base_index}"
                ))
            })?;
            if index != expected {
                return Err(TesseraError::persistence(format!(
                    "Lookup indices are not dense: expected {expected} but found {index}"
                )));
            }
            if dictionary.forward.insert(name.clone(), index).is_some() {
                return Err(TesseraError::persistence(format!(
                    "Lookup name {name:?} appears more than once"
                )));
            }
            dictionary.names.push(name);
        }

        dictionary.freeze();
        Ok(dictionary)
    }

    /// Persist to a named file in `storage`.
    pub fn save(&self, storage: &dyn Storage, name: &str, sort_by_name: bool) -> Result<()> {
        let mut output = storage.create_output(name)?;
        self.write_to(&mut output, sort_by_name)?;
        output.close()
    }

    /// Load a frozen dictionary from a named file in `storage`.
    pub fn load(storage: &dyn Storage, name: &str) -> Result<Self> {
        let input = storage.open_input(name)?;
        Self::read_from(BufReader::new(input))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, sort_by_name: bool) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer, sort_by_name)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }
}

/// Index of the entry `offset` places after `base`, if it fits in a `u32`.
fn index_at(base: u32, offset: usize) -> Option<u32> {
    base.checked_add(u32::try_from(offset).ok()?)
}

impl Default for StringDictionary {
    fn default() -> Self {
        Self::new()
    }
}
