//! Persistent frequency tables under one storage root.
//!
//! The default table lives in `idf.table`; a table named `x` lives in
//! `idf-x.table`. Writes go to a temporary file that is renamed over the
//! target once complete.

use std::io::BufReader;
use std::sync::Arc;

use crate::context::PipelineContext;
use crate::error::{Result, TesseraError};
use crate::idf::table::DocumentFrequencyTable;
use crate::storage::Storage;

/// File holding the default (unnamed) table.
pub const DEFAULT_TABLE_FILE: &str = "idf.table";

const NAMED_PREFIX: &str = "idf-";
const TABLE_SUFFIX: &str = ".table";
const TEMP_SUFFIX: &str = ".tmp";

/// File name for the default table (`None`) or a named one.
pub fn table_file_name(name: Option<&str>) -> String {
    match name {
        None => DEFAULT_TABLE_FILE.to_string(),
        Some(name) => format!("{NAMED_PREFIX}{name}{TABLE_SUFFIX}"),
    }
}

fn display_name(name: Option<&str>) -> &str {
    name.unwrap_or("<default>")
}

/// Loads, merges and writes frequency tables in one storage root.
#[derive(Debug, Clone)]
pub struct IdfStore {
    storage: Arc<dyn Storage>,
    context: PipelineContext,
}

impl IdfStore {
    pub fn new(storage: Arc<dyn Storage>, context: PipelineContext) -> Self {
        IdfStore {
            storage,
            context: context.child("idf"),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn exists(&self, name: Option<&str>) -> bool {
        self.storage.file_exists(&table_file_name(name))
    }

    pub fn load(&self, name: Option<&str>) -> Result<DocumentFrequencyTable> {
        let file_name = table_file_name(name);
        let input = self.storage.open_input(&file_name)?;
        DocumentFrequencyTable::read_from(BufReader::new(input)).map_err(|e| {
            TesseraError::persistence(format!("Failed to load {file_name}: {e}"))
        })
    }

    /// The stored table, or an empty one if nothing was written yet.
    pub fn load_or_default(&self, name: Option<&str>) -> Result<DocumentFrequencyTable> {
        if self.exists(name) {
            let table = self.load(name)?;
            log::debug!(
                target: self.context.target(),
                "loaded frequency table {} ({} documents, {} terms)",
                display_name(name),
                table.total_documents(),
                table.len()
            );
            Ok(table)
        } else {
            Ok(DocumentFrequencyTable::new())
        }
    }

    /// Replace the stored table atomically.
    pub fn write(&self, name: Option<&str>, table: &DocumentFrequencyTable) -> Result<()> {
        let file_name = table_file_name(name);
        let temp_name = format!("{file_name}{TEMP_SUFFIX}");

        let result = self.write_temp(&temp_name, table).and_then(|_| {
            self.storage.rename_file(&temp_name, &file_name)
        });
        if let Err(e) = result {
            let _ = self.storage.delete_file(&temp_name);
            log::error!(
                target: self.context.target(),
                "failed to write frequency table {file_name}: {e}"
            );
            return Err(TesseraError::persistence(format!(
                "Failed to write {file_name}: {e}"
            )));
        }

        log::info!(
            target: self.context.target(),
            "wrote frequency table {} ({} documents, {} terms)",
            display_name(name),
            table.total_documents(),
            table.len()
        );
        Ok(())
    }

    fn write_temp(&self, temp_name: &str, table: &DocumentFrequencyTable) -> Result<()> {
        let mut output = self.storage.create_output(temp_name)?;
        table.write_to(&mut output)?;
        output.close()
    }

    /// Write several tables, attempting every one and reporting all failures.
    pub fn write_all<'a, I>(&self, tables: I) -> Result<()>
    where
        I: IntoIterator<Item = (Option<&'a str>, &'a DocumentFrequencyTable)>,
    {
        let errors: Vec<TesseraError> = tables
            .into_iter()
            .filter_map(|(name, table)| self.write(name, table).err())
            .collect();
        TesseraError::aggregate(errors)
    }

    /// Add `table` to whatever is stored under `name` and write the sum back.
    pub fn merge_into(
        &self,
        name: Option<&str>,
        table: &DocumentFrequencyTable,
    ) -> Result<DocumentFrequencyTable> {
        let mut merged = self.load_or_default(name)?;
        merged.merge(table);
        self.write(name, &merged)?;
        Ok(merged)
    }

    /// Tables present in the storage: `None` for the default table, then
    /// named tables in sorted order.
    pub fn list(&self) -> Result<Vec<Option<String>>> {
        let mut tables = Vec::new();
        for file_name in self.storage.list_files()? {
            if file_name == DEFAULT_TABLE_FILE {
                tables.insert(0, None);
            } else if let Some(name) = file_name
                .strip_prefix(NAMED_PREFIX)
                .and_then(|rest| rest.strip_suffix(TABLE_SUFFIX))
            {
                tables.push(Some(name.to_string()));
            }
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Counts;
    use crate::storage::memory::MemoryStorage;

    fn store() -> IdfStore {
        IdfStore::new(Arc::new(MemoryStorage::new_default()), PipelineContext::default())
    }

    fn table_with(values: &[&str]) -> DocumentFrequencyTable {
        let mut table = DocumentFrequencyTable::new();
        table.consume(&Counts::from_values("token", values.iter().copied()));
        table
    }

    #[test]
    fn test_file_names() {
        assert_eq!(table_file_name(None), "idf.table");
        assert_eq!(table_file_name(Some("lemma")), "idf-lemma.table");
    }

    #[test]
    fn test_write_and_load() {
        let store = store();
        let table = table_with(&["a", "b"]);

        assert!(!store.exists(None));
        store.write(None, &table).unwrap();
        assert!(store.exists(None));
        assert!(!store.storage().file_exists("idf.table.tmp"));
        assert_eq!(store.load(None).unwrap(), table);
    }

    #[test]
    fn test_named_tables_are_independent() {
        let store = store();
        store.write(Some("lemma"), &table_with(&["run"])).unwrap();
        store.write(None, &table_with(&["ran"])).unwrap();
        store.write(Some("affix"), &table_with(&["-ed"])).unwrap();

        assert_eq!(store.load(Some("lemma")).unwrap().document_frequency("run"), 1);
        assert_eq!(store.load(None).unwrap().document_frequency("run"), 0);
        assert_eq!(
            store.list().unwrap(),
            vec![None, Some("affix".to_string()), Some("lemma".to_string())]
        );
    }

    #[test]
    fn test_merge_into() {
        let store = store();
        store.merge_into(Some("t"), &table_with(&["a"])).unwrap();
        let merged = store.merge_into(Some("t"), &table_with(&["a", "b"])).unwrap();

        assert_eq!(merged.total_documents(), 2);
        assert_eq!(merged.document_frequency("a"), 2);
        assert_eq!(store.load(Some("t")).unwrap(), merged);
    }

    #[test]
    fn test_load_or_default_missing() {
        let table = store().load_or_default(Some("none")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_write_all_reports_every_failure() {
        let store = store();
        let table = table_with(&["x"]);
        let result = store.write_all([
            (Some("ok"), &table),
            (Some("bad/one"), &table),
            (Some("bad/two"), &table),
        ]);

        match result {
            Err(TesseraError::PersistenceFailures(messages)) => assert_eq!(messages.len(), 2),
            other => panic!("Expected aggregated failures, got {other:?}"),
        }
        assert!(store.exists(Some("ok")));
    }
}
