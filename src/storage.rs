//! Storage abstraction layer for Tessera.
//!
//! Every artifact a pipeline run produces (SVMlight files, lookup files,
//! frequency tables, the manifest) lives in a flat namespace rooted at one
//! [`Storage`]. File and memory backends can be swapped without touching the
//! writers that use them.
//!
//! # Example
//!
//! ```
//! use tessera::storage::{StorageFactory, StorageConfig};
//! use tessera::storage::memory::MemoryStorageConfig;
//!
//! # fn main() -> tessera::error::Result<()> {
//! let storage = StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default()))?;
//! assert!(!storage.file_exists("feature-lookup.txt"));
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::{Result, TesseraError};

pub mod file;
pub mod memory;

/// A trait for storage backends that can store and retrieve named files.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open an existing file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create a file for writing, truncating any previous content.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Open a file for appending, creating it if needed.
    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file succeeds.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files in the storage, sorted by name.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Get the size of a file in bytes.
    fn file_size(&self, name: &str) -> Result<u64>;

    /// Rename a file, replacing the destination if it exists.
    ///
    /// Writers use this for atomic replacement: write a temporary file, then
    /// rename it over the final name so readers never see partial data.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Copy the committed bytes of `source` into `target`, replacing `target`.
    fn copy_file(&self, source: &str, target: &str) -> Result<()> {
        let mut input = self.open_input(source)?;
        let mut output = self.create_output(target)?;
        std::io::copy(&mut input, &mut output)?;
        output.close()
    }

    /// Read a whole file as UTF-8 text.
    fn read_to_string(&self, name: &str) -> Result<String> {
        let mut input = self.open_input(name)?;
        let mut text = String::new();
        input.read_to_string(&mut text).map_err(|e| {
            TesseraError::persistence(format!("Failed to read {name} as UTF-8 text: {e}"))
        })?;
        Ok(text)
    }

    /// Sync all pending writes to storage.
    fn sync(&self) -> Result<()>;
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Send + std::fmt::Debug {
    /// Get the size of the input stream.
    fn size(&self) -> Result<u64>;
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Send + std::fmt::Debug {
    /// Flush buffered bytes and make them visible to readers of the same storage.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Number of bytes in the file after the last write.
    fn position(&self) -> Result<u64>;

    /// Close the output stream. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// Configuration for storage backends.
///
/// Each variant carries the configuration specific to that backend; the
/// path is part of [`file::FileStorageConfig`].
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// File-based storage configuration (includes path)
    File(file::FileStorageConfig),

    /// Memory-based storage configuration
    Memory(memory::MemoryStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory(memory::MemoryStorageConfig::default())
    }
}

/// A factory for creating storage instances.
pub struct StorageFactory;

impl StorageFactory {
    /// Create a new storage instance with the given configuration.
    pub fn create(config: StorageConfig) -> Result<Arc<dyn Storage>> {
        match config {
            StorageConfig::Memory(mem_config) => {
                let storage = memory::MemoryStorage::new(mem_config);
                Ok(Arc::new(storage))
            }
            StorageConfig::File(file_config) => {
                let storage = file::FileStorage::new(file_config)?;
                Ok(Arc::new(storage))
            }
        }
    }

    /// Open file storage rooted at `path`, creating the directory if needed.
    pub fn open_dir<P: AsRef<std::path::Path>>(path: P) -> Result<Arc<dyn Storage>> {
        Self::create(StorageConfig::File(file::FileStorageConfig::new(path)))
    }
}

/// Error types specific to storage operations.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// File not found.
    FileNotFound(String),

    /// I/O error.
    IoError(String),

    /// Output is already closed.
    OutputClosed(String),

    /// Invalid file name.
    InvalidName(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::FileNotFound(name) => write!(f, "File not found: {name}"),
            StorageError::IoError(msg) => write!(f, "I/O error: {msg}"),
            StorageError::OutputClosed(name) => write!(f, "Output is closed: {name}"),
            StorageError::InvalidName(name) => write!(f, "Invalid file name: {name}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for TesseraError {
    fn from(err: StorageError) -> Self {
        TesseraError::storage(err.to_string())
    }
}

/// Reject names that would escape the flat storage namespace.
pub(crate) fn validate_name(name: &str) -> std::result::Result<(), StorageError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == "." || name == ".."
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::file::FileStorageConfig;
    use crate::storage::memory::MemoryStorageConfig;

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();

        match config {
            StorageConfig::Memory(mem_config) => {
                assert_eq!(mem_config.initial_capacity, 16);
            }
            _ => panic!("Expected Memory config"),
        }
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::FileNotFound("test.txt".to_string());
        assert_eq!(err.to_string(), "File not found: test.txt");

        let err = StorageError::IoError("disk full".to_string());
        assert_eq!(err.to_string(), "I/O error: disk full");

        let err = StorageError::InvalidName("../x".to_string());
        assert_eq!(err.to_string(), "Invalid file name: ../x");

        let converted: TesseraError = StorageError::OutputClosed("a".to_string()).into();
        assert_eq!(converted.to_string(), "Storage error: Output is closed: a");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("training-data-1.svmlight").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("sub/file").is_err());
    }

    #[test]
    fn test_storage_factory_memory() {
        let config = StorageConfig::Memory(MemoryStorageConfig::default());
        let storage = StorageFactory::create(config).unwrap();

        assert!(!storage.file_exists("test.txt"));
    }

    #[test]
    fn test_copy_and_read_to_string() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::File(FileStorageConfig::new(temp_dir.path()));
        let storage = StorageFactory::create(config).unwrap();

        let mut output = storage.create_output("source.txt").unwrap();
        output.write_all(b"-1 1:1.0000000\n").unwrap();
        output.close().unwrap();

        storage.copy_file("source.txt", "target.txt").unwrap();
        assert_eq!(
            storage.read_to_string("target.txt").unwrap(),
            "-1 1:1.0000000\n"
        );
        assert_eq!(storage.list_files().unwrap(), vec!["source.txt", "target.txt"]);
    }
}
