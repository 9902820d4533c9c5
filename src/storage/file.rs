//! File-based storage implementation.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, TesseraError};
use crate::storage::{Storage, StorageError, StorageInput, StorageOutput, validate_name};

/// Configuration for [`FileStorage`].
#[derive(Debug, Clone)]
pub struct FileStorageConfig {
    /// Root directory of the storage.
    pub path: PathBuf,

    /// Buffer size for I/O operations.
    pub buffer_size: usize,

    /// Whether to fsync when an output is flushed or closed.
    pub sync_writes: bool,
}

impl FileStorageConfig {
    /// Create a configuration rooted at `path` with default buffering.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileStorageConfig {
            path: path.as_ref().to_path_buf(),
            buffer_size: 65536,
            sync_writes: false,
        }
    }
}

/// A file-based storage implementation.
#[derive(Debug)]
pub struct FileStorage {
    /// The root directory for storage.
    directory: PathBuf,
    /// Storage configuration.
    config: FileStorageConfig,
}

impl FileStorage {
    /// Create a new file storage, creating its directory if it doesn't exist.
    pub fn new(config: FileStorageConfig) -> Result<Self> {
        let directory = config.path.clone();

        if !directory.exists() {
            std::fs::create_dir_all(&directory)
                .map_err(|e| TesseraError::storage(format!("Failed to create directory: {e}")))?;
        }

        if !directory.is_dir() {
            return Err(TesseraError::storage(format!(
                "Path is not a directory: {}",
                directory.display()
            )));
        }

        Ok(FileStorage { directory, config })
    }

    /// Root directory of this storage.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Get the full path for a file name.
    fn file_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.directory.join(name))
    }
}

fn map_io(name: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::FileNotFound(name.to_string())
    } else {
        StorageError::IoError(format!("{name}: {e}"))
    }
}

impl Storage for FileStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let path = self.file_path(name)?;
        let file = File::open(&path).map_err(|e| map_io(name, e))?;

        Ok(Box::new(FileInput::new(file, self.config.buffer_size)?))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let path = self.file_path(name)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| map_io(name, e))?;

        Ok(Box::new(FileOutput::new(
            file,
            0,
            self.config.buffer_size,
            self.config.sync_writes,
        )))
    }

    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let path = self.file_path(name)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| map_io(name, e))?;
        let position = file.metadata().map_err(|e| map_io(name, e))?.len();

        Ok(Box::new(FileOutput::new(
            file,
            position,
            self.config.buffer_size,
            self.config.sync_writes,
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.file_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.file_path(name)?;
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| StorageError::IoError(format!("Failed to delete {name}: {e}")))?;
        }

        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();

        for entry in
            std::fs::read_dir(&self.directory).map_err(|e| StorageError::IoError(e.to_string()))?
        {
            let entry = entry.map_err(|e| StorageError::IoError(e.to_string()))?;
            let path = entry.path();

            if path.is_file()
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
            {
                files.push(name.to_string());
            }
        }

        files.sort();
        Ok(files)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        let path = self.file_path(name)?;
        let metadata = path.metadata().map_err(|e| map_io(name, e))?;

        Ok(metadata.len())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        let old_path = self.file_path(old_name)?;
        let new_path = self.file_path(new_name)?;

        std::fs::rename(&old_path, &new_path).map_err(|e| {
            StorageError::IoError(format!("Failed to rename {old_name} to {new_name}: {e}"))
        })?;

        Ok(())
    }

    fn copy_file(&self, source: &str, target: &str) -> Result<()> {
        let source_path = self.file_path(source)?;
        let target_path = self.file_path(target)?;

        std::fs::copy(&source_path, &target_path).map_err(|e| map_io(source, e))?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        // Individual files are synced when they are closed.
        Ok(())
    }
}

/// A file input implementation.
#[derive(Debug)]
pub struct FileInput {
    reader: BufReader<File>,
    size: u64,
}

impl FileInput {
    fn new(file: File, buffer_size: usize) -> Result<Self> {
        let metadata = file
            .metadata()
            .map_err(|e| TesseraError::storage(format!("Failed to get file metadata: {e}")))?;

        let size = metadata.len();
        let reader = BufReader::with_capacity(buffer_size, file);

        Ok(FileInput { reader, size })
    }
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl StorageInput for FileInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

/// A file output implementation.
#[derive(Debug)]
pub struct FileOutput {
    writer: BufWriter<File>,
    sync_writes: bool,
    position: u64,
    closed: bool,
}

impl FileOutput {
    fn new(file: File, position: u64, buffer_size: usize, sync_writes: bool) -> Self {
        FileOutput {
            writer: BufWriter::with_capacity(buffer_size, file),
            sync_writes,
            position,
            closed: false,
        }
    }
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::other("Output is closed"));
        }

        let bytes_written = self.writer.write(buf)?;
        self.position += bytes_written as u64;
        Ok(bytes_written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl StorageOutput for FileOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| TesseraError::storage(format!("Failed to flush: {e}")))?;

        if self.sync_writes {
            self.writer
                .get_ref()
                .sync_all()
                .map_err(|e| TesseraError::storage(format!("Failed to sync: {e}")))?;
        }

        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(self.position)
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.flush_and_sync()?;
            self.closed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(FileStorageConfig::new(temp_dir.path())).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_file_storage_creation() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("run").join("out");
        let storage = FileStorage::new(FileStorageConfig::new(&nested)).unwrap();

        assert!(nested.is_dir());
        assert_eq!(storage.directory(), nested.as_path());
        assert!(storage.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_create_and_read_file() {
        let (_dir, storage) = storage();

        let mut output = storage.create_output("test.txt").unwrap();
        output.write_all(b"Hello, World!").unwrap();
        assert_eq!(output.position().unwrap(), 13);
        output.close().unwrap();

        let mut input = storage.open_input("test.txt").unwrap();
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer).unwrap();

        assert_eq!(buffer, b"Hello, World!");
        assert_eq!(input.size().unwrap(), 13);
    }

    #[test]
    fn test_append() {
        let (_dir, storage) = storage();

        let mut output = storage.create_output("log.txt").unwrap();
        output.write_all(b"first\n").unwrap();
        output.close().unwrap();

        let mut output = storage.create_output_append("log.txt").unwrap();
        assert_eq!(output.position().unwrap(), 6);
        output.write_all(b"second\n").unwrap();
        output.close().unwrap();

        assert_eq!(storage.read_to_string("log.txt").unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_rename_replaces_target() {
        let (_dir, storage) = storage();

        for (name, content) in [("a.tmp", b"new".as_slice()), ("a.txt", b"old".as_slice())] {
            let mut output = storage.create_output(name).unwrap();
            output.write_all(content).unwrap();
            output.close().unwrap();
        }

        storage.rename_file("a.tmp", "a.txt").unwrap();
        assert!(!storage.file_exists("a.tmp"));
        assert_eq!(storage.read_to_string("a.txt").unwrap(), "new");
    }

    #[test]
    fn test_delete_and_missing_file() {
        let (_dir, storage) = storage();

        let mut output = storage.create_output("temp.bin").unwrap();
        output.write_all(b"x").unwrap();
        output.close().unwrap();

        storage.delete_file("temp.bin").unwrap();
        assert!(!storage.file_exists("temp.bin"));
        storage.delete_file("temp.bin").unwrap();

        let err = storage.open_input("temp.bin").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_rejects_path_escapes() {
        let (_dir, storage) = storage();
        assert!(storage.create_output("../escape.txt").is_err());
        assert!(!storage.file_exists("../escape.txt"));
    }

    #[test]
    fn test_write_after_close_fails() {
        let (_dir, storage) = storage();
        let mut output = storage.create_output("closed.txt").unwrap();
        output.close().unwrap();
        output.close().unwrap();
        assert!(output.write_all(b"late").is_err());
    }
}
