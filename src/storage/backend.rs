//! Storage backend trait and implementations.
//!
//! This module provides the raw line stores underneath [`Storage`](super::Storage):
//! - `FileBackend` - JSONL files in a data directory (default)
//! - `MemoryBackend` - In-process buffers, used for tests and dry runs

use crate::Result;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

/// Trait for storage backends that handle raw data persistence.
///
/// Each backend must implement read/write operations for JSONL data
/// and provide initialization capabilities.
pub trait StorageBackend: Send + Sync {
    /// Create whatever the backend needs to hold the given collections.
    fn init(&mut self, collections: &[&str]) -> Result<()>;

    /// Whether a collection has been created.
    fn exists(&self, filename: &str) -> bool;

    /// Read all lines from a JSONL file.
    fn read_jsonl(&self, filename: &str) -> Result<Vec<String>>;

    /// Append a line to a JSONL file.
    fn append_jsonl(&mut self, filename: &str, line: &str) -> Result<()>;

    /// Write all lines to a JSONL file (replacing existing content).
    fn write_jsonl(&mut self, filename: &str, lines: &[String]) -> Result<()>;

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;

    /// Get the backend type name.
    fn backend_type(&self) -> &'static str;
}

/// JSONL files under a single directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }
}

impl StorageBackend for FileBackend {
    fn init(&mut self, collections: &[&str]) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        for name in collections {
            let path = self.path(name);
            if !path.exists() {
                File::create(&path)?;
            }
        }
        Ok(())
    }

    fn exists(&self, filename: &str) -> bool {
        self.path(filename).is_file()
    }

    fn read_jsonl(&self, filename: &str) -> Result<Vec<String>> {
        let path = self.path(filename);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }

    fn append_jsonl(&mut self, filename: &str, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(filename))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn write_jsonl(&mut self, filename: &str, lines: &[String]) -> Result<()> {
        // Write to a sibling temp file and rename so readers never see a partial file
        let path = self.path(filename);
        let tmp = self.path(&format!("{}.tmp", filename));
        {
            let mut file = File::create(&tmp)?;
            for line in lines {
                writeln!(file, "{}", line)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn backend_type(&self) -> &'static str {
        "file"
    }
}

/// Line buffers kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    files: HashMap<String, Vec<String>>,
}

impl StorageBackend for MemoryBackend {
    fn init(&mut self, collections: &[&str]) -> Result<()> {
        for name in collections {
            self.files.entry(name.to_string()).or_default();
        }
        Ok(())
    }

    fn exists(&self, filename: &str) -> bool {
        self.files.contains_key(filename)
    }

    fn read_jsonl(&self, filename: &str) -> Result<Vec<String>> {
        Ok(self.files.get(filename).cloned().unwrap_or_default())
    }

    fn append_jsonl(&mut self, filename: &str, line: &str) -> Result<()> {
        self.files
            .entry(filename.to_string())
            .or_default()
            .push(line.to_string());
        Ok(())
    }

    fn write_jsonl(&mut self, filename: &str, lines: &[String]) -> Result<()> {
        self.files.insert(filename.to_string(), lines.to_vec());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
