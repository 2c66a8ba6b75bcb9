//! Append-only ledger of media item IDs that have already been downloaded.
//!
//! One ID per line, UTF-8. The file is the source of truth across restarts;
//! the in-memory set exists only to make membership tests cheap. IDs are
//! never removed. Single writer: the sync loop.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to open ledger at {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to append to ledger at {path}: {source}")]
    Append {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub struct Ledger {
    path: PathBuf,
    ids: HashSet<String>,
    file: File,
}

impl Ledger {
    /// Load the ledger, creating the file (and its parent directory) when
    /// missing.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let open_err = |source| LedgerError::Open {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(open_err)?;
            }
        }

        let mut ids = HashSet::new();
        if path.exists() {
            let reader = BufReader::new(File::open(path).map_err(open_err)?);
            for line in reader.lines() {
                let line = line.map_err(open_err)?;
                let id = line.trim();
                if !id.is_empty() {
                    ids.insert(id.to_string());
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            ids,
            file,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Record an ID: in-memory set first, then the on-disk file. Returns
    /// without touching the file if the ID was already present.
    pub fn record(&mut self, id: &str) -> Result<(), LedgerError> {
        if !self.ids.insert(id.to_string()) {
            return Ok(());
        }
        let append_err = |source| LedgerError::Append {
            path: self.path.clone(),
            source,
        };
        writeln!(self.file, "{id}").map_err(append_err)?;
        self.file.flush().map_err(append_err)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_creates_missing_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/synced-ids");
        let ledger = Ledger::load(&path).unwrap();
        assert!(ledger.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn record_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synced-ids");

        let mut ledger = Ledger::load(&path).unwrap();
        ledger.record("item-a").unwrap();
        ledger.record("item-b").unwrap();
        drop(ledger);

        let reloaded = Ledger::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("item-a"));
        assert!(reloaded.contains("item-b"));
        assert!(!reloaded.contains("item-c"));
    }

    #[test]
    fn duplicate_record_appends_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synced-ids");

        let mut ledger = Ledger::load(&path).unwrap();
        ledger.record("item-a").unwrap();
        ledger.record("item-a").unwrap();
        drop(ledger);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "item-a\n");
    }

    #[test]
    fn blank_lines_ignored_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synced-ids");
        std::fs::write(&path, "item-a\n\n  \nitem-b\n").unwrap();

        let ledger = Ledger::load(&path).unwrap();
        assert_eq!(ledger.len(), 2);
    }
}
