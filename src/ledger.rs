//! Run reports written to the output directory.
//!
//! - `generated.json`: repository name -> paths created this run. Reset at the
//!   start of every run.
//! - `errors.json`: append-only list of failures across runs.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const GENERATED_FILE: &str = "generated.json";
const ERRORS_FILE: &str = "errors.json";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ledger {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub repo: String,
    /// Path, label, or phase the failure belongs to.
    pub item: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Both ledgers of one output directory.
#[derive(Debug, Clone)]
pub struct Ledger {
    dir: PathBuf,
}

impl Ledger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn generated_path(&self) -> PathBuf {
        self.dir.join(GENERATED_FILE)
    }

    pub fn errors_path(&self) -> PathBuf {
        self.dir.join(ERRORS_FILE)
    }

    /// Drop the previous run's generated-file report.
    pub fn reset_generated(&self) -> Result<(), LedgerError> {
        let path = self.generated_path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LedgerError::Io { path, source: e }),
        }
    }

    /// Append created `paths` under `repo`.
    pub fn record_generated(&self, repo: &str, paths: &[&str]) -> Result<(), LedgerError> {
        let path = self.generated_path();
        let mut report: Map<String, Value> = read_json(&path)?.unwrap_or_default();

        let entry = report
            .entry(repo.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(created) = entry {
            created.extend(paths.iter().map(|p| Value::String(p.to_string())));
        } else {
            *entry = Value::Array(paths.iter().map(|p| Value::String(p.to_string())).collect());
        }

        write_json(&self.dir, &path, &report)
    }

    /// Created paths per repository, in creation order.
    pub fn generated(&self) -> Result<Map<String, Value>, LedgerError> {
        Ok(read_json(&self.generated_path())?.unwrap_or_default())
    }

    /// Append a failure record.
    pub fn record_error(&self, repo: &str, item: &str, message: &str) -> Result<(), LedgerError> {
        let path = self.errors_path();
        // A damaged error log is replaced rather than blocking new records.
        let mut records: Vec<ErrorRecord> = match read_json(&path) {
            Ok(records) => records.unwrap_or_default(),
            Err(LedgerError::Json { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        records.push(ErrorRecord {
            repo: repo.to_string(),
            item: item.to_string(),
            message: message.to_string(),
            at: Utc::now(),
        });
        write_json(&self.dir, &path, &records)
    }

    pub fn errors(&self) -> Result<Vec<ErrorRecord>, LedgerError> {
        Ok(read_json(&self.errors_path())?.unwrap_or_default())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, LedgerError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LedgerError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| LedgerError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize>(dir: &Path, path: &Path, value: &T) -> Result<(), LedgerError> {
    std::fs::create_dir_all(dir).map_err(|source| LedgerError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let raw = serde_json::to_string_pretty(value).map_err(|source| LedgerError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, raw).map_err(|source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    })
}
