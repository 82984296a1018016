//! Template loading from a templates root:
//!
//! ```text
//! templates/
//! ├── files/            # each regular file is a flat template
//! ├── dirs/
//! │   └── <dir>/
//! │       ├── <leaf>    # Leaf
//! │       └── <sub>/    # Nested: regular files only
//! └── labels.json       # { "<name>": { "description": "...", "color": "ededed" } }
//! ```

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::{DirTemplate, DirTemplateEntry, FileTemplate, LabelTemplate, TemplateSet};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid labels file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported template layout at {0}: directories nest at most one level")]
    InvalidShape(PathBuf),

    #[error("label '{name}' has invalid color '{color}' (expected six hex digits)")]
    InvalidColor { name: String, color: String },
}

fn io_err(path: &Path, source: io::Error) -> TemplateError {
    TemplateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Deserialize)]
struct LabelSpec {
    #[serde(default)]
    description: String,
    color: String,
}

/// Load the full template set under `root`. Missing parts are empty.
pub fn load(root: &Path) -> Result<TemplateSet, TemplateError> {
    let set = TemplateSet {
        files: load_files(&root.join("files"))?,
        dirs: load_dirs(&root.join("dirs"))?,
        labels: load_labels(&root.join("labels.json"))?,
    };
    log::debug!(
        "Loaded {} file, {} directory and {} label templates from {}",
        set.files.len(),
        set.dirs.len(),
        set.labels.len(),
        root.display()
    );
    Ok(set)
}

/// Sorted `(name, path, is_dir)` listing; a missing directory is empty.
fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf, bool)>, TemplateError> {
    let read = match std::fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(dir, e)),
    };

    let mut entries = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = std::fs::metadata(&path).map_err(|e| io_err(&path, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, path, meta.is_dir()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn read_flat_files(dir: &Path) -> Result<Vec<FileTemplate>, TemplateError> {
    sorted_entries(dir)?
        .into_iter()
        .map(|(name, path, is_dir)| {
            if is_dir {
                return Err(TemplateError::InvalidShape(path));
            }
            let content = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            Ok(FileTemplate { name, content })
        })
        .collect()
}

fn load_files(dir: &Path) -> Result<Vec<FileTemplate>, TemplateError> {
    read_flat_files(dir)
}

fn load_dirs(dir: &Path) -> Result<Vec<DirTemplate>, TemplateError> {
    let mut dirs = Vec::new();
    for (name, path, is_dir) in sorted_entries(dir)? {
        if !is_dir {
            return Err(TemplateError::InvalidShape(path));
        }

        let mut entries = Vec::new();
        for (slot, slot_path, slot_is_dir) in sorted_entries(&path)? {
            let entry = if slot_is_dir {
                DirTemplateEntry::Nested(read_flat_files(&slot_path)?)
            } else {
                let content =
                    std::fs::read_to_string(&slot_path).map_err(|e| io_err(&slot_path, e))?;
                DirTemplateEntry::Leaf(content)
            };
            entries.push((slot, entry));
        }
        dirs.push(DirTemplate { name, entries });
    }
    Ok(dirs)
}

fn load_labels(path: &Path) -> Result<Vec<LabelTemplate>, TemplateError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(path, e)),
    };

    let json_err = |source| TemplateError::Json {
        path: path.to_path_buf(),
        source,
    };

    // `Map` keeps document order.
    let specs: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&raw).map_err(json_err)?;

    let mut labels = Vec::with_capacity(specs.len());
    for (name, value) in specs {
        let spec: LabelSpec = serde_json::from_value(value).map_err(json_err)?;
        let color = normalize_color(&spec.color).ok_or_else(|| TemplateError::InvalidColor {
            name: name.clone(),
            color: spec.color.clone(),
        })?;
        labels.push(LabelTemplate {
            name,
            description: spec.description,
            color,
        });
    }
    Ok(labels)
}

fn normalize_color(color: &str) -> Option<String> {
    let hex = color.trim().trim_start_matches('#');
    (hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())).then(|| hex.to_string())
}
