use crate::error::{Error, Result};
use ignore::WalkBuilder;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::warn;

const RECORD_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub source: PathBuf,
    pub value: Value,
}

pub fn collect_record_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .add_custom_ignore_filename(".reqfilterignore")
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        let is_record = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| RECORD_EXTENSIONS.contains(&ext));
        if path.is_file() && is_record {
            files.push(path.to_path_buf());
        }
    }
    files
}

/// Loads every record under `root`, skipping files that cannot be read or parsed.
pub fn load_records(root: &Path) -> Vec<Record> {
    let mut records = Vec::new();
    for path in collect_record_files(root) {
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping unreadable record file");
                continue;
            }
        };
        match parse_records(&content) {
            Ok(values) => records.extend(values.into_iter().map(|value| Record {
                source: path.clone(),
                value,
            })),
            Err(err) => warn!(path = %path.display(), %err, "skipping invalid record file"),
        }
    }
    records
}

/// A document holds one record or a list of them; multi-document streams are concatenated.
fn parse_records(content: &str) -> serde_yaml::Result<Vec<Value>> {
    let mut records = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        match Value::deserialize(document)? {
            Value::Sequence(items) => records.extend(items.into_iter().filter(Value::is_mapping)),
            value if value.is_mapping() => records.push(value),
            _ => {}
        }
    }
    Ok(records)
}

/// Reads a request document from `path`, or from stdin when `path` is `None` or `-`.
pub fn read_document(path: Option<&Path>) -> Result<Value> {
    let (origin, content) = match path {
        Some(p) if p != Path::new("-") => {
            let content = fs::read_to_string(p).map_err(|source| Error::Io {
                path: p.to_path_buf(),
                source,
            })?;
            (p.to_path_buf(), content)
        }
        _ => {
            let mut content = String::new();
            let stdin_path = PathBuf::from("<stdin>");
            io::stdin()
                .lock()
                .read_to_string(&mut content)
                .map_err(|source| Error::Io {
                    path: stdin_path.clone(),
                    source,
                })?;
            (stdin_path, content)
        }
    };

    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(&content).map_err(|source| Error::Yaml {
        path: origin,
        source,
    })
}
