use std::path::PathBuf;
use thiserror::Error;

/// Failures loading the inputs around the compiler. Compiling a filter never fails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
