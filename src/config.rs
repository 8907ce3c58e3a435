use crate::error::{Error, Result};
use crate::filter::{AllowList, Compiler};
use crate::request::FilterKeys;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Per-entity filtering setup: what may be filtered, and where the filters live in a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntityConfig {
    #[serde(flatten)]
    pub allow: AllowList,
    #[serde(flatten)]
    pub keys: FilterKeys,
}

impl EntityConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| Error::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> serde_yaml::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn compiler(&self) -> Compiler {
        Compiler::new(self.allow.clone())
    }
}
