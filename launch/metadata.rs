use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Failed to read phenotype metadata file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Phenotype metadata file '{path}' is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Phenotype '{0}' has no entry in the phenotype metadata file.")]
    UnknownPhenotype(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PhenoEntry {
    #[serde(default)]
    pub covar_set: Option<String>,
}

/// Per-phenotype settings keyed by phenotype name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PhenoMetadata {
    entries: HashMap<String, PhenoEntry>,
}

impl PhenoMetadata {
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let text = fs::read_to_string(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| MetadataError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The covariate set for `pheno`: its own `covar_set` if given, otherwise `default`.
    pub fn covar_set(&self, pheno: &str, default: &str) -> Result<String, MetadataError> {
        let entry = self
            .entries
            .get(pheno)
            .ok_or_else(|| MetadataError::UnknownPhenotype(pheno.to_string()))?;
        let covar_set = entry
            .covar_set
            .clone()
            .unwrap_or_else(|| default.to_string());
        debug!("Phenotype {pheno} uses covariate set {covar_set}");
        Ok(covar_set)
    }
}
