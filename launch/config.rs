//! # Launch Configuration
//!
//! Workflow identifiers, instance types and default storage locations for every
//! launcher and for result aggregation. The `Default` implementation holds the
//! project's literal defaults; a TOML file passed with `--config` may override any
//! section. Command-line flags override the configuration in turn.
//!
//! A `[workflows.<name>]` table replaces the whole workflow entry, so it must give
//! both `id` and `instance_type`.

use crate::eval::tables::{ModelEntry, default_models};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config file: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config to TOML format: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// A remote workflow and the compute it runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub id: String,
    pub instance_type: String,
    /// Alternative instance selected with `--large-instance`, where supported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_instance_type: Option<String>,
}

impl WorkflowSpec {
    fn new(id: &str, instance_type: &str) -> Self {
        Self {
            id: id.to_string(),
            instance_type: instance_type.to_string(),
            large_instance_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workflows {
    pub gwas: WorkflowSpec,
    pub prsice: WorkflowSpec,
    pub basil: WorkflowSpec,
    pub automl: WorkflowSpec,
    pub filter_vars: WorkflowSpec,
    pub filter_vars_clumps: WorkflowSpec,
    pub filter_vars_basil: WorkflowSpec,
    pub score_preds: WorkflowSpec,
}

impl Default for Workflows {
    fn default() -> Self {
        Self {
            gwas: WorkflowSpec::new("workflow-GgKXpk8Jv7BBFbGbPJzp97by", "mem2_ssd1_v2_x32"),
            prsice: WorkflowSpec::new("workflow-GjQv0BjJv7B90q8GpqyKYzx9", "mem3_ssd1_v2_x64"),
            basil: WorkflowSpec::new("workflow-GjQ6PZ0Jv7B6k3vbX1BjGXBz", "mem3_ssd1_v2_x64"),
            automl: WorkflowSpec {
                large_instance_type: Some("mem3_ssd1_v2_x96".to_string()),
                ..WorkflowSpec::new("workflow-Gj6yq88Jv7BBG3K4J3K5kv1Q", "mem3_ssd1_v2_x64")
            },
            filter_vars: WorkflowSpec::new(
                "workflow-GjV317jJv7B9QX1qPV1zgxXB",
                "mem3_ssd1_v2_x64",
            ),
            filter_vars_clumps: WorkflowSpec::new(
                "workflow-GjQxJXQJv7B824Q9jQp9zyjP",
                "mem3_ssd1_v2_x64",
            ),
            filter_vars_basil: WorkflowSpec::new(
                "workflow-GjV2jkjJv7BPKQgvkZJVFjZ7",
                "mem3_ssd1_v2_x64",
            ),
            score_preds: WorkflowSpec::new("workflow-Ggx3J6QJv7BGzvQzq6xfz534", "mem1_ssd1_v2_x2"),
        }
    }
}

/// Default storage locations in the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub pheno_dir: String,
    /// Local path of the phenotype metadata JSON.
    pub pheno_metadata_file: PathBuf,
    pub pgen_dir: String,
    pub bed_dir: String,
    pub splits_dir: String,
    pub covar_dir: String,
    pub default_covar_set: String,
    pub gwas_output_dir: String,
    pub prsice_output_dir: String,
    pub basil_output_dir: String,
    pub automl_prepro_dir: String,
    pub automl_output_dir: String,
    /// Directory of model configuration files inside the AutoML docker image.
    pub model_config_dir: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            pheno_dir: "/rdevito/nonlin_prs/data/pheno_data/pheno".to_string(),
            pheno_metadata_file: PathBuf::from("../../data/pheno_metadata.json"),
            pgen_dir: "/rdevito/nonlin_prs/data/geno_data/qced_common/pgen".to_string(),
            bed_dir: "/rdevito/nonlin_prs/data/geno_data/qced_common/bed".to_string(),
            splits_dir: "/rdevito/nonlin_prs/data/sample_data/splits".to_string(),
            covar_dir: "/rdevito/nonlin_prs/data/covar_data/tsv".to_string(),
            default_covar_set: "covar_std_v1".to_string(),
            gwas_output_dir: "/rdevito/nonlin_prs/gwas/gwas_output".to_string(),
            prsice_output_dir: "/rdevito/nonlin_prs/sum_stats_prs/PRSice2/prsice2_output"
                .to_string(),
            basil_output_dir: "/rdevito/nonlin_prs/batch_iterative_prs/output".to_string(),
            automl_prepro_dir: "/rdevito/nonlin_prs/automl_prs/prepro_data".to_string(),
            automl_output_dir: "/rdevito/nonlin_prs/automl_prs/output".to_string(),
            model_config_dir: "/home/model_configs".to_string(),
        }
    }
}

/// Settings for the score-table aggregation and plotting commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub phenotypes: Vec<String>,
    /// Local directory receiving the four score tables.
    pub save_dir: PathBuf,
    pub models: Vec<ModelEntry>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            phenotypes: [
                "standing_height_50",
                "body_fat_percentage_23099",
                "platelet_count_30080",
                "glycated_haemoglobin_30750",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            save_dir: PathBuf::from("scores"),
            models: default_models(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub paths: DataPaths,
    pub workflows: Workflows,
    pub eval: EvalConfig,
}

impl LaunchConfig {
    /// Loads a configuration from a TOML file. Missing sections keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&toml_string)?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_string = self.to_toml_string()?;
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = BufWriter::new(fs::File::create(path).map_err(io_error)?);
        file.write_all(toml_string.as_bytes()).map_err(io_error)?;
        file.flush().map_err(io_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_preserve_literal_workflow_ids() {
        let config = LaunchConfig::default();
        assert_eq!(config.workflows.gwas.id, "workflow-GgKXpk8Jv7BBFbGbPJzp97by");
        assert_eq!(config.workflows.gwas.instance_type, "mem2_ssd1_v2_x32");
        assert_eq!(
            config.workflows.automl.large_instance_type.as_deref(),
            Some("mem3_ssd1_v2_x96")
        );
        assert_eq!(config.paths.default_covar_set, "covar_std_v1");
        assert_eq!(config.eval.phenotypes.len(), 4);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("prsrap.toml");
        fs::write(
            &path,
            r#"
[paths]
covar_dir = "/alt/covar"

[workflows.gwas]
id = "workflow-TEST"
instance_type = "mem1_ssd1_v2_x2"

[eval]
phenotypes = ["standing_height_50"]
"#,
        )
        .expect("write config");

        let config = LaunchConfig::load(&path).expect("load config");
        assert_eq!(config.paths.covar_dir, "/alt/covar");
        assert_eq!(config.paths.pheno_dir, DataPaths::default().pheno_dir);
        assert_eq!(config.workflows.gwas.id, "workflow-TEST");
        assert_eq!(config.workflows.basil, Workflows::default().basil);
        assert_eq!(config.eval.phenotypes, vec!["standing_height_50".to_string()]);
        assert_eq!(config.eval.models, default_models());
    }

    #[test]
    fn saved_config_loads_back_unchanged() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("saved.toml");
        let config = LaunchConfig::default();
        config.save(&path).expect("save config");
        let loaded = LaunchConfig::load(&path).expect("load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn unreadable_config_reports_path() {
        let err = LaunchConfig::load(Path::new("/definitely/not/here.toml"))
            .expect_err("missing file must fail");
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
