//! Launchers for the remote GWAS and PRS workflows.
//!
//! Each launcher turns its command-line arguments and the [`LaunchConfig`] into a
//! [`LaunchPlan`] without contacting the platform. Submission happens separately, so
//! every plan can be inspected with `--dry-run` first.

pub mod automl;
pub mod basil;
pub mod filter_vars;
pub mod gwas;
pub mod prsice;
pub mod score_preds;

use crate::config::LaunchConfig;
use crate::metadata::{MetadataError, PhenoMetadata};
use crate::naming::{SampleSelection, SampleSplit, covar_file_name, pheno_file_name};
use crate::shared::api::{Platform, PlatformError};
use crate::shared::files::join_remote;
use crate::submit::{LaunchPlan, SubmitError, submit};
use clap::Args;
use log::info;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Invalid value '{value}' for {flag}. Must be one of: {allowed}.")]
    InvalidChoice {
        flag: &'static str,
        value: String,
        allowed: String,
    },
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Implemented by the argument struct of every launcher subcommand.
pub trait Launcher {
    /// Builds the run description. Performs no platform calls.
    fn plan(&self, config: &LaunchConfig) -> Result<LaunchPlan, LaunchError>;

    /// Whether the plan should only be printed.
    fn dry_run(&self) -> bool;
}

/// Plans a run, prints it, and submits it unless the launcher asked for a dry run.
///
/// `connect` is only called once a platform is actually needed, so dry runs work
/// without a platform session.
pub fn launch<P, F>(
    launcher: &dyn Launcher,
    config: &LaunchConfig,
    connect: F,
) -> Result<Option<String>, LaunchError>
where
    P: Platform,
    F: FnOnce() -> Result<P, PlatformError>,
{
    let plan = launcher.plan(config)?;
    print!("{}", plan.describe());
    if launcher.dry_run() {
        println!("Dry run: no analysis was started.");
        return Ok(None);
    }
    info!("Launching workflow {} as {}", plan.workflow_id, plan.job_name);
    let platform = connect()?;
    Ok(Some(submit(&platform, &plan)?))
}

/// Submission flags shared by all launchers.
#[derive(Args, Debug, Clone, Default)]
pub struct SubmitArgs {
    /// Print the resolved inputs and job name without starting anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Overrides for the phenotype, split and covariate locations.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Directory containing the phenotype files
    #[arg(long)]
    pub pheno_dir: Option<String>,

    /// Local JSON file with per-phenotype metadata
    #[arg(long)]
    pub pheno_metadata_file: Option<PathBuf>,

    /// Directory containing train/val/test sample ID lists
    #[arg(long)]
    pub splits_dir: Option<String>,

    /// Directory containing the covariate files
    #[arg(long)]
    pub covar_dir: Option<String>,

    /// Covariate set (file name without '.tsv') used when the metadata names none
    #[arg(long, alias = "default_covar_set")]
    pub default_covar_set: Option<String>,
}

/// Where a launcher finds the phenotype, split and covariate inputs of one phenotype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub pheno_dir: String,
    pub splits_dir: String,
    pub covar_dir: String,
    pub covar_set: String,
}

impl DataArgs {
    /// Applies the overrides to the configured paths and looks up the covariate set.
    pub fn resolve(&self, pheno: &str, config: &LaunchConfig) -> Result<DataLayout, LaunchError> {
        let metadata_file = self
            .pheno_metadata_file
            .clone()
            .unwrap_or_else(|| config.paths.pheno_metadata_file.clone());
        let metadata = PhenoMetadata::load(&metadata_file)?;
        let default_covar_set = self
            .default_covar_set
            .as_deref()
            .unwrap_or(&config.paths.default_covar_set);
        let covar_set = metadata.covar_set(pheno, default_covar_set)?;
        info!("Using covariate set {covar_set}.");

        Ok(DataLayout {
            pheno_dir: or_default(&self.pheno_dir, &config.paths.pheno_dir),
            splits_dir: or_default(&self.splits_dir, &config.paths.splits_dir),
            covar_dir: or_default(&self.covar_dir, &config.paths.covar_dir),
            covar_set,
        })
    }
}

impl DataLayout {
    pub fn pheno_file(&self, pheno: &str) -> String {
        join_remote(&self.pheno_dir, &pheno_file_name(pheno))
    }

    pub fn covar_file(&self) -> String {
        join_remote(&self.covar_dir, &covar_file_name(&self.covar_set))
    }

    pub fn split_file(&self, file_name: &str) -> String {
        join_remote(&self.splits_dir, file_name)
    }

    pub fn selection_split(&self, selection: SampleSelection, split: SampleSplit) -> String {
        self.split_file(&selection.split_file(split))
    }
}

/// On-disk genotype formats passed to the workflows as three-file sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenotypeFormat {
    Pgen,
    Bed,
}

impl GenotypeFormat {
    pub fn extensions(&self) -> [&'static str; 3] {
        match self {
            GenotypeFormat::Pgen => ["pgen", "psam", "pvar"],
            GenotypeFormat::Bed => ["bed", "bim", "fam"],
        }
    }
}

/// Adds the three files of the genotype set at `prefix` under the given input names.
pub fn add_genotype_files(
    plan: LaunchPlan,
    input_names: [&str; 3],
    prefix: &str,
    format: GenotypeFormat,
) -> LaunchPlan {
    format
        .extensions()
        .into_iter()
        .zip(input_names)
        .fold(plan, |plan, (extension, name)| {
            plan.file(name, format!("{prefix}.{extension}"))
        })
}

pub(crate) fn or_default(value: &Option<String>, default: &str) -> String {
    value.clone().unwrap_or_else(|| default.to_string())
}
