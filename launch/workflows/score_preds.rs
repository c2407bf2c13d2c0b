//! Scoring of a fitted model's validation and test predictions.

use super::basil::BasilModel;
use super::{LaunchError, Launcher, SubmitArgs, or_default};
use crate::config::LaunchConfig;
use crate::naming::{RunDescriptor, SampleSelection, SampleSplit, pheno_file_name};
use crate::shared::files::join_remote;
use crate::submit::LaunchPlan;
use clap::Args;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreModel {
    Prsice,
    Basil(BasilModel),
    /// AutoML run identified by its `{data_version}_{model_config}` descriptor.
    Automl(String),
}

impl ScoreModel {
    fn invalid(value: &str) -> LaunchError {
        LaunchError::InvalidChoice {
            flag: "--model-type",
            value: value.to_string(),
            allowed: format!(
                "'prsice', {}, or 'automl_{{desc}}'",
                BasilModel::ALL
                    .iter()
                    .map(|model| format!("'basil_{model}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Directory holding the model's `val_preds.csv` and `test_preds.csv`.
    pub fn model_dir(&self, pheno: &str, wb: bool, config: &LaunchConfig) -> String {
        let descriptor = RunDescriptor::new(pheno, SampleSelection::new(wb, false));
        match self {
            ScoreModel::Prsice => join_remote(&config.paths.prsice_output_dir, &descriptor.leaf()),
            ScoreModel::Basil(model) => join_remote(
                &config.paths.basil_output_dir,
                &descriptor.with_variant(model.as_str()).leaf(),
            ),
            ScoreModel::Automl(desc) => join_remote(
                &config.paths.automl_output_dir,
                &descriptor.with_variant(desc).leaf(),
            ),
        }
    }
}

impl FromStr for ScoreModel {
    type Err = LaunchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "prsice" {
            return Ok(ScoreModel::Prsice);
        }
        if let Some(model) = value.strip_prefix("basil_") {
            return model
                .parse::<BasilModel>()
                .map(ScoreModel::Basil)
                .map_err(|_| Self::invalid(value));
        }
        match value.strip_prefix("automl_") {
            Some(desc) if !desc.is_empty() => Ok(ScoreModel::Automl(desc.to_string())),
            _ => Err(Self::invalid(value)),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScorePredsArgs {
    /// prsice, basil_{lasso,ridge,elastic_net_0_1,elastic_net_0_5,elastic_net_0_9} or automl_{desc}
    #[arg(short = 'm', long)]
    pub model_type: String,

    /// Phenotype name
    #[arg(short = 'p', long)]
    pub pheno_name: String,

    /// Score the model fit on white British samples only
    #[arg(long)]
    pub wb: bool,

    /// Directory containing the phenotype files
    #[arg(long)]
    pub pheno_dir: Option<String>,

    /// Directory containing the sample split lists
    #[arg(long)]
    pub splits_dir: Option<String>,

    #[command(flatten)]
    pub submit: SubmitArgs,
}

impl Launcher for ScorePredsArgs {
    fn plan(&self, config: &LaunchConfig) -> Result<LaunchPlan, LaunchError> {
        let model: ScoreModel = self.model_type.parse()?;
        let pheno = &self.pheno_name;
        let model_dir = model.model_dir(pheno, self.wb, config);

        let pheno_dir = or_default(&self.pheno_dir, &config.paths.pheno_dir);
        let splits_dir = or_default(&self.splits_dir, &config.paths.splits_dir);
        let wb_tag = if self.wb { "_wb" } else { "" };
        let job_name = format!("score_prs_preds_{}{wb_tag}_{pheno}", self.model_type);

        Ok(
            LaunchPlan::new(&config.workflows.score_preds, job_name, model_dir.clone())
                .ignore_reuse()
                .file("val_preds", join_remote(&model_dir, "val_preds.csv"))
                .file("test_preds", join_remote(&model_dir, "test_preds.csv"))
                .file("pheno_file", join_remote(&pheno_dir, &pheno_file_name(pheno)))
                .file(
                    "test_wb_samples",
                    join_remote(&splits_dir, &SampleSplit::Test.file_name("wb", false)),
                ),
        )
    }

    fn dry_run(&self) -> bool {
        self.submit.dry_run
    }
}
