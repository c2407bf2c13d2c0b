//! AutoML PRS training on a pre-filtered variant parquet.

use super::{DataArgs, LaunchError, Launcher, SubmitArgs, or_default};
use crate::config::LaunchConfig;
use crate::naming::{RunDescriptor, SampleSelection, SampleSplit};
use crate::shared::files::join_remote;
use crate::submit::LaunchPlan;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct AutomlArgs {
    /// Phenotype name, the phenotype file name without '.pheno'
    #[arg(short = 'p', long)]
    pub pheno_name: String,

    /// Model configuration file name (without '.json') inside --model-config-dir
    #[arg(short = 'm', long)]
    pub model_config: String,

    /// Data version, the suffix of the prepared data directory (e.g. 'max50000_v0')
    #[arg(short = 'd', long)]
    pub data_version_desc: String,

    /// Use just the white British subset
    #[arg(long)]
    pub wb: bool,

    /// Run on the large instance type
    #[arg(short = 'l', long)]
    pub large_instance: bool,

    /// Directory holding the prepared `{pheno}[_wb]_{data_version}` folders
    #[arg(long)]
    pub geno_dir: Option<String>,

    /// Directory of model configuration files on the workflow's image
    #[arg(long)]
    pub model_config_dir: Option<String>,

    /// Directory in which `{pheno}[_wb]_{data_version}_{model_config}` is created
    #[arg(long)]
    pub output_dir: Option<String>,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub submit: SubmitArgs,
}

impl Launcher for AutomlArgs {
    fn plan(&self, config: &LaunchConfig) -> Result<LaunchPlan, LaunchError> {
        let pheno = &self.pheno_name;
        let selection = SampleSelection::new(self.wb, false);
        let layout = self.data.resolve(pheno, config)?;

        let geno_dir = or_default(&self.geno_dir, &config.paths.automl_prepro_dir);
        let data_dir = join_remote(
            &geno_dir,
            &RunDescriptor::new(pheno, selection)
                .with_variant(&self.data_version_desc)
                .leaf(),
        );

        let model_config_dir = or_default(&self.model_config_dir, &config.paths.model_config_dir);
        let train_config_path =
            join_remote(&model_config_dir, &format!("{}.json", self.model_config));

        let desc = RunDescriptor::new(pheno, selection)
            .with_variant(&format!("{}_{}", self.data_version_desc, self.model_config))
            .leaf();
        let output_dir = or_default(&self.output_dir, &config.paths.automl_output_dir);
        let folder = join_remote(&output_dir, &desc);
        let job_name = format!("prs_automl_{desc}");

        let workflow = &config.workflows.automl;
        let instance_type = match (&workflow.large_instance_type, self.large_instance) {
            (Some(large), true) => large.as_str(),
            _ => workflow.instance_type.as_str(),
        };

        Ok(LaunchPlan::new(workflow, job_name, folder)
            .instance_type(instance_type)
            .high_priority()
            .ignore_reuse()
            .file(
                "geno_parquet",
                join_remote(&data_dir, "filtered_vars.parquet"),
            )
            .file(
                "var_subset_json",
                join_remote(&data_dir, "filtered_vars.json"),
            )
            .file("pheno_file", layout.pheno_file(pheno))
            .file("covar_file", layout.covar_file())
            .file(
                "train_ids",
                layout.selection_split(selection, SampleSplit::Train),
            )
            .file(
                "val_ids",
                layout.selection_split(selection, SampleSplit::Val),
            )
            .file(
                "test_ids",
                layout.split_file(&SampleSplit::Test.file_name("all", false)),
            )
            .string("train_config_path", train_config_path))
    }

    fn dry_run(&self) -> bool {
        self.submit.dry_run
    }
}
