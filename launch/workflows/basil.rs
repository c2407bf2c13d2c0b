//! BASIL batch screening iterative lasso / ridge / elastic-net fits.

use super::{
    DataArgs, GenotypeFormat, LaunchError, Launcher, SubmitArgs, add_genotype_files, or_default,
};
use crate::config::LaunchConfig;
use crate::naming::{RunDescriptor, SampleSelection, SampleSplit};
use crate::shared::files::join_remote;
use crate::submit::LaunchPlan;
use clap::Args;
use std::fmt;
use std::str::FromStr;

/// Iterations used for development-subset runs regardless of `--n-iter`.
const DEV_N_ITER: i64 = 2;

/// Penalty choices, each a fixed elastic-net mixing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasilModel {
    Lasso,
    Ridge,
    ElasticNet01,
    ElasticNet05,
    ElasticNet09,
}

impl BasilModel {
    pub const ALL: [BasilModel; 5] = [
        BasilModel::Lasso,
        BasilModel::Ridge,
        BasilModel::ElasticNet01,
        BasilModel::ElasticNet05,
        BasilModel::ElasticNet09,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BasilModel::Lasso => "lasso",
            BasilModel::Ridge => "ridge",
            BasilModel::ElasticNet01 => "elastic_net_0_1",
            BasilModel::ElasticNet05 => "elastic_net_0_5",
            BasilModel::ElasticNet09 => "elastic_net_0_9",
        }
    }

    /// The `alpha` input of the workflow: 1 is pure lasso, near 0 is ridge.
    pub fn alpha(&self) -> f64 {
        match self {
            BasilModel::Lasso => 1.0,
            BasilModel::Ridge => 1e-3,
            BasilModel::ElasticNet01 => 0.1,
            BasilModel::ElasticNet05 => 0.5,
            BasilModel::ElasticNet09 => 0.9,
        }
    }

    pub fn allowed() -> String {
        Self::ALL
            .iter()
            .map(|model| format!("'{}'", model.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for BasilModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BasilModel {
    type Err = LaunchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == value)
            .ok_or_else(|| LaunchError::InvalidChoice {
                flag: "--model-type",
                value: value.to_string(),
                allowed: Self::allowed(),
            })
    }
}

#[derive(Args, Debug, Clone)]
pub struct BasilArgs {
    /// Phenotype name, the phenotype file name without '.pheno'
    #[arg(short = 'p', long)]
    pub pheno_name: String,

    /// One of lasso, ridge, elastic_net_0_1, elastic_net_0_5, elastic_net_0_9
    #[arg(short = 'm', long)]
    pub model_type: String,

    /// Number of screening iterations
    #[arg(long, default_value_t = 50)]
    pub n_iter: i64,

    /// Use just the white British subset
    #[arg(long)]
    pub wb: bool,

    /// Use the development subset and only two iterations
    #[arg(long)]
    pub dev: bool,

    /// Directory containing the PGEN genotype files
    #[arg(long)]
    pub geno_dir: Option<String>,

    /// Directory in which `{pheno}[_wb][_dev]_{model}` is created
    #[arg(long)]
    pub output_dir: Option<String>,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub submit: SubmitArgs,
}

impl BasilArgs {
    fn pgen_stem(&self) -> String {
        if self.dev {
            "allchr_allqc_dev".to_string()
        } else {
            SampleSelection::new(self.wb, false).qc_stem()
        }
    }
}

impl Launcher for BasilArgs {
    fn plan(&self, config: &LaunchConfig) -> Result<LaunchPlan, LaunchError> {
        let model: BasilModel = self.model_type.parse()?;
        let n_iter = if self.dev { DEV_N_ITER } else { self.n_iter };

        let pheno = &self.pheno_name;
        let selection = SampleSelection::new(self.wb, self.dev);
        let layout = self.data.resolve(pheno, config)?;

        let geno_dir = or_default(&self.geno_dir, &config.paths.pgen_dir);
        let test_split = SampleSplit::Test.file_name("all", self.dev);

        let desc = RunDescriptor::new(pheno, selection)
            .with_variant(model.as_str())
            .leaf();
        let output_dir = or_default(&self.output_dir, &config.paths.basil_output_dir);
        let folder = join_remote(&output_dir, &desc);
        let job_name = format!("prs_basil_{desc}");

        let plan = LaunchPlan::new(&config.workflows.basil, job_name, folder)
            .high_priority()
            .ignore_reuse();
        let plan = add_genotype_files(
            plan,
            ["geno_pgen", "geno_psam", "geno_pvar"],
            &join_remote(&geno_dir, &self.pgen_stem()),
            GenotypeFormat::Pgen,
        );
        Ok(plan
            .file("pheno_file", layout.pheno_file(pheno))
            .string("pheno_name", pheno.as_str())
            .file("covar_file", layout.covar_file())
            .file(
                "train_samples",
                layout.selection_split(selection, SampleSplit::Train),
            )
            .file(
                "val_samples",
                layout.selection_split(selection, SampleSplit::Val),
            )
            .file("test_samples", layout.split_file(&test_split))
            .float("alpha", model.alpha())
            .int("n_iter", n_iter))
    }

    fn dry_run(&self) -> bool {
        self.submit.dry_run
    }
}
