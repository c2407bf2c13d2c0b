//! Variant pre-filtering for AutoML training.
//!
//! Three workflows write a `filtered_vars.parquet` / `filtered_vars.json` pair into
//! the AutoML preprocessing directory. They differ in where the variant selection
//! comes from: GWAS summary statistics, PRSice-2 clumps, or BASIL's selected features.

use super::{GenotypeFormat, LaunchError, Launcher, SubmitArgs, add_genotype_files, or_default};
use crate::config::{LaunchConfig, WorkflowSpec};
use crate::naming::{RunDescriptor, SampleSelection, gwas_dir_name, sum_stats_file_name};
use crate::ram::DEFAULT_NUM_FEATURES;
use crate::shared::files::join_remote;
use crate::submit::LaunchPlan;
use clap::Args;

/// Inputs common to the three filter workflows.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterCommonArgs {
    /// Phenotype name
    #[arg(short = 'p', long)]
    pub pheno_name: String,

    /// Use inputs fit on just the white British subset
    #[arg(long)]
    pub wb: bool,

    /// Directory containing the PGEN genotype files
    #[arg(short = 'g', long)]
    pub geno_dir: Option<String>,

    /// Directory in which the filtered variant folder is created
    #[arg(short = 'o', long)]
    pub out_dir: Option<String>,

    #[command(flatten)]
    pub submit: SubmitArgs,
}

impl FilterCommonArgs {
    fn selection(&self) -> SampleSelection {
        SampleSelection::new(self.wb, false)
    }

    /// `{pheno}[_wb]`.
    fn pheno_leaf(&self) -> String {
        RunDescriptor::new(&self.pheno_name, self.selection()).leaf()
    }

    /// Plan writing to `{out_dir}/{pheno}[_wb]{out_suffix}` with the genotype set attached.
    fn base_plan(&self, config: &LaunchConfig, workflow: &WorkflowSpec, out_suffix: &str) -> LaunchPlan {
        let out_leaf = format!("{}{out_suffix}", self.pheno_leaf());
        let out_dir = or_default(&self.out_dir, &config.paths.automl_prepro_dir);
        let geno_dir = or_default(&self.geno_dir, &config.paths.pgen_dir);

        let plan = LaunchPlan::new(
            workflow,
            format!("prs_automl_prepro_{out_leaf}"),
            join_remote(&out_dir, &out_leaf),
        )
        .high_priority()
        .ignore_reuse();
        add_genotype_files(
            plan,
            ["geno_pgen_file", "geno_psam_file", "geno_pvar_file"],
            &join_remote(&geno_dir, &self.selection().qc_stem()),
            GenotypeFormat::Pgen,
        )
    }
}

#[derive(Args, Debug, Clone)]
pub struct FilterVarsArgs {
    #[command(flatten)]
    pub common: FilterCommonArgs,

    /// Maximum number of variants kept at any one threshold
    #[arg(short = 'm', long, default_value_t = DEFAULT_NUM_FEATURES as i64)]
    pub max_variants: i64,

    /// Directory holding the `{pheno}_glm[_wb]` GWAS folders
    #[arg(short = 's', long)]
    pub sum_stats_dir: Option<String>,

    /// Appended to the job name and output directory
    #[arg(short = 'd', long, default_value = "")]
    pub out_desc: String,
}

impl Launcher for FilterVarsArgs {
    fn plan(&self, config: &LaunchConfig) -> Result<LaunchPlan, LaunchError> {
        let common = &self.common;
        let pheno = &common.pheno_name;
        let sum_stats_dir = or_default(&self.sum_stats_dir, &config.paths.gwas_output_dir);
        let sum_stats_file = join_remote(
            &join_remote(&sum_stats_dir, &gwas_dir_name(pheno, common.selection())),
            &sum_stats_file_name(pheno),
        );

        let out_suffix = format!("_max{}{}", self.max_variants, self.out_desc);
        Ok(common
            .base_plan(config, &config.workflows.filter_vars, &out_suffix)
            .file("sum_stats_file", sum_stats_file)
            .int("max_num_vars", self.max_variants))
    }

    fn dry_run(&self) -> bool {
        self.common.submit.dry_run
    }
}

#[derive(Args, Debug, Clone)]
pub struct FilterVarsClumpsArgs {
    #[command(flatten)]
    pub common: FilterCommonArgs,

    /// Directory holding the `{pheno}[_wb]` PRSice-2 output folders
    #[arg(long)]
    pub prsice_out_dir: Option<String>,
}

impl Launcher for FilterVarsClumpsArgs {
    fn plan(&self, config: &LaunchConfig) -> Result<LaunchPlan, LaunchError> {
        let common = &self.common;
        let prsice_dir = join_remote(
            &or_default(&self.prsice_out_dir, &config.paths.prsice_output_dir),
            &common.pheno_leaf(),
        );
        Ok(common
            .base_plan(config, &config.workflows.filter_vars_clumps, "_clumps")
            .file(
                "clumps_file",
                join_remote(&prsice_dir, "prs_prsice2_clump.clumps"),
            )
            .file(
                "best_pval_file",
                join_remote(&prsice_dir, "prsice2_best_p_thresh.txt"),
            ))
    }

    fn dry_run(&self) -> bool {
        self.common.submit.dry_run
    }
}

#[derive(Args, Debug, Clone)]
pub struct FilterVarsBasilArgs {
    #[command(flatten)]
    pub common: FilterCommonArgs,

    /// Directory holding the BASIL output folders
    #[arg(long)]
    pub basil_out_dir: Option<String>,

    /// Model suffix of the BASIL run whose selected features are used
    #[arg(long, default_value = "lasso")]
    pub basil_desc: String,
}

impl Launcher for FilterVarsBasilArgs {
    fn plan(&self, config: &LaunchConfig) -> Result<LaunchPlan, LaunchError> {
        let common = &self.common;
        let basil_dir = join_remote(
            &or_default(&self.basil_out_dir, &config.paths.basil_output_dir),
            &format!("{}_{}", common.pheno_leaf(), self.basil_desc),
        );
        let out_suffix = format!("_basil_{}", self.basil_desc);
        Ok(common
            .base_plan(config, &config.workflows.filter_vars_basil, &out_suffix)
            .file(
                "basil_incl_file",
                join_remote(&basil_dir, "included_features.csv"),
            ))
    }

    fn dry_run(&self) -> bool {
        self.common.submit.dry_run
    }
}
