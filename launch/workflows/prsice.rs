//! PRSice-2 clumping and thresholding on BED genotypes.

use super::{
    DataArgs, GenotypeFormat, LaunchError, Launcher, SubmitArgs, add_genotype_files, or_default,
};
use crate::config::LaunchConfig;
use crate::naming::{
    RunDescriptor, SampleSelection, SampleSplit, gwas_dir_name, sum_stats_file_name,
};
use crate::shared::files::join_remote;
use crate::submit::LaunchPlan;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct PrsiceArgs {
    /// Phenotype name, the phenotype file name without '.pheno'
    #[arg(short = 'p', long)]
    pub pheno_name: String,

    /// Use just the white British subset
    #[arg(long)]
    pub wb: bool,

    /// Only include the development subset
    #[arg(long)]
    pub dev: bool,

    /// Directory containing the BED genotype files
    #[arg(long)]
    pub geno_dir: Option<String>,

    /// Directory holding the `{pheno}_glm[_wb][_dev]` GWAS folders
    #[arg(long)]
    pub sum_stats_dir: Option<String>,

    /// Directory in which `{pheno}[_wb][_dev]` is created
    #[arg(long)]
    pub output_dir: Option<String>,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub submit: SubmitArgs,
}

/// Genotype prefixes for the fitting samples and for all scored samples.
fn bed_stems(selection: SampleSelection) -> (String, String) {
    let stem = selection.qc_stem();
    if selection.dev {
        (format!("{stem}_dev"), format!("{stem}_dev"))
    } else {
        (format!("{stem}_val"), stem)
    }
}

impl Launcher for PrsiceArgs {
    fn plan(&self, config: &LaunchConfig) -> Result<LaunchPlan, LaunchError> {
        let pheno = &self.pheno_name;
        let selection = SampleSelection::new(self.wb, self.dev);
        let layout = self.data.resolve(pheno, config)?;

        let geno_dir = or_default(&self.geno_dir, &config.paths.bed_dir);
        let (val_stem, all_stem) = bed_stems(selection);

        let sum_stats_dir = or_default(&self.sum_stats_dir, &config.paths.gwas_output_dir);
        let sum_stats_file = join_remote(
            &join_remote(&sum_stats_dir, &gwas_dir_name(pheno, selection)),
            &sum_stats_file_name(pheno),
        );

        let keep_file = layout.selection_split(selection, SampleSplit::Val);
        let pred_file = if selection.dev {
            layout.selection_split(selection, SampleSplit::Test)
        } else {
            layout.split_file(&SampleSplit::Test.file_name("all", false))
        };

        let output_dir = or_default(&self.output_dir, &config.paths.prsice_output_dir);
        let leaf = RunDescriptor::new(pheno, selection).leaf();
        let folder = join_remote(&output_dir, &leaf);
        let job_name = format!("prs_prsice2_{leaf}");

        let plan = LaunchPlan::new(&config.workflows.prsice, job_name, folder).ignore_reuse();
        let plan = add_genotype_files(
            plan,
            ["geno_bed_file_val", "geno_bim_file_val", "geno_fam_file_val"],
            &join_remote(&geno_dir, &val_stem),
            GenotypeFormat::Bed,
        );
        let plan = add_genotype_files(
            plan,
            ["geno_bed_file_all", "geno_bim_file_all", "geno_fam_file_all"],
            &join_remote(&geno_dir, &all_stem),
            GenotypeFormat::Bed,
        );
        Ok(plan
            .file("sum_stats_file", sum_stats_file)
            .file("pheno_file", layout.pheno_file(pheno))
            .file("covar_file", layout.covar_file())
            .file("keep_file", keep_file)
            .file("pred_file", pred_file))
    }

    fn dry_run(&self) -> bool {
        self.submit.dry_run
    }
}
