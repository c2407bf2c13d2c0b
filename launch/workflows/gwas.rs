//! plink2 linear-model GWAS on PGEN genotypes.

use super::{
    DataArgs, GenotypeFormat, LaunchError, Launcher, SubmitArgs, add_genotype_files, or_default,
};
use crate::config::LaunchConfig;
use crate::naming::{SampleSelection, SampleSplit, gwas_dir_name};
use crate::shared::files::join_remote;
use crate::submit::LaunchPlan;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct GwasArgs {
    /// Name of the phenotype to use for the GWAS
    #[arg(short = 'p', long)]
    pub pheno_name: String,

    /// Use just the white British subset
    #[arg(long)]
    pub wb: bool,

    /// Only include the development subset of the train split
    #[arg(long)]
    pub dev: bool,

    /// Directory containing the PGEN genotype files
    #[arg(long)]
    pub geno_dir: Option<String>,

    /// Directory in which `{pheno}_glm[_wb][_dev]` is created
    #[arg(long)]
    pub output_dir: Option<String>,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub submit: SubmitArgs,
}

impl Launcher for GwasArgs {
    fn plan(&self, config: &LaunchConfig) -> Result<LaunchPlan, LaunchError> {
        let pheno = &self.pheno_name;
        let selection = SampleSelection::new(self.wb, self.dev);
        let layout = self.data.resolve(pheno, config)?;

        let geno_dir = or_default(&self.geno_dir, &config.paths.pgen_dir);
        let output_dir = or_default(&self.output_dir, &config.paths.gwas_output_dir);
        let folder = join_remote(&output_dir, &gwas_dir_name(pheno, selection));
        let job_name = format!("gwas_plink2_{pheno}{}", selection.suffix());

        let plan = LaunchPlan::new(&config.workflows.gwas, job_name, folder);
        let plan = add_genotype_files(
            plan,
            ["geno_pgen_file", "geno_psam_file", "geno_pvar_file"],
            &join_remote(&geno_dir, &selection.qc_stem()),
            GenotypeFormat::Pgen,
        );
        Ok(plan
            .file("covar_file", layout.covar_file())
            .file("pheno_file", layout.pheno_file(pheno))
            .file(
                "split_file",
                layout.selection_split(selection, SampleSplit::Train),
            ))
    }

    fn dry_run(&self) -> bool {
        self.submit.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::test_support::config_with_metadata;

    fn args(wb: bool, dev: bool) -> GwasArgs {
        GwasArgs {
            pheno_name: "standing_height_50".to_string(),
            wb,
            dev,
            geno_dir: None,
            output_dir: None,
            data: DataArgs::default(),
            submit: SubmitArgs::default(),
        }
    }

    #[test]
    fn wb_dev_run_names() {
        let (_dir, config) = config_with_metadata();
        let plan = args(true, true).plan(&config).expect("plan");
        assert_eq!(plan.job_name, "gwas_plink2_standing_height_50_wb_dev");
        assert_eq!(
            plan.folder,
            "/rdevito/nonlin_prs/gwas/gwas_output/standing_height_50_glm_wb_dev"
        );
        assert_eq!(
            plan.file_input("geno_pgen_file"),
            Some("/rdevito/nonlin_prs/data/geno_data/qced_common/pgen/allchr_wbqc.pgen")
        );
        assert_eq!(
            plan.file_input("split_file"),
            Some("/rdevito/nonlin_prs/data/sample_data/splits/train_wb_dev.txt")
        );
        assert_eq!(
            plan.file_input("covar_file"),
            Some("/rdevito/nonlin_prs/data/covar_data/tsv/covar_std_v1.tsv")
        );
        assert_eq!(plan.instance_type, "mem2_ssd1_v2_x32");
        assert!(!plan.ignore_reuse);
        assert!(!plan.high_priority);
    }

    #[test]
    fn whole_population_uses_all_qc_set() {
        let (_dir, config) = config_with_metadata();
        let plan = args(false, false).plan(&config).expect("plan");
        assert_eq!(plan.job_name, "gwas_plink2_standing_height_50");
        assert_eq!(
            plan.file_input("geno_pvar_file"),
            Some("/rdevito/nonlin_prs/data/geno_data/qced_common/pgen/allchr_allqc.pvar")
        );
        assert_eq!(
            plan.file_input("split_file"),
            Some("/rdevito/nonlin_prs/data/sample_data/splits/train_all.txt")
        );
    }
}
