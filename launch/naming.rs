//! Naming conventions shared by every launcher.
//!
//! Output folders, job names and split files are all derived from a phenotype name
//! plus ordered suffixes. The subgroup suffix `_wb` always precedes the development
//! suffix `_dev`, and a model-variant descriptor, when present, comes last.

use std::fmt;

/// Which samples a run is restricted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SampleSelection {
    /// Restrict to the white British ancestry subgroup.
    pub white_british: bool,
    /// Use the reduced development subset.
    pub dev: bool,
}

impl SampleSelection {
    pub fn new(white_british: bool, dev: bool) -> Self {
        Self { white_british, dev }
    }

    /// Only the subgroup component of this selection.
    pub fn without_dev(self) -> Self {
        Self {
            white_british: self.white_british,
            dev: false,
        }
    }

    /// `[_wb][_dev]`.
    pub fn suffix(&self) -> String {
        let mut suffix = String::new();
        if self.white_british {
            suffix.push_str("_wb");
        }
        if self.dev {
            suffix.push_str("_dev");
        }
        suffix
    }

    /// Group tag used inside split and genotype file names.
    pub fn group_tag(&self) -> &'static str {
        if self.white_british { "wb" } else { "all" }
    }

    /// Stem of the QC'd genotype fileset for this subgroup, e.g. `allchr_wbqc`.
    pub fn qc_stem(&self) -> String {
        format!("allchr_{}qc", self.group_tag())
    }

    /// `{split}_{wb|all}[_dev].txt`.
    pub fn split_file(&self, split: SampleSplit) -> String {
        split.file_name(self.group_tag(), self.dev)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSplit {
    Train,
    Val,
    Test,
}

impl SampleSplit {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleSplit::Train => "train",
            SampleSplit::Val => "val",
            SampleSplit::Test => "test",
        }
    }

    /// `{split}_{group}[_dev].txt`.
    pub fn file_name(&self, group: &str, dev: bool) -> String {
        let dev_suffix = if dev { "_dev" } else { "" };
        format!("{}_{group}{dev_suffix}.txt", self.as_str())
    }
}

/// Phenotype plus sample selection plus optional model variant. Its [`leaf`]
/// is the output-directory name used by the fitting workflows and by aggregation.
///
/// [`leaf`]: RunDescriptor::leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDescriptor {
    pub pheno: String,
    pub selection: SampleSelection,
    pub variant: Option<String>,
}

impl RunDescriptor {
    pub fn new(pheno: &str, selection: SampleSelection) -> Self {
        Self {
            pheno: pheno.to_string(),
            selection,
            variant: None,
        }
    }

    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }

    /// `{pheno}[_wb][_dev][_{variant}]`.
    pub fn leaf(&self) -> String {
        let mut leaf = format!("{}{}", self.pheno, self.selection.suffix());
        if let Some(variant) = &self.variant {
            leaf.push('_');
            leaf.push_str(variant);
        }
        leaf
    }
}

impl fmt::Display for RunDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.leaf())
    }
}

/// Folder name of a GWAS run: `{pheno}_glm[_wb][_dev]`.
pub fn gwas_dir_name(pheno: &str, selection: SampleSelection) -> String {
    format!("{pheno}_glm{}", selection.suffix())
}

/// Name of the plink2 linear-model summary statistics file inside a GWAS folder.
pub fn sum_stats_file_name(pheno: &str) -> String {
    format!("gwas_plink2.{pheno}.glm.linear")
}

pub fn pheno_file_name(pheno: &str) -> String {
    format!("{pheno}.pheno")
}

pub fn covar_file_name(covar_set: &str) -> String {
    format!("{covar_set}.tsv")
}
