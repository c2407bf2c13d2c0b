// ========================================================================================
//
//                               SCORE TABLE AGGREGATION
//
// ========================================================================================
//
// For every (model, phenotype, subgroup) combination in the catalog, downloads the
// run's `scores.json` and `runtime.json`, and emits one record per evaluation
// partition. Runs whose `scores.json` does not exist yet are skipped.

use crate::config::{DataPaths, LaunchConfig};
use crate::naming::{RunDescriptor, SampleSelection, gwas_dir_name};
use crate::shared::api::Platform;
use crate::shared::files::{ArtifactFetcher, FetchError, join_remote};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::iproduct;
use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SCORES_FILE_NAME: &str = "scores.json";
const RUNTIME_FILE_NAME: &str = "runtime.json";

const IDENTIFYING_COLUMNS: [&str; 4] = ["model_class", "model_desc", "pheno", "white_british"];
pub const RUNTIME_COLUMN: &str = "runtime_seconds";

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Could not create a scratch directory for downloads: {0}")]
    Scratch(#[source] io::Error),
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write CSV table '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Artifact '{path}' is malformed: {detail}")]
    MalformedArtifact { path: String, detail: String },
    #[error("Score table '{path}' is missing column '{column}'.")]
    MissingColumn { path: PathBuf, column: String },
    #[error("Error reading score table: {0}")]
    Polars(#[from] PolarsError),
}

/// How a model's reported runtime is accounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    /// Clumping and thresholding (PRSice-2). The baseline.
    #[serde(rename = "c_plus_t")]
    CPlusT,
    /// Batch screening iterative lasso (BASIL). Fits on genotypes directly.
    #[serde(rename = "iterative_screening")]
    IterativeScreening,
    /// AutoML models trained on GWAS-filtered variants.
    #[serde(rename = "automl")]
    AutoMl,
}

impl ModelFamily {
    /// Whether the upstream GWAS runtime is part of this family's total runtime.
    pub fn adds_gwas_runtime(&self) -> bool {
        matches!(self, ModelFamily::AutoMl)
    }

    fn default_output_dir<'a>(&self, paths: &'a DataPaths) -> &'a str {
        match self {
            ModelFamily::CPlusT => &paths.prsice_output_dir,
            ModelFamily::IterativeScreening => &paths.basil_output_dir,
            ModelFamily::AutoMl => &paths.automl_output_dir,
        }
    }
}

/// One model of the aggregation catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub model_class: String,
    pub model_desc: String,
    pub family: ModelFamily,
    /// Run-folder suffix after `{pheno}[_wb]_`, e.g. `lasso`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Overrides the family's configured output directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

impl ModelEntry {
    pub fn new(model_class: &str, model_desc: &str, family: ModelFamily) -> Self {
        Self {
            model_class: model_class.to_string(),
            model_desc: model_desc.to_string(),
            family,
            variant: None,
            output_dir: None,
        }
    }

    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }

    /// Remote folder of this model's run for one phenotype and subgroup.
    pub fn run_dir(&self, pheno: &str, white_british: bool, paths: &DataPaths) -> String {
        let base = self
            .output_dir
            .as_deref()
            .unwrap_or_else(|| self.family.default_output_dir(paths));
        let mut descriptor = RunDescriptor::new(pheno, SampleSelection::new(white_british, false));
        if let Some(variant) = &self.variant {
            descriptor = descriptor.with_variant(variant);
        }
        join_remote(base, &descriptor.leaf())
    }
}

/// PRSice-2 plus the five BASIL penalties.
pub fn default_models() -> Vec<ModelEntry> {
    let mut models = vec![ModelEntry::new("C+T", "PRSice-2", ModelFamily::CPlusT)];
    for variant in [
        "lasso",
        "ridge",
        "elastic_net_0_1",
        "elastic_net_0_5",
        "elastic_net_0_9",
    ] {
        models.push(
            ModelEntry::new("BASIL", variant, ModelFamily::IterativeScreening).with_variant(variant),
        );
    }
    models
}

/// The four output tables, each fed from one section of `scores.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTable {
    Val,
    TestAll,
    TestWb,
    TestNwb,
}

impl ScoreTable {
    pub const ALL: [ScoreTable; 4] = [
        ScoreTable::Val,
        ScoreTable::TestAll,
        ScoreTable::TestWb,
        ScoreTable::TestNwb,
    ];

    pub fn section(&self) -> &'static str {
        match self {
            ScoreTable::Val => "val",
            ScoreTable::TestAll => "test",
            ScoreTable::TestWb => "test_wb",
            ScoreTable::TestNwb => "test_nwb",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ScoreTable::Val => "val_scores.csv",
            ScoreTable::TestAll => "test_all_scores.csv",
            ScoreTable::TestWb => "test_wb_scores.csv",
            ScoreTable::TestNwb => "test_nwb_scores.csv",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// One row of a score table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub model_class: String,
    pub model_desc: String,
    pub pheno: String,
    pub white_british: bool,
    /// Metric name and value, in artifact order.
    pub metrics: Vec<(String, f64)>,
    pub runtime_seconds: Option<f64>,
}

impl ScoreRecord {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(metric, _)| metric == name)
            .map(|(_, value)| *value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTables {
    records: [Vec<ScoreRecord>; 4],
}

impl ScoreTables {
    pub fn records(&self, table: ScoreTable) -> &[ScoreRecord] {
        &self.records[table.index()]
    }

    pub fn push(&mut self, table: ScoreTable, record: ScoreRecord) {
        self.records[table.index()].push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.iter().all(Vec::is_empty)
    }
}

#[derive(Deserialize)]
struct RuntimeArtifact {
    runtime_seconds: f64,
}

/// Downloads every available score artifact of the configured catalog.
pub fn aggregate(platform: &dyn Platform, config: &LaunchConfig) -> Result<ScoreTables, TableError> {
    let fetcher = ArtifactFetcher::new(platform).map_err(TableError::Scratch)?;
    let paths = &config.paths;
    let combinations: Vec<_> = iproduct!(
        config.eval.models.iter(),
        config.eval.phenotypes.iter(),
        [false, true]
    )
    .collect();

    let pb = ProgressBar::with_draw_target(
        Some(combinations.len() as u64),
        ProgressDrawTarget::stderr(),
    );
    if let Ok(style) = ProgressStyle::with_template(
        "> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }

    let mut gwas_runtimes: HashMap<(String, bool), f64> = HashMap::new();
    let mut tables = ScoreTables::default();

    for (model, pheno, white_british) in combinations {
        pb.set_message(format!("{} {pheno}", model.model_desc));
        let run_dir = model.run_dir(pheno, white_british, paths);
        let scores_path = join_remote(&run_dir, SCORES_FILE_NAME);

        let Some(scores) = fetcher.fetch_json::<Map<String, Value>>(&scores_path)? else {
            info!("No scores found at {scores_path}, skipping.");
            pb.inc(1);
            continue;
        };

        let own_runtime = fetcher
            .fetch_json::<RuntimeArtifact>(&join_remote(&run_dir, RUNTIME_FILE_NAME))?
            .map(|artifact| artifact.runtime_seconds);

        let runtime_seconds = if model.family.adds_gwas_runtime() {
            let key = (pheno.clone(), white_british);
            let gwas_runtime = match gwas_runtimes.get(&key) {
                Some(seconds) => *seconds,
                None => {
                    let gwas_dir = join_remote(
                        &paths.gwas_output_dir,
                        &gwas_dir_name(pheno, SampleSelection::new(white_british, false)),
                    );
                    let artifact: RuntimeArtifact =
                        fetcher.fetch_required_json(&join_remote(&gwas_dir, RUNTIME_FILE_NAME))?;
                    gwas_runtimes.insert(key, artifact.runtime_seconds);
                    artifact.runtime_seconds
                }
            };
            own_runtime.map(|seconds| seconds + gwas_runtime)
        } else {
            own_runtime
        };

        for table in ScoreTable::ALL {
            let metrics = section_metrics(&scores, table.section(), &scores_path)?;
            tables.push(
                table,
                ScoreRecord {
                    model_class: model.model_class.clone(),
                    model_desc: model.model_desc.clone(),
                    pheno: pheno.clone(),
                    white_british,
                    metrics,
                    runtime_seconds,
                },
            );
        }
        debug!("Collected scores for {run_dir}");
        pb.inc(1);
    }

    pb.finish_with_message("Done.");
    Ok(tables)
}

fn is_reserved_column(name: &str) -> bool {
    IDENTIFYING_COLUMNS.contains(&name) || name == RUNTIME_COLUMN
}

/// Numeric metrics of one `scores.json` section. Null values are left out.
fn section_metrics(
    scores: &Map<String, Value>,
    section: &str,
    path: &str,
) -> Result<Vec<(String, f64)>, TableError> {
    let malformed = |detail: String| TableError::MalformedArtifact {
        path: path.to_string(),
        detail,
    };
    let entries = scores
        .get(section)
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(format!("missing '{section}' section")))?;

    let mut metrics = Vec::with_capacity(entries.len());
    for (name, value) in entries {
        if is_reserved_column(name) {
            return Err(malformed(format!(
                "metric '{section}.{name}' clashes with a table column"
            )));
        }
        match value {
            Value::Null => continue,
            Value::Number(number) => {
                let value = number
                    .as_f64()
                    .ok_or_else(|| malformed(format!("metric '{section}.{name}' is out of range")))?;
                metrics.push((name.clone(), value));
            }
            other => {
                return Err(malformed(format!(
                    "metric '{section}.{name}' is not numeric: {other}"
                )));
            }
        }
    }
    Ok(metrics)
}

/// Column order of a table: identifying fields, metric names in first-seen order,
/// then `runtime_seconds` if any record has one. Metrics named like one of those
/// columns are left out.
pub fn table_columns(records: &[ScoreRecord]) -> Vec<String> {
    let mut columns: Vec<String> = IDENTIFYING_COLUMNS.iter().map(|c| c.to_string()).collect();
    for record in records {
        for (name, _) in &record.metrics {
            if !is_reserved_column(name) && !columns.iter().any(|column| column == name) {
                columns.push(name.clone());
            }
        }
    }
    if records.iter().any(|record| record.runtime_seconds.is_some()) {
        columns.push(RUNTIME_COLUMN.to_string());
    }
    columns
}

fn bool_cell(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Writes one table, replacing any existing file.
pub fn write_table(path: &Path, records: &[ScoreRecord]) -> Result<(), TableError> {
    let csv_error = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let columns = table_columns(records);
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer.write_record(&columns).map_err(csv_error)?;

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| match column.as_str() {
                "model_class" => record.model_class.clone(),
                "model_desc" => record.model_desc.clone(),
                "pheno" => record.pheno.clone(),
                "white_british" => bool_cell(record.white_british).to_string(),
                RUNTIME_COLUMN => record
                    .runtime_seconds
                    .map(|seconds| seconds.to_string())
                    .unwrap_or_default(),
                metric => record
                    .metric(metric)
                    .map(|value| value.to_string())
                    .unwrap_or_default(),
            })
            .collect();
        writer.write_record(&row).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Writes all four tables into `save_dir`, creating it if needed.
pub fn write_tables(save_dir: &Path, tables: &ScoreTables) -> Result<Vec<PathBuf>, TableError> {
    fs::create_dir_all(save_dir).map_err(|source| TableError::Io {
        path: save_dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::with_capacity(ScoreTable::ALL.len());
    for table in ScoreTable::ALL {
        let path = save_dir.join(table.file_name());
        write_table(&path, tables.records(table))?;
        info!(
            "Wrote {} rows to {}",
            tables.records(table).len(),
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}

/// Loads a score table as a DataFrame.
pub fn load_table_frame(path: &Path) -> Result<DataFrame, TableError> {
    let file = File::open(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // Whole-valued floats are written without a decimal point, so column types
    // must be inferred from every row.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(file)
        .finish()?;
    Ok(df)
}

/// Reads the values of a column as display strings. Booleans come back as
/// `True` / `False` whether or not the reader inferred a boolean column.
pub fn string_column(df: &DataFrame, path: &Path, name: &str) -> Result<Vec<String>, TableError> {
    let column = df.column(name).map_err(|_| TableError::MissingColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
    })?;
    let is_bool = column.dtype() == &DataType::Boolean;
    let as_text = column.cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .map(|value| {
            let value = value.unwrap_or_default();
            match (is_bool, value) {
                (true, "true") => "True".to_string(),
                (true, "false") => "False".to_string(),
                _ => value.to_string(),
            }
        })
        .collect())
}

/// Reads a numeric column, with empty cells as `None`.
pub fn float_column(
    df: &DataFrame,
    path: &Path,
    name: &str,
) -> Result<Vec<Option<f64>>, TableError> {
    let column = df.column(name).map_err(|_| TableError::MissingColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
    })?;
    let casted = column.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Reads a table written by [`write_table`] back into records.
pub fn read_table(path: &Path) -> Result<Vec<ScoreRecord>, TableError> {
    let df = load_table_frame(path)?;
    let model_class = string_column(&df, path, "model_class")?;
    let model_desc = string_column(&df, path, "model_desc")?;
    let pheno = string_column(&df, path, "pheno")?;
    let white_british = string_column(&df, path, "white_british")?;

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut metric_columns = Vec::new();
    for name in &names {
        if is_reserved_column(name) {
            continue;
        }
        metric_columns.push((name.clone(), float_column(&df, path, name)?));
    }
    let runtime = if names.iter().any(|name| name == RUNTIME_COLUMN) {
        Some(float_column(&df, path, RUNTIME_COLUMN)?)
    } else {
        None
    };

    let records = (0..df.height())
        .map(|row| ScoreRecord {
            model_class: model_class[row].clone(),
            model_desc: model_desc[row].clone(),
            pheno: pheno[row].clone(),
            white_british: white_british[row].eq_ignore_ascii_case("true"),
            metrics: metric_columns
                .iter()
                .filter_map(|(name, values)| values[row].map(|value| (name.clone(), value)))
                .collect(),
            runtime_seconds: runtime.as_ref().and_then(|values| values[row]),
        })
        .collect();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::fixtures::InMemoryPlatform;
    use approx::assert_abs_diff_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn config_with(models: Vec<ModelEntry>, phenotypes: &[&str]) -> LaunchConfig {
        let mut config = LaunchConfig::default();
        config.eval.models = models;
        config.eval.phenotypes = phenotypes.iter().map(|p| p.to_string()).collect();
        config
    }

    fn automl_entry() -> ModelEntry {
        ModelEntry::new("AutoML", "XGBoost", ModelFamily::AutoMl).with_variant("max50000_v0_xgb_v1")
    }

    fn height_scores() -> Value {
        json!({
            "val": {"r2": 0.10},
            "test": {"r2": 0.09},
            "test_wb": {"r2": 0.08},
            "test_nwb": {"r2": 0.11}
        })
    }

    #[test]
    fn non_baseline_runtime_includes_gwas_runtime() {
        let config = config_with(vec![automl_entry()], &["standing_height_50"]);
        let platform = InMemoryPlatform::new();
        let run_dir = "/rdevito/nonlin_prs/automl_prs/output/standing_height_50_max50000_v0_xgb_v1";
        platform.insert_json(&format!("{run_dir}/scores.json"), &height_scores());
        platform.insert_json(
            &format!("{run_dir}/runtime.json"),
            &json!({"runtime_seconds": 120}),
        );
        platform.insert_json(
            "/rdevito/nonlin_prs/gwas/gwas_output/standing_height_50_glm/runtime.json",
            &json!({"runtime_seconds": 30}),
        );

        let tables = aggregate(&platform, &config).expect("aggregate");
        let val = tables.records(ScoreTable::Val);
        assert_eq!(val.len(), 1);
        let record = &val[0];
        assert_eq!(record.model_class, "AutoML");
        assert_eq!(record.model_desc, "XGBoost");
        assert_eq!(record.pheno, "standing_height_50");
        assert!(!record.white_british);
        assert_abs_diff_eq!(record.metric("r2").expect("r2"), 0.10);
        assert_abs_diff_eq!(record.runtime_seconds.expect("runtime"), 150.0);

        assert_abs_diff_eq!(
            tables.records(ScoreTable::TestNwb)[0].metric("r2").expect("r2"),
            0.11
        );
        assert_abs_diff_eq!(
            tables.records(ScoreTable::TestAll)[0].metric("r2").expect("r2"),
            0.09
        );
    }

    #[test]
    fn baseline_runtime_is_reported_as_is() {
        let config = config_with(
            vec![ModelEntry::new("C+T", "PRSice-2", ModelFamily::CPlusT)],
            &["standing_height_50"],
        );
        let platform = InMemoryPlatform::new();
        let run_dir = "/rdevito/nonlin_prs/sum_stats_prs/PRSice2/prsice2_output/standing_height_50_wb";
        platform.insert_json(&format!("{run_dir}/scores.json"), &height_scores());
        platform.insert_json(
            &format!("{run_dir}/runtime.json"),
            &json!({"runtime_seconds": 120}),
        );

        let tables = aggregate(&platform, &config).expect("aggregate");
        let val = tables.records(ScoreTable::Val);
        assert_eq!(val.len(), 1);
        assert!(val[0].white_british);
        assert_eq!(val[0].runtime_seconds, Some(120.0));
    }

    #[test]
    fn iterative_screening_runtime_excludes_gwas_runtime() {
        let config = config_with(
            vec![ModelEntry::new("BASIL", "lasso", ModelFamily::IterativeScreening).with_variant("lasso")],
            &["standing_height_50"],
        );
        let platform = InMemoryPlatform::new();
        let run_dir = "/rdevito/nonlin_prs/batch_iterative_prs/output/standing_height_50_lasso";
        platform.insert_json(&format!("{run_dir}/scores.json"), &height_scores());
        platform.insert_json(
            &format!("{run_dir}/runtime.json"),
            &json!({"runtime_seconds": 120}),
        );
        platform.insert_json(
            "/rdevito/nonlin_prs/gwas/gwas_output/standing_height_50_glm/runtime.json",
            &json!({"runtime_seconds": 30}),
        );

        let tables = aggregate(&platform, &config).expect("aggregate");
        for table in ScoreTable::ALL {
            let records = tables.records(table);
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].runtime_seconds, Some(120.0));
        }
    }

    #[test]
    fn metric_named_like_a_table_column_is_malformed() {
        let config = config_with(
            vec![ModelEntry::new("C+T", "PRSice-2", ModelFamily::CPlusT)],
            &["standing_height_50"],
        );
        for clashing in ["pheno", "runtime_seconds"] {
            let mut scores = height_scores();
            scores["val"][clashing] = json!(3.0);
            let platform = InMemoryPlatform::new();
            platform.insert_json(
                "/rdevito/nonlin_prs/sum_stats_prs/PRSice2/prsice2_output/standing_height_50/scores.json",
                &scores,
            );
            match aggregate(&platform, &config) {
                Err(TableError::MalformedArtifact { detail, .. }) => {
                    assert!(detail.contains(&format!("val.{clashing}")), "{detail}");
                }
                other => panic!("expected malformed artifact for {clashing}, got {other:?}"),
            }
        }
    }

    #[test]
    fn absent_scores_are_skipped() {
        let config = config_with(default_models(), &["standing_height_50", "platelet_count_30080"]);
        let platform = InMemoryPlatform::new();
        platform.insert_json(
            "/rdevito/nonlin_prs/batch_iterative_prs/output/platelet_count_30080_ridge/scores.json",
            &height_scores(),
        );

        let tables = aggregate(&platform, &config).expect("aggregate");
        for table in ScoreTable::ALL {
            let records = tables.records(table);
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].model_desc, "ridge");
            assert_eq!(records[0].pheno, "platelet_count_30080");
            assert_eq!(records[0].runtime_seconds, None);
        }
    }

    #[test]
    fn missing_gwas_runtime_is_fatal_for_non_baseline_models() {
        let config = config_with(vec![automl_entry()], &["standing_height_50"]);
        let platform = InMemoryPlatform::new();
        platform.insert_json(
            "/rdevito/nonlin_prs/automl_prs/output/standing_height_50_max50000_v0_xgb_v1/scores.json",
            &height_scores(),
        );
        let err = aggregate(&platform, &config).expect_err("GWAS runtime is required");
        assert!(matches!(
            err,
            TableError::Fetch(FetchError::Resolve(
                crate::shared::files::ResolveError::NotFound { .. }
            ))
        ));
    }

    #[test]
    fn missing_section_is_malformed() {
        let config = config_with(
            vec![ModelEntry::new("C+T", "PRSice-2", ModelFamily::CPlusT)],
            &["standing_height_50"],
        );
        let platform = InMemoryPlatform::new();
        platform.insert_json(
            "/rdevito/nonlin_prs/sum_stats_prs/PRSice2/prsice2_output/standing_height_50/scores.json",
            &json!({"val": {"r2": 0.1}, "test": {"r2": 0.1}}),
        );
        match aggregate(&platform, &config) {
            Err(TableError::MalformedArtifact { detail, .. }) => {
                assert!(detail.contains("test_wb"));
            }
            other => panic!("expected malformed artifact, got {other:?}"),
        }
    }

    #[test]
    fn columns_are_metric_union_in_first_seen_order() {
        let record = |metrics: Vec<(&str, f64)>, runtime: Option<f64>| ScoreRecord {
            model_class: "BASIL".to_string(),
            model_desc: "lasso".to_string(),
            pheno: "standing_height_50".to_string(),
            white_british: false,
            metrics: metrics
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            runtime_seconds: runtime,
        };
        let records = vec![
            record(vec![("r2", 0.1), ("pearson_r", 0.3)], None),
            record(vec![("mae", 4.0), ("r2", 0.2)], Some(10.0)),
        ];
        assert_eq!(
            table_columns(&records),
            vec![
                "model_class",
                "model_desc",
                "pheno",
                "white_british",
                "r2",
                "pearson_r",
                "mae",
                "runtime_seconds"
            ]
        );
        assert_eq!(table_columns(&records[..1]).last().map(String::as_str), Some("pearson_r"));

        let clashing = record(vec![("pheno", 1.0), ("r2", 0.3), ("runtime_seconds", 5.0)], None);
        assert_eq!(
            table_columns(&[clashing]),
            vec!["model_class", "model_desc", "pheno", "white_british", "r2"]
        );
    }

    #[test]
    fn long_tables_with_late_fractional_values_read_back() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("val_scores.csv");
        let mut records: Vec<ScoreRecord> = (0..120)
            .map(|i| ScoreRecord {
                model_class: "BASIL".to_string(),
                model_desc: format!("model_{i}"),
                pheno: "standing_height_50".to_string(),
                white_british: i % 2 == 0,
                metrics: vec![("r2".to_string(), 0.0), ("n_vars".to_string(), 1000.0 + i as f64)],
                runtime_seconds: Some(100.0 + i as f64),
            })
            .collect();
        records.push(ScoreRecord {
            model_class: "AutoML".to_string(),
            model_desc: "XGBoost".to_string(),
            pheno: "standing_height_50".to_string(),
            white_british: false,
            metrics: vec![("r2".to_string(), 0.25), ("n_vars".to_string(), 512.5)],
            runtime_seconds: Some(150.5),
        });

        write_table(&path, &records).expect("write table");
        let read_back = read_table(&path).expect("read table");
        assert_eq!(read_back.len(), 121);
        assert_eq!(read_back, records);
    }

    #[test]
    fn written_tables_read_back() {
        let dir = tempdir().expect("temporary directory");
        let mut tables = ScoreTables::default();
        let records = vec![
            ScoreRecord {
                model_class: "C+T".to_string(),
                model_desc: "PRSice-2".to_string(),
                pheno: "standing_height_50".to_string(),
                white_british: false,
                metrics: vec![("r2".to_string(), 0.1), ("mse".to_string(), 12.5)],
                runtime_seconds: Some(150.0),
            },
            ScoreRecord {
                model_class: "C+T".to_string(),
                model_desc: "PRSice-2".to_string(),
                pheno: "standing_height_50".to_string(),
                white_british: true,
                metrics: vec![("r2".to_string(), 0.12)],
                runtime_seconds: None,
            },
        ];
        for record in &records {
            tables.push(ScoreTable::Val, record.clone());
        }

        let written = write_tables(&dir.path().join("scores"), &tables).expect("write tables");
        assert_eq!(written.len(), 4);

        let text = fs::read_to_string(&written[0]).expect("read csv");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("model_class,model_desc,pheno,white_british,r2,mse,runtime_seconds")
        );
        assert_eq!(
            lines.next(),
            Some("C+T,PRSice-2,standing_height_50,False,0.1,12.5,150")
        );
        assert_eq!(
            lines.next(),
            Some("C+T,PRSice-2,standing_height_50,True,0.12,,")
        );

        let read_back = read_table(&written[0]).expect("read table");
        assert_eq!(read_back, records);

        let empty = fs::read_to_string(&written[1]).expect("read csv");
        assert_eq!(empty.trim_end(), "model_class,model_desc,pheno,white_british");
    }
}
