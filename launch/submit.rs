// ========================================================================================
//
//                               WORKFLOW LAUNCH PLANS
//
// ========================================================================================
//
// A `LaunchPlan` is the fully resolved description of one workflow run, built by the
// launchers from flags and configuration without touching the platform. `submit`
// resolves its file inputs and starts the run.

use crate::config::WorkflowSpec;
use crate::shared::api::{Platform, PlatformError, RunRequest};
use crate::shared::files::{ResolveError, resolve_link};
use serde_json::{Map, Value, json};
use std::fmt::Write as _;
use thiserror::Error;

/// Prefix applied to every workflow input name.
pub const STAGE_PREFIX: &str = "stage-common.";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("Failed to start workflow '{workflow_id}': {source}")]
    Platform {
        workflow_id: String,
        #[source]
        source: PlatformError,
    },
}

/// The value bound to a workflow input before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSpec {
    /// Remote path that must resolve to exactly one stored file.
    File(String),
    Str(String),
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputParam {
    pub name: String,
    pub spec: InputSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    pub workflow_id: String,
    pub job_name: String,
    /// Destination folder for the run's outputs.
    pub folder: String,
    pub instance_type: String,
    pub high_priority: bool,
    pub ignore_reuse: bool,
    pub inputs: Vec<InputParam>,
}

impl LaunchPlan {
    pub fn new(workflow: &WorkflowSpec, job_name: String, folder: String) -> Self {
        Self {
            workflow_id: workflow.id.clone(),
            job_name,
            folder,
            instance_type: workflow.instance_type.clone(),
            high_priority: false,
            ignore_reuse: false,
            inputs: Vec::new(),
        }
    }

    pub fn instance_type(mut self, instance_type: &str) -> Self {
        self.instance_type = instance_type.to_string();
        self
    }

    pub fn high_priority(mut self) -> Self {
        self.high_priority = true;
        self
    }

    pub fn ignore_reuse(mut self) -> Self {
        self.ignore_reuse = true;
        self
    }

    fn push(mut self, name: &str, spec: InputSpec) -> Self {
        self.inputs.push(InputParam {
            name: name.to_string(),
            spec,
        });
        self
    }

    pub fn file(self, name: &str, path: impl Into<String>) -> Self {
        self.push(name, InputSpec::File(path.into()))
    }

    pub fn string(self, name: &str, value: impl Into<String>) -> Self {
        self.push(name, InputSpec::Str(value.into()))
    }

    pub fn int(self, name: &str, value: i64) -> Self {
        self.push(name, InputSpec::Int(value))
    }

    pub fn float(self, name: &str, value: f64) -> Self {
        self.push(name, InputSpec::Float(value))
    }

    /// Looks up an input by its unprefixed name.
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs
            .iter()
            .find(|param| param.name == name)
            .map(|param| &param.spec)
    }

    /// Remote path bound to a file input, if any.
    pub fn file_input(&self, name: &str) -> Option<&str> {
        match self.input(name) {
            Some(InputSpec::File(path)) => Some(path),
            _ => None,
        }
    }

    /// Human-readable summary printed before submission and by `--dry-run`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Workflow:         {}", self.workflow_id);
        let _ = writeln!(out, "Job name:         {}", self.job_name);
        let _ = writeln!(out, "Output directory: {}", self.folder);
        let _ = writeln!(out, "Instance type:    {}", self.instance_type);
        let _ = writeln!(
            out,
            "Priority:         {}",
            if self.high_priority { "high" } else { "normal" }
        );
        let _ = writeln!(out, "Ignore reuse:     {}", self.ignore_reuse);
        let _ = writeln!(out, "Inputs:");
        for param in &self.inputs {
            let rendered = match &param.spec {
                InputSpec::File(path) => format!("file {path}"),
                InputSpec::Str(value) => format!("\"{value}\""),
                InputSpec::Int(value) => value.to_string(),
                InputSpec::Float(value) => value.to_string(),
            };
            let _ = writeln!(out, "  {STAGE_PREFIX}{} = {rendered}", param.name);
        }
        out
    }

    /// Resolves every file input and builds the stage-prefixed input map.
    pub fn resolve(&self, platform: &dyn Platform) -> Result<Map<String, Value>, ResolveError> {
        let mut input = Map::new();
        for param in &self.inputs {
            let value = match &param.spec {
                InputSpec::File(path) => resolve_link(platform, path)?.to_value(),
                InputSpec::Str(value) => json!(value),
                InputSpec::Int(value) => json!(value),
                InputSpec::Float(value) => json!(value),
            };
            input.insert(format!("{STAGE_PREFIX}{}", param.name), value);
        }
        Ok(input)
    }

    pub fn to_run_request(&self, input: Map<String, Value>) -> RunRequest {
        RunRequest {
            input,
            folder: self.folder.clone(),
            name: self.job_name.clone(),
            instance_type: self.instance_type.clone(),
            high_priority: self.high_priority,
            ignore_reuse: self.ignore_reuse,
        }
    }
}

/// Resolves inputs and starts the workflow. Returns the analysis ID without waiting
/// for the run to finish.
pub fn submit(platform: &dyn Platform, plan: &LaunchPlan) -> Result<String, SubmitError> {
    let input = plan.resolve(platform)?;
    let request = plan.to_run_request(input);
    let analysis_id = platform
        .run_workflow(&plan.workflow_id, &request)
        .map_err(|source| SubmitError::Platform {
            workflow_id: plan.workflow_id.clone(),
            source,
        })?;
    println!("Started analysis {analysis_id} ({})", plan.job_name);
    Ok(analysis_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::fixtures::InMemoryPlatform;

    fn example_plan() -> LaunchPlan {
        let workflow = WorkflowSpec {
            id: "workflow-TEST".to_string(),
            instance_type: "mem1_ssd1_v2_x2".to_string(),
            large_instance_type: None,
        };
        LaunchPlan::new(
            &workflow,
            "prs_basil_height_lasso".to_string(),
            "/out/height_lasso".to_string(),
        )
        .high_priority()
        .ignore_reuse()
        .file("pheno_file", "/pheno/height.pheno")
        .string("pheno_name", "height")
        .float("alpha", 1.0)
        .int("n_iter", 50)
    }

    #[test]
    fn submit_resolves_links_and_prefixes_names() {
        let platform = InMemoryPlatform::new();
        let pheno_id = platform.insert("/pheno/height.pheno", "FID IID height");
        let plan = example_plan();

        let analysis = submit(&platform, &plan).expect("submission");
        assert!(analysis.starts_with("analysis-"));

        let submissions = platform.submissions();
        assert_eq!(submissions.len(), 1);
        let submission = &submissions[0];
        assert_eq!(submission.workflow_id, "workflow-TEST");
        let request = &submission.request;
        assert_eq!(request.folder, "/out/height_lasso");
        assert_eq!(request.name, "prs_basil_height_lasso");
        assert!(request.high_priority);
        assert!(request.ignore_reuse);
        assert_eq!(
            request.input["stage-common.pheno_file"],
            json!({"$dnanexus_link": pheno_id})
        );
        assert_eq!(request.input["stage-common.pheno_name"], "height");
        assert_eq!(request.input["stage-common.alpha"], 1.0);
        assert_eq!(request.input["stage-common.n_iter"], 50);
        let keys: Vec<&String> = request.input.keys().collect();
        assert_eq!(
            keys,
            vec![
                "stage-common.pheno_file",
                "stage-common.pheno_name",
                "stage-common.alpha",
                "stage-common.n_iter"
            ]
        );
    }

    #[test]
    fn missing_input_file_prevents_run() {
        let platform = InMemoryPlatform::new();
        let err = submit(&platform, &example_plan()).expect_err("input is absent");
        assert!(matches!(
            err,
            SubmitError::Resolve(ResolveError::NotFound { .. })
        ));
        assert!(platform.submissions().is_empty());
    }

    #[test]
    fn describe_lists_every_input() {
        let text = example_plan().describe();
        assert!(text.contains("Job name:         prs_basil_height_lasso"));
        assert!(text.contains("stage-common.pheno_file = file /pheno/height.pheno"));
        assert!(text.contains("stage-common.n_iter = 50"));
        assert!(text.contains("Priority:         high"));
    }
}
