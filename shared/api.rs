// ========================================================================================
//
//                          PLATFORM API CLIENT (DNAnexus / UKB RAP)
//
// ========================================================================================
//
// Everything that talks to the research platform goes through the `Platform` trait.
// The production implementation is a blocking HTTP client over the public API; tests
// use the in-memory implementation from `shared::fixtures`.

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::env;
use std::fs::File;
use std::io;
use std::path::Path;
use thiserror::Error;

const HTTP_USER_AGENT: &str = "prsrap-http-client/1.0";

const DEFAULT_API_PROTOCOL: &str = "https";
const DEFAULT_API_HOST: &str = "api.dnanexus.com";
const DEFAULT_API_PORT: u16 = 443;

/// Lifetime requested for pre-signed download URLs, in seconds.
const DOWNLOAD_URL_DURATION: u64 = 24 * 3600;

/// Errors raised while talking to the platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("HTTP transport error calling '{route}': {source}")]
    Http {
        route: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("API route '{route}' returned HTTP {status}: {body}")]
    Api {
        route: String,
        status: u16,
        body: String,
    },
    #[error("Unexpected response from '{route}': {detail}")]
    Response { route: String, detail: String },
    #[error("Environment variable {0} is not set. Log in to the platform and select a project first.")]
    MissingEnv(&'static str),
    #[error("Could not parse DX_SECURITY_CONTEXT: {0}")]
    SecurityContext(#[source] serde_json::Error),
    #[error("Invalid API server port '{0}'.")]
    InvalidPort(String),
    #[error("I/O error writing '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A stored data object as reported by `system/findDataObjects`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataObject {
    pub id: String,
    pub project: String,
}

/// One workflow execution request. The project is supplied by the session that
/// sends it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// Stage-prefixed workflow inputs.
    pub input: Map<String, Value>,
    /// Destination folder for the analysis outputs.
    pub folder: String,
    pub name: String,
    pub instance_type: String,
    pub high_priority: bool,
    /// Forces every stage to run even if an identical job already exists.
    pub ignore_reuse: bool,
}

impl RunRequest {
    /// Builds the JSON body of a `{workflow}/run` call.
    pub fn to_api_body(&self, project: &str) -> Value {
        let mut body = json!({
            "input": Value::Object(self.input.clone()),
            "project": project,
            "folder": self.folder,
            "name": self.name,
            "stageSystemRequirements": {
                "*": { "instanceType": self.instance_type }
            },
        });
        if self.high_priority {
            body["priority"] = json!("high");
        }
        if self.ignore_reuse {
            body["ignoreReuseStages"] = json!(["*"]);
        }
        body
    }
}

/// The three platform operations this crate needs.
pub trait Platform {
    /// Lists objects named exactly `name` directly inside `folder` of the current project.
    fn find_data_objects(&self, folder: &str, name: &str) -> Result<Vec<DataObject>, PlatformError>;

    /// Downloads a file object to `dest`, overwriting it.
    fn download_file(&self, object: &DataObject, dest: &Path) -> Result<(), PlatformError>;

    /// Starts a workflow and returns the analysis ID. Does not wait for completion.
    fn run_workflow(&self, workflow_id: &str, request: &RunRequest) -> Result<String, PlatformError>;
}

impl<T: Platform + ?Sized> Platform for &T {
    fn find_data_objects(&self, folder: &str, name: &str) -> Result<Vec<DataObject>, PlatformError> {
        (**self).find_data_objects(folder, name)
    }

    fn download_file(&self, object: &DataObject, dest: &Path) -> Result<(), PlatformError> {
        (**self).download_file(object, dest)
    }

    fn run_workflow(&self, workflow_id: &str, request: &RunRequest) -> Result<String, PlatformError> {
        (**self).run_workflow(workflow_id, request)
    }
}

/// Connection details taken from the standard `DX_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxSession {
    pub api_base: String,
    pub auth_header: String,
    pub project: String,
}

#[derive(Deserialize)]
struct SecurityContext {
    auth_token_type: String,
    auth_token: String,
}

impl DxSession {
    pub fn from_env() -> Result<Self, PlatformError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a session from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PlatformError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let protocol = non_empty("DX_APISERVER_PROTOCOL")
            .unwrap_or_else(|| DEFAULT_API_PROTOCOL.to_string());
        let host = non_empty("DX_APISERVER_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_string());
        let port = match non_empty("DX_APISERVER_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| PlatformError::InvalidPort(raw.clone()))?,
            None => DEFAULT_API_PORT,
        };

        let raw_context =
            non_empty("DX_SECURITY_CONTEXT").ok_or(PlatformError::MissingEnv("DX_SECURITY_CONTEXT"))?;
        let context: SecurityContext =
            serde_json::from_str(&raw_context).map_err(PlatformError::SecurityContext)?;

        let project = non_empty("DX_PROJECT_CONTEXT_ID")
            .ok_or(PlatformError::MissingEnv("DX_PROJECT_CONTEXT_ID"))?;

        Ok(Self {
            api_base: format!("{protocol}://{host}:{port}"),
            auth_header: format!("{} {}", context.auth_token_type, context.auth_token),
            project,
        })
    }
}

/// Blocking HTTP implementation of [`Platform`].
pub struct DxApiClient {
    client: Client,
    session: DxSession,
}

#[derive(Deserialize)]
struct FindDataObjectsResponse {
    results: Vec<DataObject>,
    #[serde(default)]
    next: Option<Value>,
}

#[derive(Deserialize)]
struct DownloadResponse {
    url: String,
    #[serde(default)]
    headers: Map<String, Value>,
}

#[derive(Deserialize)]
struct RunResponse {
    id: String,
}

impl DxApiClient {
    pub fn new(session: DxSession) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .user_agent(HTTP_USER_AGENT)
            .build()
            .map_err(|source| PlatformError::Http {
                route: "client setup".to_string(),
                source,
            })?;
        Ok(Self { client, session })
    }

    pub fn from_env() -> Result<Self, PlatformError> {
        Self::new(DxSession::from_env()?)
    }

    fn call<T>(&self, route: &str, body: &Value) -> Result<T, PlatformError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{}", self.session.api_base, route);
        debug!("POST {url}");
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.session.auth_header)
            .json(body)
            .send()
            .map_err(|source| PlatformError::Http {
                route: route.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PlatformError::Api {
                route: route.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json().map_err(|source| PlatformError::Http {
            route: route.to_string(),
            source,
        })?;
        serde_json::from_value(value).map_err(|e| PlatformError::Response {
            route: route.to_string(),
            detail: e.to_string(),
        })
    }
}

impl Platform for DxApiClient {
    fn find_data_objects(&self, folder: &str, name: &str) -> Result<Vec<DataObject>, PlatformError> {
        let mut found = Vec::new();
        let mut starting: Option<Value> = None;
        loop {
            let mut body = json!({
                "name": name,
                "scope": {
                    "project": self.session.project,
                    "folder": folder,
                    "recurse": false,
                },
            });
            if let Some(next) = starting.take() {
                body["starting"] = next;
            }

            let page: FindDataObjectsResponse = self.call("system/findDataObjects", &body)?;
            found.extend(page.results);
            match page.next {
                Some(next) if !next.is_null() => starting = Some(next),
                _ => break,
            }
        }
        Ok(found)
    }

    fn download_file(&self, object: &DataObject, dest: &Path) -> Result<(), PlatformError> {
        let route = format!("{}/download", object.id);
        let body = json!({
            "project": object.project,
            "duration": DOWNLOAD_URL_DURATION,
        });
        let link: DownloadResponse = self.call(&route, &body)?;

        let mut request = self.client.get(&link.url);
        for (key, value) in &link.headers {
            if let Some(text) = value.as_str() {
                request = request.header(key.as_str(), text);
            }
        }
        let mut response = request.send().map_err(|source| PlatformError::Http {
            route: route.clone(),
            source,
        })?;
        if !response.status().is_success() {
            return Err(PlatformError::Api {
                route,
                status: response.status().as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let io_error = |source| PlatformError::Io {
            path: dest.display().to_string(),
            source,
        };
        let mut file = File::create(dest).map_err(io_error)?;
        response
            .copy_to(&mut file)
            .map_err(|source| PlatformError::Http { route, source })?;
        file.sync_all().map_err(io_error)?;
        Ok(())
    }

    fn run_workflow(&self, workflow_id: &str, request: &RunRequest) -> Result<String, PlatformError> {
        let route = format!("{workflow_id}/run");
        let body = request.to_api_body(&self.session.project);
        let started: RunResponse = self.call(&route, &body)?;
        Ok(started.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn session_uses_defaults_and_security_context() {
        let session = DxSession::from_lookup(lookup_from(&[
            (
                "DX_SECURITY_CONTEXT",
                r#"{"auth_token_type": "Bearer", "auth_token": "abc123"}"#,
            ),
            ("DX_PROJECT_CONTEXT_ID", "project-XYZ"),
        ]))
        .expect("session");

        assert_eq!(session.api_base, "https://api.dnanexus.com:443");
        assert_eq!(session.auth_header, "Bearer abc123");
        assert_eq!(session.project, "project-XYZ");
    }

    #[test]
    fn session_requires_project_and_valid_port() {
        let missing_project = DxSession::from_lookup(lookup_from(&[(
            "DX_SECURITY_CONTEXT",
            r#"{"auth_token_type": "Bearer", "auth_token": "t"}"#,
        )]));
        assert!(matches!(
            missing_project,
            Err(PlatformError::MissingEnv("DX_PROJECT_CONTEXT_ID"))
        ));

        let bad_port = DxSession::from_lookup(lookup_from(&[
            ("DX_APISERVER_PORT", "https"),
            (
                "DX_SECURITY_CONTEXT",
                r#"{"auth_token_type": "Bearer", "auth_token": "t"}"#,
            ),
            ("DX_PROJECT_CONTEXT_ID", "project-1"),
        ]));
        assert!(matches!(bad_port, Err(PlatformError::InvalidPort(_))));
    }

    #[test]
    fn run_body_carries_instance_priority_and_reuse_flags() {
        let mut input = Map::new();
        input.insert("stage-common.n_iter".to_string(), json!(50));
        let request = RunRequest {
            input,
            folder: "/out/height_lasso".to_string(),
            name: "prs_basil_height_lasso".to_string(),
            instance_type: "mem3_ssd1_v2_x64".to_string(),
            high_priority: true,
            ignore_reuse: true,
        };

        let body = request.to_api_body("project-1");
        assert_eq!(body["project"], "project-1");
        assert_eq!(body["folder"], "/out/height_lasso");
        assert_eq!(body["input"]["stage-common.n_iter"], 50);
        assert_eq!(
            body["stageSystemRequirements"]["*"]["instanceType"],
            "mem3_ssd1_v2_x64"
        );
        assert_eq!(body["priority"], "high");
        assert_eq!(body["ignoreReuseStages"], json!(["*"]));

        let plain = RunRequest {
            high_priority: false,
            ignore_reuse: false,
            ..request
        };
        let body = plain.to_api_body("project-1");
        assert!(body.get("priority").is_none());
        assert!(body.get("ignoreReuseStages").is_none());
    }
}
