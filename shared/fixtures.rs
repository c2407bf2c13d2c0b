//! In-memory stand-in for the research platform.
//!
//! Stores objects by folder and name, records every workflow submission, and counts
//! remote calls so tests can assert that validation failures happen before any
//! platform traffic.

use crate::shared::api::{DataObject, Platform, PlatformError, RunRequest};
use crate::shared::files::RemotePath;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;

const FIXTURE_PROJECT: &str = "project-fixture";

#[derive(Debug, Clone)]
struct StoredObject {
    folder: String,
    name: String,
    id: String,
    content: Vec<u8>,
}

/// A recorded call to [`Platform::run_workflow`].
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub workflow_id: String,
    pub request: RunRequest,
}

#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    objects: RefCell<Vec<StoredObject>>,
    submissions: RefCell<Vec<Submission>>,
    calls: Cell<usize>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` at `path` and returns the new object ID. Storing twice at the
    /// same path creates two objects, as the real platform allows.
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) -> String {
        let remote = RemotePath::parse(path);
        let mut objects = self.objects.borrow_mut();
        let id = format!("file-{:024}", objects.len() + 1);
        objects.push(StoredObject {
            folder: remote.folder().to_string(),
            name: remote.name().to_string(),
            id: id.clone(),
            content: content.into(),
        });
        id
    }

    pub fn insert_json(&self, path: &str, value: &Value) -> String {
        self.insert(path, value.to_string())
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.borrow().clone()
    }

    /// Number of platform operations invoked so far.
    pub fn remote_calls(&self) -> usize {
        self.calls.get()
    }

    fn record_call(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl Platform for InMemoryPlatform {
    fn find_data_objects(&self, folder: &str, name: &str) -> Result<Vec<DataObject>, PlatformError> {
        self.record_call();
        Ok(self
            .objects
            .borrow()
            .iter()
            .filter(|object| object.folder == folder && object.name == name)
            .map(|object| DataObject {
                id: object.id.clone(),
                project: FIXTURE_PROJECT.to_string(),
            })
            .collect())
    }

    fn download_file(&self, object: &DataObject, dest: &Path) -> Result<(), PlatformError> {
        self.record_call();
        let objects = self.objects.borrow();
        let stored = objects
            .iter()
            .find(|stored| stored.id == object.id)
            .ok_or_else(|| PlatformError::Api {
                route: format!("{}/download", object.id),
                status: 404,
                body: "object not found".to_string(),
            })?;
        fs::write(dest, &stored.content).map_err(|source| PlatformError::Io {
            path: dest.display().to_string(),
            source,
        })
    }

    fn run_workflow(&self, workflow_id: &str, request: &RunRequest) -> Result<String, PlatformError> {
        self.record_call();
        let mut submissions = self.submissions.borrow_mut();
        submissions.push(Submission {
            workflow_id: workflow_id.to_string(),
            request: request.clone(),
        });
        Ok(format!("analysis-{:024}", submissions.len()))
    }
}
