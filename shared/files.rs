use crate::shared::api::{DataObject, Platform, PlatformError};
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use tempfile::TempDir;
use thiserror::Error;

/// Name of the scratch file that every downloaded artifact is written to in turn.
const SCRATCH_FILE_NAME: &str = "artifact.json";

/// Errors raised while resolving a logical remote path to a stored object.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No data object named '{name}' found in folder '{folder}'.")]
    NotFound { folder: String, name: String },
    #[error(
        "Ambiguous reference '{path}': {} data objects match ({}).",
        .ids.len(),
        .ids.join(", ")
    )]
    Ambiguous { path: String, ids: Vec<String> },
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Errors raised while downloading and decoding a small JSON artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("I/O error on downloaded copy of '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Artifact '{path}' is malformed: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A logical path in the project storage namespace, split into folder and base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    folder: String,
    name: String,
}

impl RemotePath {
    /// Splits on the last `/`. Paths without a folder component live in the project root.
    pub fn parse(path: &str) -> Self {
        match path.rsplit_once('/') {
            Some((folder, name)) => Self {
                folder: if folder.is_empty() {
                    "/".to_string()
                } else {
                    folder.to_string()
                },
                name: name.to_string(),
            },
            None => Self {
                folder: "/".to_string(),
                name: path.to_string(),
            },
        }
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.folder == "/" {
            write!(f, "/{}", self.name)
        } else {
            write!(f, "{}/{}", self.folder, self.name)
        }
    }
}

/// Joins a remote directory and a child name with exactly one `/` between them.
pub fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// A job-input reference to a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DxLink {
    #[serde(rename = "$dnanexus_link")]
    pub id: String,
}

impl DxLink {
    /// The JSON form expected in workflow inputs.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "$dnanexus_link": self.id })
    }
}

impl From<&DataObject> for DxLink {
    fn from(object: &DataObject) -> Self {
        Self {
            id: object.id.clone(),
        }
    }
}

/// Looks up the single object stored at `path`. Returns `Ok(None)` when nothing
/// matches and fails when more than one object does.
pub fn find_unique(platform: &dyn Platform, path: &str) -> Result<Option<DataObject>, ResolveError> {
    info!("Finding data object for {path}");
    let remote = RemotePath::parse(path);
    let mut matches = platform.find_data_objects(remote.folder(), remote.name())?;
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        _ => Err(ResolveError::Ambiguous {
            path: path.to_string(),
            ids: matches.into_iter().map(|object| object.id).collect(),
        }),
    }
}

/// Like [`find_unique`], but absence is an error.
pub fn resolve_object(platform: &dyn Platform, path: &str) -> Result<DataObject, ResolveError> {
    find_unique(platform, path)?.ok_or_else(|| {
        let remote = RemotePath::parse(path);
        ResolveError::NotFound {
            folder: remote.folder,
            name: remote.name,
        }
    })
}

pub fn resolve_link(platform: &dyn Platform, path: &str) -> Result<DxLink, ResolveError> {
    resolve_object(platform, path).map(|object| DxLink::from(&object))
}

pub fn resolve_link_optional(
    platform: &dyn Platform,
    path: &str,
) -> Result<Option<DxLink>, ResolveError> {
    Ok(find_unique(platform, path)?.as_ref().map(DxLink::from))
}

/// Downloads small JSON artifacts one at a time through a single scratch file.
///
/// The scratch file is overwritten by every download and fully read back before
/// the next one starts, so a fetcher must not be shared across threads.
pub struct ArtifactFetcher<'a> {
    platform: &'a dyn Platform,
    scratch_dir: TempDir,
}

impl<'a> ArtifactFetcher<'a> {
    pub fn new(platform: &'a dyn Platform) -> io::Result<Self> {
        Ok(Self {
            platform,
            scratch_dir: TempDir::new()?,
        })
    }

    fn scratch_path(&self) -> PathBuf {
        self.scratch_dir.path().join(SCRATCH_FILE_NAME)
    }

    /// Fetches and decodes the artifact at `path`, or `Ok(None)` if it does not exist.
    pub fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, FetchError> {
        match find_unique(self.platform, path)? {
            Some(object) => self.download_and_decode(&object, path).map(Some),
            None => Ok(None),
        }
    }

    /// Fetches and decodes an artifact that must exist.
    pub fn fetch_required_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let object = resolve_object(self.platform, path)?;
        self.download_and_decode(&object, path)
    }

    fn download_and_decode<T: DeserializeOwned>(
        &self,
        object: &DataObject,
        path: &str,
    ) -> Result<T, FetchError> {
        let local = self.scratch_path();
        self.platform.download_file(object, &local)?;
        let text = fs::read_to_string(&local).map_err(|source| FetchError::Io {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| FetchError::Json {
            path: path.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::fixtures::InMemoryPlatform;
    use serde_json::{Value, json};

    #[test]
    fn remote_path_splits_folder_and_name() {
        let path = RemotePath::parse("/rdevito/nonlin_prs/data/covar_data/tsv/covar_std_v1.tsv");
        assert_eq!(path.folder(), "/rdevito/nonlin_prs/data/covar_data/tsv");
        assert_eq!(path.name(), "covar_std_v1.tsv");
        assert_eq!(
            path.to_string(),
            "/rdevito/nonlin_prs/data/covar_data/tsv/covar_std_v1.tsv"
        );

        let rooted = RemotePath::parse("/top.txt");
        assert_eq!(rooted.folder(), "/");
        assert_eq!(rooted.to_string(), "/top.txt");

        let bare = RemotePath::parse("bare.txt");
        assert_eq!(bare.folder(), "/");
        assert_eq!(bare.name(), "bare.txt");
    }

    #[test]
    fn join_remote_collapses_trailing_separator() {
        assert_eq!(join_remote("/a/b/", "c"), "/a/b/c");
        assert_eq!(join_remote("/a/b", "c"), "/a/b/c");
        assert_eq!(join_remote("/", "c"), "/c");
    }

    #[test]
    fn resolution_with_zero_one_and_two_matches() {
        let platform = InMemoryPlatform::new();

        let missing = resolve_link(&platform, "/data/none.txt");
        assert!(matches!(
            missing,
            Err(ResolveError::NotFound { ref folder, ref name }) if folder == "/data" && name == "none.txt"
        ));
        assert_eq!(
            resolve_link_optional(&platform, "/data/none.txt").expect("optional lookup"),
            None
        );

        let id = platform.insert("/data/one.txt", "1");
        assert_eq!(
            resolve_link(&platform, "/data/one.txt").expect("unique match"),
            DxLink { id: id.clone() }
        );
        assert_eq!(
            resolve_link_optional(&platform, "/data/one.txt").expect("optional lookup"),
            Some(DxLink { id })
        );

        platform.insert("/data/two.txt", "a");
        platform.insert("/data/two.txt", "b");
        match resolve_link(&platform, "/data/two.txt") {
            Err(ResolveError::Ambiguous { path, ids }) => {
                assert_eq!(path, "/data/two.txt");
                assert_eq!(ids.len(), 2);
            }
            other => panic!("expected ambiguity error, got {other:?}"),
        }
        assert!(matches!(
            resolve_link_optional(&platform, "/data/two.txt"),
            Err(ResolveError::Ambiguous { .. })
        ));
    }

    #[test]
    fn links_serialize_as_platform_references() {
        let link = DxLink {
            id: "file-123".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&link).expect("serialize"),
            json!({"$dnanexus_link": "file-123"})
        );
        assert_eq!(link.to_value(), json!({"$dnanexus_link": "file-123"}));
    }

    #[test]
    fn fetcher_reuses_scratch_file_between_downloads() {
        let platform = InMemoryPlatform::new();
        platform.insert_json("/out/a/scores.json", &json!({"val": {"r2": 0.1}}));
        platform.insert_json("/out/b/scores.json", &json!({"val": {"r2": 0.2}}));

        let fetcher = ArtifactFetcher::new(&platform).expect("fetcher");
        let first: Value = fetcher
            .fetch_json("/out/a/scores.json")
            .expect("fetch a")
            .expect("a present");
        let second: Value = fetcher
            .fetch_json("/out/b/scores.json")
            .expect("fetch b")
            .expect("b present");
        assert_eq!(first["val"]["r2"], 0.1);
        assert_eq!(second["val"]["r2"], 0.2);

        let absent: Option<Value> = fetcher.fetch_json("/out/c/scores.json").expect("fetch c");
        assert!(absent.is_none());

        let required: Result<Value, _> = fetcher.fetch_required_json("/out/c/runtime.json");
        assert!(matches!(
            required,
            Err(FetchError::Resolve(ResolveError::NotFound { .. }))
        ));
    }

    #[test]
    fn fetcher_reports_malformed_json_with_path() {
        let platform = InMemoryPlatform::new();
        platform.insert("/out/bad/scores.json", "{not json");
        let fetcher = ArtifactFetcher::new(&platform).expect("fetcher");
        let result: Result<Option<Value>, _> = fetcher.fetch_json("/out/bad/scores.json");
        match result {
            Err(FetchError::Json { path, .. }) => assert_eq!(path, "/out/bad/scores.json"),
            other => panic!("expected JSON error, got {other:?}"),
        }
    }
}
