mod snapshot;

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::http::{HttpError, get_text_uncached};

pub(crate) use snapshot::*;

pub(crate) const MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("refusing to resolve '{0}' outside the snapshot location")]
    InvalidName(String),
}

#[derive(Debug, Error)]
pub(crate) enum SourceError {
    #[error("manifest unavailable: {0}")]
    ManifestUnavailable(#[source] FetchError),
    #[error("manifest is not valid JSON: {0}")]
    ManifestMalformed(#[source] serde_json::Error),
    #[error("snapshot {id} unavailable: {reason}")]
    SnapshotUnavailable { id: String, reason: String },
}

#[derive(Debug, Clone)]
pub(crate) enum Origin {
    Http { base: String, timeout: Duration },
    Directory(PathBuf),
}

impl Origin {
    pub(crate) fn parse(raw: &str, timeout: Duration) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Http {
                base: trimmed.trim_end_matches('/').to_string(),
                timeout,
            }
        } else {
            Self::Directory(PathBuf::from(trimmed))
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Http { base, .. } => base.clone(),
            Self::Directory(dir) => dir.display().to_string(),
        }
    }

    pub(crate) fn read(&self, name: &str) -> Result<String, FetchError> {
        if !is_relative_name(name) {
            return Err(FetchError::InvalidName(name.to_string()));
        }
        match self {
            Self::Http { base, timeout } => {
                let url = format!("{base}/{name}");
                Ok(get_text_uncached(&url, *timeout)?)
            }
            Self::Directory(dir) => {
                let path = dir.join(name);
                fs::read_to_string(&path).map_err(|source| FetchError::Io { path, source })
            }
        }
    }
}

// Ids must stay inside the origin; `./` segments are allowed.
fn is_relative_name(name: &str) -> bool {
    let mut named = false;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    named && !name.trim().is_empty()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Manifest {
    entries: Vec<String>,
}

impl Manifest {
    pub(crate) fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(&self, position: usize) -> Option<&str> {
        self.entries.get(position).map(String::as_str)
    }

    pub(crate) fn entries(&self) -> &[String] {
        &self.entries
    }
}

#[derive(Deserialize)]
struct ManifestDoc {
    #[serde(default)]
    snapshots: Option<Vec<String>>,
}

pub(crate) fn parse_manifest(raw: &str) -> Result<Manifest, SourceError> {
    let doc: ManifestDoc = serde_json::from_str(raw).map_err(SourceError::ManifestMalformed)?;
    Ok(Manifest::new(doc.snapshots.unwrap_or_default()))
}

pub(crate) trait ManifestSource {
    fn refresh(&mut self) -> Result<Manifest, SourceError>;
}

pub(crate) trait SnapshotSource {
    fn fetch(&mut self, id: &str) -> Option<Snapshot>;
}

#[derive(Debug, Clone)]
pub(crate) struct ProducerManifest {
    origin: Origin,
}

impl ProducerManifest {
    pub(crate) fn new(origin: Origin) -> Self {
        Self { origin }
    }
}

impl ManifestSource for ProducerManifest {
    fn refresh(&mut self) -> Result<Manifest, SourceError> {
        let raw = self
            .origin
            .read(MANIFEST_NAME)
            .map_err(SourceError::ManifestUnavailable)?;
        let manifest = parse_manifest(&raw)?;
        debug!(entries = manifest.len(), "manifest fetched");
        Ok(manifest)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ProducerSnapshots {
    origin: Origin,
}

impl ProducerSnapshots {
    pub(crate) fn new(origin: Origin) -> Self {
        Self { origin }
    }

    pub(crate) fn try_fetch(&self, id: &str) -> Result<Snapshot, SourceError> {
        let unavailable = |reason: String| SourceError::SnapshotUnavailable {
            id: id.to_string(),
            reason,
        };
        let raw = self
            .origin
            .read(id)
            .map_err(|err| unavailable(err.to_string()))?;
        decode_snapshot(&raw).map_err(|err| unavailable(err.to_string()))
    }
}

impl SnapshotSource for ProducerSnapshots {
    fn fetch(&mut self, id: &str) -> Option<Snapshot> {
        match self.try_fetch(id) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(error = %err, "skipping snapshot");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_server::{Behavior, TestServer};

    const CHAIN_SNAPSHOT: &str = r#"{"strategy":"CHAINING","table_size":2,"inserted":1,"collisions":0,"probes":1,"buckets":[null,[7]]}"#;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).expect("write fixture");
    }

    #[test]
    fn manifest_without_snapshots_field_is_empty() {
        assert!(parse_manifest("{}").expect("empty object parses").is_empty());
        assert!(
            parse_manifest(r#"{"snapshots": null}"#)
                .expect("null list parses")
                .is_empty()
        );
    }

    #[test]
    fn manifest_keeps_producer_order() {
        let manifest = parse_manifest(r#"{"snapshots": ["snap_00000.json", "snap_00001.json"]}"#)
            .expect("manifest parses");
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get(0), Some("snap_00000.json"));
        assert_eq!(manifest.get(1), Some("snap_00001.json"));
        assert_eq!(manifest.get(2), None);
    }

    #[test]
    fn directory_manifest_reports_missing_file_as_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut source = ProducerManifest::new(Origin::Directory(dir.path().to_path_buf()));

        let err = source.refresh().expect_err("no manifest written yet");
        assert!(matches!(err, SourceError::ManifestUnavailable(_)));
    }

    #[test]
    fn directory_manifest_observes_appended_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut source = ProducerManifest::new(Origin::Directory(dir.path().to_path_buf()));

        write(dir.path(), MANIFEST_NAME, r#"{"snapshots": ["a.json"]}"#);
        assert_eq!(source.refresh().expect("first read").len(), 1);

        write(dir.path(), MANIFEST_NAME, r#"{"snapshots": ["a.json", "b.json"]}"#);
        assert_eq!(source.refresh().expect("second read").len(), 2);
    }

    #[test]
    fn directory_snapshots_decode_and_tolerate_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "snap_00000.json", CHAIN_SNAPSHOT);
        write(dir.path(), "snap_00001.json", "{\"strategy\": ");
        let mut source = ProducerSnapshots::new(Origin::Directory(dir.path().to_path_buf()));

        let snapshot = source.fetch("snap_00000.json").expect("snapshot decodes");
        assert_eq!(snapshot.buckets[1], Bucket::Chain(vec!["7".to_string()]));
        assert!(source.fetch("snap_00001.json").is_none());
        assert!(source.fetch("snap_00002.json").is_none());
    }

    #[test]
    fn directory_origin_rejects_escaping_identifiers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let origin = Origin::Directory(dir.path().join("snapshots"));

        for name in ["../secret.json", "/etc/passwd", "", ".", "./", "a/../../b.json"] {
            assert!(
                matches!(origin.read(name), Err(FetchError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn current_dir_prefixed_identifiers_are_fetched() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "snap_00000.json", CHAIN_SNAPSHOT);
        let mut snapshots = ProducerSnapshots::new(Origin::Directory(dir.path().to_path_buf()));

        let snapshot = snapshots
            .fetch("./snap_00000.json")
            .expect("./ prefixed id should resolve inside the origin");
        assert_eq!(snapshot.table_size, 2);
        assert!(snapshots.fetch("./../snap_00000.json").is_none());
    }

    #[test]
    fn origin_parse_distinguishes_urls_from_directories() {
        let timeout = Duration::from_millis(100);
        match Origin::parse("http://localhost:8000/snapshots/", timeout) {
            Origin::Http { base, .. } => assert_eq!(base, "http://localhost:8000/snapshots"),
            other => panic!("unexpected origin: {other:?}"),
        }
        assert!(matches!(
            Origin::parse("ui/snapshots", timeout),
            Origin::Directory(_)
        ));
    }

    #[test]
    fn http_sources_fetch_manifest_and_snapshot_with_cache_token() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(200, r#"{"snapshots": ["snap_00000.json"]}"#.to_string()),
            Behavior::Respond(200, CHAIN_SNAPSHOT.to_string()),
            Behavior::Respond(404, "gone".to_string()),
        ]);
        let origin = Origin::parse(&server.base_url, Duration::from_millis(500));
        let mut manifests = ProducerManifest::new(origin.clone());
        let mut snapshots = ProducerSnapshots::new(origin);

        let manifest = manifests.refresh().expect("manifest over http");
        let id = manifest.get(0).expect("one entry").to_string();
        assert!(snapshots.fetch(&id).is_some());
        assert!(snapshots.fetch(&id).is_none());

        let lines = server.request_lines();
        assert!(lines[0].starts_with("GET /manifest.json?_="), "{}", lines[0]);
        assert!(lines[1].starts_with("GET /snap_00000.json?_="), "{}", lines[1]);
    }

    #[test]
    fn http_manifest_status_error_is_unavailable() {
        let server = TestServer::spawn(vec![Behavior::Respond(404, "nope".to_string())]);
        let mut manifests =
            ProducerManifest::new(Origin::parse(&server.base_url, Duration::from_millis(500)));

        let err = manifests.refresh().expect_err("404 manifest");
        assert!(matches!(
            err,
            SourceError::ManifestUnavailable(FetchError::Http(HttpError::Status {
                status: 404,
                ..
            }))
        ));
    }
}
