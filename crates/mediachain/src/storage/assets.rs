//! Upload capture.
//!
//! An upload always lands on local disk first. Mirroring to remote storage is
//! deferred: [`AssetStorage::save`] only records where the object *will* live,
//! and [`AssetStorage::sync_pending`] performs the copy.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info_span, warn};

use crate::error::UploadError;
use crate::sanitize;

use super::filesystem::FileStorage;
use super::object_store::{parse_remote_uri, remote_uri, ObjectStore, RemoteObject};

/// Where a locally stored upload still needs to be copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSync {
    pub bucket: String,
    pub key: String,
    pub local_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub asset_id: String,
    pub filename: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: u64,
    pub local_path: String,
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub s3_uri: Option<String>,
    pub pending_s3: Option<PendingSync>,
    pub created_at: DateTime<Utc>,
}

/// Primary source of a run, as it appears under `inputs.source`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_s3: Option<PendingSync>,
}

impl SourceAsset {
    /// A source known only by its remote locator.
    pub fn remote(uri: &str) -> Self {
        let (bucket, key) = match parse_remote_uri(uri) {
            Ok((bucket, key)) => (Some(bucket), Some(key)),
            Err(_) => (None, None),
        };
        Self {
            bucket,
            key,
            uri: Some(uri.to_string()),
            ..Self::default()
        }
    }

    pub fn local(path: &Path) -> Self {
        Self {
            local_path: Some(path.to_string_lossy().into_owned()),
            ..Self::default()
        }
    }

    /// The remote locator, preferring `uri` over `bucket`/`key`. Not
    /// available while a sync is still pending.
    pub fn remote_uri(&self) -> Option<String> {
        if self.pending_s3.is_some() {
            return None;
        }
        if let Some(uri) = self.uri.as_deref().filter(|u| !u.is_empty()) {
            return Some(uri.to_string());
        }
        match (self.bucket.as_deref(), self.key.as_deref()) {
            (Some(bucket), Some(key)) if !bucket.is_empty() && !key.is_empty() => {
                Some(remote_uri(bucket, key))
            }
            _ => None,
        }
    }

    pub fn local_file(&self) -> Option<PathBuf> {
        self.local_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .filter(|p| p.is_file())
    }

    /// Drops every remote locator, leaving only the local copy.
    pub fn clear_remote(&mut self) {
        self.bucket = None;
        self.key = None;
        self.uri = None;
        self.pending_s3 = None;
    }
}

impl From<&UploadedAsset> for SourceAsset {
    fn from(asset: &UploadedAsset) -> Self {
        Self {
            asset_id: Some(asset.asset_id.clone()),
            local_path: Some(asset.local_path.clone()),
            bucket: asset.bucket.clone(),
            key: asset.key.clone(),
            uri: asset.s3_uri.clone(),
            pending_s3: asset.pending_s3.clone(),
        }
    }
}

/// Run inputs describing an uploaded asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestManifest {
    pub source: SourceAsset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IngestManifest {
    pub fn for_asset(asset: &UploadedAsset) -> Self {
        Self {
            source: SourceAsset::from(asset),
            title: asset.title.clone(),
            description: asset.description.clone(),
        }
    }

    /// The manifest as a run `inputs` object.
    pub fn to_inputs(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// A payload already written to a staging location by the caller.
#[derive(Debug, Clone)]
pub struct IncomingUpload {
    pub original_name: Option<String>,
    pub staged: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedUpload {
    pub asset: UploadedAsset,
    pub manifest: IngestManifest,
}

pub struct AssetStorage {
    files: FileStorage,
    remote: Option<RemoteTarget>,
}

struct RemoteTarget {
    bucket: String,
    prefix: String,
    store: Arc<dyn ObjectStore>,
}

impl AssetStorage {
    /// Local-only storage rooted at `uploads_dir`.
    pub fn new<P: AsRef<Path>>(uploads_dir: P) -> Self {
        Self {
            files: FileStorage::new(uploads_dir),
            remote: None,
        }
    }

    /// Adds a remote mirror target. `prefix` is prepended to every key.
    pub fn with_remote(mut self, bucket: &str, prefix: &str, store: Arc<dyn ObjectStore>) -> Self {
        self.remote = Some(RemoteTarget {
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
            store,
        });
        self
    }

    pub fn uploads_dir(&self) -> &Path {
        self.files.root()
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Stores an upload under `<uploads_dir>/<asset_id>_<sanitized name>`.
    pub fn save(
        &self,
        file: Option<IncomingUpload>,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<SavedUpload, UploadError> {
        let file = file.ok_or_else(|| UploadError::InvalidUpload("No file provided".to_string()))?;

        let size_bytes = match std::fs::metadata(&file.staged) {
            Ok(meta) => meta.len(),
            Err(_) => return Err(UploadError::NotFound(file.staged.clone())),
        };
        if size_bytes == 0 {
            let _ = std::fs::remove_file(&file.staged);
            return Err(UploadError::InvalidUpload("Uploaded file is empty".to_string()));
        }

        let asset_id = uuid::Uuid::new_v4().simple().to_string();
        let filename =
            sanitize::sanitize_filename(file.original_name.as_deref().unwrap_or_default());
        let stored_name = format!("{}_{}", asset_id, filename);

        let _span = info_span!("save_upload", asset_id = %asset_id, filename = %filename).entered();

        let local_path = match self.files.adopt(&file.staged, &stored_name) {
            Ok(path) => path,
            Err(e) => {
                let _ = std::fs::remove_file(&file.staged);
                return Err(e.into());
            }
        };
        debug!("Stored upload at {}", sanitize::redact_path(&local_path));

        let local_path = local_path.to_string_lossy().into_owned();
        let (bucket, key, s3_uri, pending_s3) = match &self.remote {
            Some(remote) => {
                let key = if remote.prefix.is_empty() {
                    stored_name.clone()
                } else {
                    format!("{}/{}", remote.prefix, stored_name)
                };
                let pending = PendingSync {
                    bucket: remote.bucket.clone(),
                    key: key.clone(),
                    local_path: local_path.clone(),
                };
                (
                    Some(remote.bucket.clone()),
                    Some(key.clone()),
                    Some(remote_uri(&remote.bucket, &key)),
                    Some(pending),
                )
            }
            None => (None, None, None, None),
        };

        let content_type = mime_guess::from_path(&filename)
            .first()
            .map(|m| m.essence_str().to_string());

        let asset = UploadedAsset {
            asset_id,
            filename,
            title: title.filter(|t| !t.trim().is_empty()),
            description: description.filter(|d| !d.trim().is_empty()),
            content_type,
            size_bytes,
            local_path,
            bucket,
            key,
            s3_uri,
            pending_s3,
            created_at: Utc::now(),
        };
        let manifest = IngestManifest::for_asset(&asset);

        Ok(SavedUpload { asset, manifest })
    }

    /// Maps a caller-supplied upload name to a file under the uploads directory.
    pub fn resolve_upload_path(&self, name: &str) -> Result<PathBuf, UploadError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UploadError::InvalidUpload("Empty upload name".to_string()));
        }
        if Path::new(name).is_absolute() || name.starts_with('/') || name.starts_with('\\') {
            return Err(UploadError::InvalidUpload(format!(
                "Absolute upload path not allowed: {}",
                name
            )));
        }
        if name.split(['/', '\\']).any(|seg| seg == "..") {
            return Err(UploadError::InvalidUpload(format!(
                "Path traversal not allowed: {}",
                name
            )));
        }
        if name.split(['/', '\\']).any(|seg| seg.starts_with('.')) {
            return Err(UploadError::InvalidUpload(format!(
                "Hidden upload path not allowed: {}",
                name
            )));
        }

        let path = self.files.root().join(name);
        if !path.is_file() {
            return Err(UploadError::NotFound(path));
        }
        Ok(path)
    }

    /// Finds the single stored upload named `<asset_id>_*`.
    pub fn resolve_asset_id(&self, asset_id: &str) -> Result<PathBuf, UploadError> {
        let asset_id = asset_id.trim();
        if asset_id.is_empty()
            || !asset_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(UploadError::InvalidUpload(format!(
                "Not an asset id: {}",
                asset_id
            )));
        }

        let root = self.files.root();
        let prefix = format!("{}_", asset_id);
        let entries = std::fs::read_dir(root).map_err(|_| UploadError::NotFound(root.to_path_buf()))?;
        let mut matches: Vec<PathBuf> = entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();

        match matches.len() {
            0 => Err(UploadError::NotFound(root.join(asset_id))),
            1 => Ok(matches.remove(0)),
            n => Err(UploadError::InvalidUpload(format!(
                "Asset id {} matches {} uploads",
                asset_id, n
            ))),
        }
    }

    /// Accepts a caller-supplied local path only when it names an existing,
    /// non-hidden file inside the uploads directory. Returns the canonical
    /// path.
    pub fn confine_local(&self, path: &str) -> Result<PathBuf, UploadError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(UploadError::InvalidUpload("Empty upload path".to_string()));
        }
        let candidate = Path::new(path);
        if candidate.components().any(|c| c == Component::ParentDir) {
            return Err(UploadError::InvalidUpload(format!(
                "Path traversal not allowed: {}",
                path
            )));
        }

        let root = self
            .files
            .root()
            .canonicalize()
            .map_err(|_| UploadError::NotFound(self.files.root().to_path_buf()))?;
        let candidate = if candidate.is_absolute() {
            if !candidate.starts_with(self.files.root()) && !candidate.starts_with(&root) {
                return Err(UploadError::InvalidUpload(format!(
                    "Path outside the uploads directory: {}",
                    sanitize::redact_path(candidate)
                )));
            }
            candidate.to_path_buf()
        } else {
            self.files.root().join(candidate)
        };
        let resolved = candidate
            .canonicalize()
            .map_err(|_| UploadError::NotFound(candidate.clone()))?;

        let inside = match resolved.strip_prefix(&root) {
            Ok(relative) => relative.components().all(|c| match c {
                Component::Normal(seg) => !seg.to_string_lossy().starts_with('.'),
                _ => false,
            }),
            Err(_) => false,
        };
        if !inside {
            return Err(UploadError::InvalidUpload(format!(
                "Path outside the uploads directory: {}",
                sanitize::redact_path(&candidate)
            )));
        }
        if !resolved.is_file() {
            return Err(UploadError::NotFound(resolved));
        }
        Ok(resolved)
    }

    /// Copies a pending upload to its remote location and clears the
    /// descriptor. The asset is returned unchanged on the error path.
    pub fn sync_pending(&self, asset: &UploadedAsset) -> Result<UploadedAsset, UploadError> {
        let Some(pending) = asset.pending_s3.as_ref() else {
            return Ok(asset.clone());
        };
        let object = self.sync(pending)?;

        let mut synced = asset.clone();
        synced.bucket = Some(object.bucket);
        synced.key = Some(object.key);
        synced.s3_uri = Some(object.uri);
        synced.pending_s3 = None;
        Ok(synced)
    }

    /// Performs one deferred copy described by `pending`.
    pub fn sync(&self, pending: &PendingSync) -> Result<RemoteObject, UploadError> {
        let Some(remote) = self.remote.as_ref() else {
            return Err(UploadError::InvalidUpload(
                "No remote storage configured".to_string(),
            ));
        };
        if pending.bucket != remote.bucket {
            return Err(UploadError::InvalidUpload(format!(
                "Bucket {} is not the upload bucket",
                pending.bucket
            )));
        }
        if !remote.prefix.is_empty() && !pending.key.starts_with(&format!("{}/", remote.prefix)) {
            return Err(UploadError::InvalidUpload(format!(
                "Key {} is outside the upload prefix",
                pending.key
            )));
        }

        let local = self.confine_local(&pending.local_path)?;
        let local = local.as_path();

        match remote.store.put_file(&pending.bucket, &pending.key, local) {
            Ok(object) => Ok(object),
            Err(e) => {
                warn!(
                    "Remote sync of {} failed: {}",
                    sanitize::redact_path(local),
                    e
                );
                Err(e.into())
            }
        }
    }
}
