//! Remote object storage.
//!
//! Objects are addressed as `remote://<bucket>/<key>`. [`FsObjectStore`]
//! mirrors each bucket as a directory under a root, which is enough for a
//! single host and for tests; any other backend plugs in through
//! [`ObjectStore`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ObjectStoreError;

pub const REMOTE_SCHEME: &str = "remote://";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub bucket: String,
    pub key: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size_bytes: u64,
}

pub trait ObjectStore: Send + Sync {
    /// Uploads the file at `path` to `bucket/key`, replacing any existing object.
    fn put_file(&self, bucket: &str, key: &str, path: &Path)
        -> Result<RemoteObject, ObjectStoreError>;

    fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>, ObjectStoreError>;

    /// Keys in `bucket` starting with `prefix`, sorted.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;
}

pub fn remote_uri(bucket: &str, key: &str) -> String {
    format!("{}{}/{}", REMOTE_SCHEME, bucket, key.trim_start_matches('/'))
}

/// Splits `remote://bucket/key` into `(bucket, key)`. The key may be empty.
pub fn parse_remote_uri(uri: &str) -> Result<(String, String), ObjectStoreError> {
    let rest = uri
        .strip_prefix(REMOTE_SCHEME)
        .ok_or_else(|| ObjectStoreError::InvalidUri(uri.to_string()))?;
    let (bucket, key) = match rest.split_once('/') {
        Some((bucket, key)) => (bucket, key),
        None => (rest, ""),
    };
    if bucket.is_empty() {
        return Err(ObjectStoreError::InvalidUri(uri.to_string()));
    }
    Ok((bucket.to_string(), key.to_string()))
}

pub fn is_remote_uri(value: &str) -> bool {
    value.starts_with(REMOTE_SCHEME)
}

fn validate_segment(value: &str) -> Result<(), ObjectStoreError> {
    if value.is_empty()
        || value.starts_with('/')
        || value.split(['/', '\\']).any(|seg| seg == "..")
    {
        return Err(ObjectStoreError::InvalidKey(value.to_string()));
    }
    Ok(())
}

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, ObjectStoreError> {
        validate_segment(bucket)?;
        validate_segment(key)?;
        if bucket.contains('/') {
            return Err(ObjectStoreError::InvalidKey(bucket.to_string()));
        }
        Ok(self.root.join(bucket).join(key))
    }
}

impl ObjectStore for FsObjectStore {
    fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<RemoteObject, ObjectStoreError> {
        let target = self.object_path(bucket, key)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ObjectStoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::copy(path, &target).map_err(|e| ObjectStoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        log::debug!("Stored object {}", remote_uri(bucket, key));

        Ok(RemoteObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            uri: remote_uri(bucket, key),
        })
    }

    fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>, ObjectStoreError> {
        let target = self.object_path(bucket, key)?;
        match std::fs::metadata(&target) {
            Ok(meta) if meta.is_file() => Ok(Some(ObjectMeta {
                size_bytes: meta.len(),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ObjectStoreError::Io {
                path: target,
                source: e,
            }),
        }
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        validate_segment(bucket)?;
        let bucket_dir = self.root.join(bucket);
        if !bucket_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut stack = vec![bucket_dir.clone()];
        while let Some(dir) = stack.pop() {
            let entries = std::fs::read_dir(&dir).map_err(|e| ObjectStoreError::Io {
                path: dir.clone(),
                source: e,
            })?;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&bucket_dir) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
