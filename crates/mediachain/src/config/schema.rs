use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::blueprint::registry::builtin_blueprints;
use crate::blueprint::Blueprint;

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Root for everything the engine writes unless overridden per section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_directory: Option<PathBuf>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_store: Option<ObjectStoreConfig>,
    #[serde(default = "builtin_blueprints")]
    pub blueprints: Vec<Blueprint>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            data_directory: None,
            store: StoreConfig::default(),
            uploads: UploadsConfig::default(),
            transcoder: TranscoderConfig::default(),
            object_store: None,
            blueprints: builtin_blueprints(),
        }
    }
}

impl Config {
    /// Everything rooted at `dir`; the usual starting point for tests.
    pub fn with_data_directory<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            data_directory: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_directory.clone().unwrap_or_else(default_data_directory)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.uploads
            .directory
            .clone()
            .unwrap_or_else(|| self.data_dir().join("uploads"))
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.transcoder
            .outputs_directory
            .clone()
            .unwrap_or_else(|| self.data_dir().join("outputs"))
    }
}

/// `<platform data dir>/mediachain`, or `./mediachain-data` when the
/// platform has none.
pub fn default_data_directory() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mediachain"))
        .unwrap_or_else(|| PathBuf::from("mediachain-data"))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Runs directory (json) or database file (sqlite).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_bucket: Option<String>,
    #[serde(default = "default_remote_prefix")]
    pub remote_prefix: String,
}

fn default_remote_prefix() -> String {
    "uploads".to_string()
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            directory: None,
            remote_bucket: None,
            remote_prefix: default_remote_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscoderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs_directory: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(default)]
    pub force_local: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<CloudConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub endpoint: String,
    /// Environment variable holding the bearer token, if the service wants one.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// File holding the token; read before `token_env` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<String>,
}

fn default_token_env() -> String {
    "TRANSCODE_API_TOKEN".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub root: PathBuf,
}
