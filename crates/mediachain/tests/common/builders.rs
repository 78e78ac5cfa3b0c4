//! Builders for test configurations.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use mediachain::blueprint::{Blueprint, DeliverableTemplate};
use mediachain::config::{
    CloudConfig, Config, ObjectStoreConfig, StoreBackend, StoreConfig, TranscoderConfig,
    UploadsConfig,
};

/// Builder for `Config` instances rooted in a test directory.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            config: Config::with_data_directory(data_dir),
        }
    }

    pub fn store(mut self, backend: StoreBackend) -> Self {
        self.config.store = StoreConfig {
            backend,
            path: None,
        };
        self
    }

    pub fn encoder(mut self, path: &Path) -> Self {
        self.config.transcoder.encoder_path = Some(path.to_path_buf());
        self
    }

    pub fn destination_bucket(mut self, bucket: &str) -> Self {
        self.config.transcoder.destination_bucket = Some(bucket.to_string());
        self
    }

    pub fn force_local(mut self, force: bool) -> Self {
        self.config.transcoder.force_local = force;
        self
    }

    pub fn cloud(mut self, endpoint: &str, role: &str, queue: &str) -> Self {
        self.config.transcoder = TranscoderConfig {
            role: Some(role.to_string()),
            queue: Some(queue.to_string()),
            cloud: Some(CloudConfig {
                endpoint: endpoint.to_string(),
                token_env: "MEDIACHAIN_TEST_TOKEN".to_string(),
                token_file: None,
            }),
            ..self.config.transcoder
        };
        self
    }

    pub fn object_store(mut self, root: PathBuf) -> Self {
        self.config.object_store = Some(ObjectStoreConfig { root });
        self
    }

    pub fn remote_uploads(mut self, bucket: &str, prefix: &str) -> Self {
        self.config.uploads = UploadsConfig {
            directory: self.config.uploads.directory.take(),
            remote_bucket: Some(bucket.to_string()),
            remote_prefix: prefix.to_string(),
        };
        self
    }

    /// Adds a blueprint alongside the built-in catalog.
    pub fn blueprint(mut self, name: &str, deliverables: &[(&str, &str)]) -> Self {
        self.config.blueprints.push(Blueprint {
            name: name.to_string(),
            description: format!("{} (test)", name),
            required_inputs: vec!["source".to_string()],
            deliverables: deliverables
                .iter()
                .map(|(label, kind)| DeliverableTemplate::new(label, kind))
                .collect(),
        });
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
