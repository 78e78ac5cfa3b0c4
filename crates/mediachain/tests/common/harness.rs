//! Test harness for isolated engine runs.
//!
//! Every harness owns a temp directory holding the engine's data directory,
//! a staging area for uploads, an object store root and any fake encoders.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use mediachain::config::Config;
use mediachain::storage::IncomingUpload;
use mediachain::WorkflowEngine;

use super::builders::ConfigBuilder;

/// Shell-script stand-ins for ffmpeg.
#[derive(Debug, Clone, Copy)]
pub enum FakeEncoder {
    /// Writes a few bytes to the last argument (the output path) and exits 0.
    Succeeds,
    /// Prints a diagnostic to stderr and exits 1.
    Fails,
    /// Exits 0 without producing anything.
    Silent,
}

impl FakeEncoder {
    fn script(&self) -> &'static str {
        match self {
            FakeEncoder::Succeeds => {
                "#!/bin/sh\nfor last; do :; done\nmkdir -p \"$(dirname \"$last\")\"\necho encoded > \"$last\"\n"
            }
            FakeEncoder::Fails => "#!/bin/sh\necho 'Invalid data found when processing input' >&2\nexit 1\n",
            FakeEncoder::Silent => "#!/bin/sh\nexit 0\n",
        }
    }
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub data_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub objects_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let data_dir = base.join("data");
        let staging_dir = base.join("staging");
        let objects_dir = base.join("objects");

        std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");
        std::fs::create_dir_all(&staging_dir).expect("Failed to create staging dir");

        Self {
            temp_dir,
            data_dir,
            staging_dir,
            objects_dir,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.data_dir.join("outputs")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.data_dir.join("runs")
    }

    /// A config builder rooted at this harness' data directory.
    pub fn config(&self) -> ConfigBuilder {
        ConfigBuilder::new(&self.data_dir)
    }

    pub fn engine(&self, config: &Config) -> WorkflowEngine {
        WorkflowEngine::from_config(config).expect("Failed to build engine")
    }

    /// Installs an executable fake encoder and returns its path.
    #[cfg(unix)]
    pub fn fake_encoder(&self, kind: FakeEncoder) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self
            .temp_dir
            .path()
            .join(format!("ffmpeg-{:?}", kind).to_lowercase());
        std::fs::write(&path, kind.script()).expect("Failed to write fake encoder");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to mark fake encoder executable");
        path
    }

    /// Writes a file directly into the uploads directory.
    pub fn write_upload(&self, name: &str, content: &[u8]) -> PathBuf {
        let dir = self.uploads_dir();
        std::fs::create_dir_all(&dir).expect("Failed to create uploads dir");
        let path = dir.join(name);
        std::fs::write(&path, content).expect("Failed to write upload");
        path
    }

    /// Writes a payload to the staging area, as the HTTP layer would.
    pub fn stage(&self, original_name: &str, content: &[u8]) -> IncomingUpload {
        let staged = self
            .staging_dir
            .join(uuid::Uuid::new_v4().simple().to_string());
        std::fs::write(&staged, content).expect("Failed to stage upload");
        IncomingUpload {
            original_name: Some(original_name.to_string()),
            staged,
        }
    }

    pub fn write_config(&self, filename: &str, config: &Config) -> PathBuf {
        let path = self.temp_dir.path().join(filename);
        let json = serde_json::to_string_pretty(config).expect("Failed to serialize config");
        std::fs::write(&path, json).expect("Failed to write config file");
        path
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
