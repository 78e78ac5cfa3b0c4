pub mod blueprint;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod run;
pub mod sanitize;
pub mod secrets;
pub mod storage;
pub mod transcode;

pub use blueprint::{Blueprint, BlueprintRegistry, BlueprintSummary, DeliverableTemplate};
pub use config::{load_config, load_config_from_str, Config};
pub use engine::WorkflowEngine;
pub use error::{
    CloudError, ConfigError, MediachainError, ObjectStoreError, Result, StorageError, StoreError,
    TranscodeError, UploadError, WorkflowError,
};
pub use run::{Deliverable, DeliverableMode, DeliverableStatus, Run, RunStatus, RunStore, RunTracker};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use storage::{AssetStorage, IncomingUpload, IngestManifest, SavedUpload, SourceAsset, UploadedAsset};
pub use transcode::{Capabilities, PackagingSummary, PackagingTranscoder, Profile};
