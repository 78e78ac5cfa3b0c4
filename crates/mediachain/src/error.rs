use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediachainError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Run store error: {0}")]
    Store(#[from] StoreError),

    #[error("Transcode error: {0}")]
    Transcode(#[from] TranscodeError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Config does not match schema: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid blueprint '{name}': {reason}")]
    InvalidBlueprint { name: String, reason: String },
}

/// Errors surfaced by the run tracker and workflow engine.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Unknown blueprint: {0}")]
    UnknownBlueprint(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Upload not found: {0}")]
    NotFound(PathBuf),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Remote sync failed: {0}")]
    Remote(#[from] ObjectStoreError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to create run directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read run record '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize run record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid run id '{0}'")]
    InvalidRunId(String),

    #[error("Run store lock poisoned")]
    LockPoisoned,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("Invalid object key '{0}'")]
    InvalidKey(String),

    #[error("Invalid remote URI '{0}'")]
    InvalidUri(String),

    #[error("Object store IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Transcode service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transcode service rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid transcode service endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("Transcode service token unavailable: {0}")]
    Token(#[from] crate::secrets::SecretError),
}

/// Per-deliverable packaging failures plus the few call-level preconditions
/// of [`crate::transcode::PackagingTranscoder::process`].
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("{0}")]
    DeliverableSkipped(String),

    #[error("{0}")]
    DeliverableFailed(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Failed to launch encoder '{binary}': {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoder exited with status {code}: {stderr}")]
    EncoderExited { code: String, stderr: String },

    #[error("Cloud submission failed: {0}")]
    Cloud(#[from] CloudError),

    #[error("Packaging called without a run directory")]
    MissingRunDirectory,

    #[error("Failed to create run directory '{path}': {source}")]
    CreateRunDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MediachainError>;
