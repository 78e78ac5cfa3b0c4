//! Workflow engine: start a run, resolve its source, package, persist.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, info_span, warn};

use crate::blueprint::{BlueprintRegistry, BlueprintSummary};
use crate::config::Config;
use crate::error::{MediachainError, TranscodeError, WorkflowError};
use crate::run::{open_store, Run, RunTracker};
use crate::secrets;
use crate::storage::{is_remote_uri, AssetStorage, FsObjectStore, ObjectStore, SourceAsset};
use crate::transcode::{
    BackendDefaults, Capabilities, HttpTranscodeService, PackagingTranscoder, TranscodeService,
};

pub struct WorkflowEngine {
    tracker: RunTracker,
    transcoder: PackagingTranscoder,
    assets: Arc<AssetStorage>,
}

impl WorkflowEngine {
    pub fn new(tracker: RunTracker, transcoder: PackagingTranscoder, assets: Arc<AssetStorage>) -> Self {
        Self {
            tracker,
            transcoder,
            assets,
        }
    }

    /// Production constructor: builds every component from config.
    pub fn from_config(config: &Config) -> Result<Self, MediachainError> {
        let registry = Arc::new(BlueprintRegistry::new(config.blueprints.clone())?);
        let data_dir = config.data_dir();
        let store = open_store(&config.store, &data_dir)?;

        let object_store: Option<Arc<dyn ObjectStore>> = config
            .object_store
            .as_ref()
            .map(|os| Arc::new(FsObjectStore::new(&os.root)) as Arc<dyn ObjectStore>);

        let cloud: Option<Arc<dyn TranscodeService>> = match &config.transcoder.cloud {
            Some(cloud) => {
                let token = secrets::resolve_secret_optional(
                    None,
                    cloud.token_file.as_deref(),
                    Some(&cloud.token_env),
                )
                .map_err(|e| TranscodeError::Cloud(e.into()))?;
                let service =
                    HttpTranscodeService::new(&cloud.endpoint, token).map_err(TranscodeError::from)?;
                Some(Arc::new(service) as Arc<dyn TranscodeService>)
            }
            None => None,
        };

        let capabilities =
            Capabilities::detect(config.transcoder.encoder_path.as_deref(), cloud.is_some());
        let defaults = BackendDefaults {
            destination_bucket: config.transcoder.destination_bucket.clone(),
            role: config.transcoder.role.clone(),
            queue: config.transcoder.queue.clone(),
            force_local: config.transcoder.force_local,
        };

        let mut transcoder = PackagingTranscoder::new(config.outputs_dir(), capabilities, defaults);
        if let Some(service) = cloud {
            transcoder = transcoder.with_cloud(service);
        }
        if let Some(store) = &object_store {
            transcoder = transcoder.with_object_store(store.clone());
        }

        let mut assets = AssetStorage::new(config.uploads_dir());
        if let (Some(bucket), Some(store)) = (&config.uploads.remote_bucket, &object_store) {
            assets = assets.with_remote(bucket, &config.uploads.remote_prefix, store.clone());
        }

        info!(
            "Workflow engine ready: {} blueprints, data in {}",
            registry.len(),
            data_dir.display()
        );

        Ok(Self::new(
            RunTracker::new(registry, store),
            transcoder,
            Arc::new(assets),
        ))
    }

    pub fn assets(&self) -> &Arc<AssetStorage> {
        &self.assets
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.transcoder.capabilities()
    }

    pub fn list_blueprints(&self) -> Vec<BlueprintSummary> {
        self.tracker.list_blueprints()
    }

    pub fn get_run(&self, run_id: &str) -> Result<Run, WorkflowError> {
        self.tracker.get_run(run_id)
    }

    pub fn list_runs(&self, limit: usize) -> Result<Vec<Run>, WorkflowError> {
        self.tracker.list_runs(limit)
    }

    /// Runs a blueprint end to end. Deliverable failures are recorded on the
    /// returned run; only tracker, store and run-directory problems are errors.
    pub fn run(
        &self,
        blueprint_name: &str,
        inputs: Map<String, Value>,
        labels: Map<String, Value>,
    ) -> Result<Run, WorkflowError> {
        let mut run = self.tracker.start_run(blueprint_name, inputs, labels)?;
        let _span = info_span!("workflow",
            run_id = %run.run_id,
            blueprint = %run.blueprint_name,
        )
        .entered();

        let source = self.resolve_source(&run.inputs);
        let (deliverables, summary) =
            self.transcoder
                .process(&run.run_id, run.deliverables.clone(), &source)?;

        run.deliverables = deliverables;
        run.summary = Some(summary);
        self.tracker.save_run(&mut run)?;

        info!(status = run.status.as_str(), "Run finished");
        Ok(run)
    }

    /// Polls the cloud service for rendering deliverables and persists any
    /// change.
    pub fn refresh_run(&self, run_id: &str) -> Result<Run, WorkflowError> {
        let mut run = self.tracker.get_run(run_id)?;
        if self.transcoder.refresh(&mut run.deliverables) > 0 {
            self.tracker.save_run(&mut run)?;
        }
        Ok(run)
    }

    /// Turns `inputs.source` into a [`SourceAsset`]. A string is an upload
    /// name, an asset id or a remote locator. Anything that does not resolve
    /// inside the uploads directory yields a source with no usable location,
    /// which the local path reports per deliverable.
    pub fn resolve_source(&self, inputs: &Map<String, Value>) -> SourceAsset {
        match inputs.get("source") {
            Some(value @ Value::Object(_)) => {
                match serde_json::from_value::<SourceAsset>(value.clone()) {
                    Ok(source) => self.sync_if_pending(self.confine_source(source)),
                    Err(e) => {
                        warn!("Ignoring malformed source object: {}", e);
                        SourceAsset::default()
                    }
                }
            }
            Some(Value::String(s)) if is_remote_uri(s) => SourceAsset::remote(s),
            Some(Value::String(name)) => match self
                .assets
                .resolve_upload_path(name)
                .or_else(|e| self.assets.resolve_asset_id(name).map_err(|_| e))
            {
                Ok(path) => SourceAsset::local(&path),
                Err(e) => {
                    warn!("Source '{}' is not a usable upload: {}", name, e);
                    SourceAsset::default()
                }
            },
            Some(other) => {
                warn!("Unsupported source value: {}", other);
                SourceAsset::default()
            }
            None => SourceAsset::default(),
        }
    }

    /// Keeps a caller-supplied `local_path` only if it lies inside the uploads
    /// directory, otherwise falls back to the stored upload for `asset_id`.
    fn confine_source(&self, mut source: SourceAsset) -> SourceAsset {
        let confined = match source.local_path.as_deref().filter(|p| !p.is_empty()) {
            Some(path) => match self.assets.confine_local(path) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Ignoring source local_path: {}", e);
                    None
                }
            },
            None => None,
        };
        let confined = confined.or_else(|| {
            source
                .asset_id
                .as_deref()
                .and_then(|id| self.assets.resolve_asset_id(id).ok())
        });
        source.local_path = confined.map(|p| p.to_string_lossy().into_owned());
        source
    }

    /// Completes a deferred upload mirror. On failure the remote location is
    /// dropped so the run falls back to the local copy.
    fn sync_if_pending(&self, mut source: SourceAsset) -> SourceAsset {
        let Some(pending) = source.pending_s3.clone() else {
            return source;
        };
        match self.assets.sync(&pending) {
            Ok(object) => {
                source.bucket = Some(object.bucket);
                source.key = Some(object.key);
                source.uri = Some(object.uri);
                source.pending_s3 = None;
            }
            Err(e) => {
                warn!("Pending upload sync failed, using local copy: {}", e);
                source.clear_remote();
            }
        }
        source
    }
}
