use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::error::TranscodeError;
use crate::run::{Deliverable, DeliverableMode, DeliverableStatus, PreviewMetadata};
use crate::sanitize;
use crate::storage::{ObjectStore, SourceAsset};

use super::backend::{select_backend, Backend, BackendDefaults, CloudTarget};
use super::capabilities::Capabilities;
use super::cloud::{destination_prefix, CloudJobStatus, TranscodeJobSpec, TranscodeService};
use super::encoder::LocalEncoder;
use super::profile::{Container, Profile};
use super::rules::ProfileRules;

/// Per-run tally of what happened to each deliverable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingSummary {
    pub cloud_jobs: usize,
    pub local_outputs: usize,
    pub skipped: usize,
    #[serde(default)]
    pub failed: usize,
}

pub struct PackagingTranscoder {
    outputs_dir: PathBuf,
    capabilities: Capabilities,
    defaults: BackendDefaults,
    rules: ProfileRules,
    cloud: Option<Arc<dyn TranscodeService>>,
    object_store: Option<Arc<dyn ObjectStore>>,
}

impl PackagingTranscoder {
    pub fn new<P: AsRef<Path>>(
        outputs_dir: P,
        capabilities: Capabilities,
        defaults: BackendDefaults,
    ) -> Self {
        Self {
            outputs_dir: outputs_dir.as_ref().to_path_buf(),
            capabilities,
            defaults,
            rules: ProfileRules::default(),
            cloud: None,
            object_store: None,
        }
    }

    pub fn with_cloud(mut self, service: Arc<dyn TranscodeService>) -> Self {
        self.cloud = Some(service);
        self
    }

    /// Local outputs are mirrored here when a destination bucket is configured.
    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    pub fn with_rules(mut self, rules: ProfileRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    /// Packages every deliverable of a run. Individual failures are recorded
    /// on the deliverable; only an unusable run directory is an error.
    pub fn process(
        &self,
        run_id: &str,
        mut deliverables: Vec<Deliverable>,
        source: &SourceAsset,
    ) -> Result<(Vec<Deliverable>, PackagingSummary), TranscodeError> {
        let run_id = run_id.trim();
        if run_id.is_empty() {
            return Err(TranscodeError::MissingRunDirectory);
        }
        let run_dir = self.outputs_dir.join(run_id);
        std::fs::create_dir_all(&run_dir).map_err(|e| TranscodeError::CreateRunDirectory {
            path: run_dir.clone(),
            source: e,
        })?;

        let _span = info_span!("packaging",
            run_id = %run_id,
            deliverables = deliverables.len(),
        )
        .entered();

        let mut summary = PackagingSummary::default();
        for (index, deliverable) in deliverables.iter_mut().enumerate() {
            let _step = info_span!("deliverable", label = %deliverable.label).entered();

            match self.package_one(run_id, &run_dir, index, deliverable, source) {
                Ok(DeliverableMode::Cloud) => summary.cloud_jobs += 1,
                Ok(DeliverableMode::Local) => summary.local_outputs += 1,
                Err(TranscodeError::DeliverableSkipped(note)) => {
                    debug!("Skipped: {}", note);
                    deliverable.mark_skipped(note);
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!("Deliverable '{}' failed: {}", deliverable.label, e);
                    deliverable.mark_failed(e.to_string());
                    summary.failed += 1;
                }
            }
        }

        info!(
            cloud_jobs = summary.cloud_jobs,
            local_outputs = summary.local_outputs,
            skipped = summary.skipped,
            failed = summary.failed,
            "Packaging finished"
        );

        Ok((deliverables, summary))
    }

    fn package_one(
        &self,
        run_id: &str,
        run_dir: &Path,
        index: usize,
        deliverable: &mut Deliverable,
        source: &SourceAsset,
    ) -> Result<DeliverableMode, TranscodeError> {
        let profile = match deliverable.profile {
            Some(profile) => profile,
            None => match self.rules.infer(&deliverable.label, &deliverable.kind) {
                Some((profile, rule)) => {
                    debug!("Profile {} inferred by rule '{}'", profile, rule);
                    profile
                }
                None => {
                    return Err(TranscodeError::DeliverableSkipped(format!(
                        "No packaging profile matches label '{}' or type '{}'",
                        deliverable.label, deliverable.kind
                    )))
                }
            },
        };
        deliverable.profile = Some(profile);

        let backend = select_backend(deliverable, source, &self.capabilities, &self.defaults);
        match (backend, self.cloud.as_ref()) {
            (Backend::Cloud(target), Some(service)) => {
                self.submit_cloud(service.as_ref(), run_id, profile, &target, deliverable)?;
                Ok(DeliverableMode::Cloud)
            }
            _ => {
                self.encode_local(run_id, run_dir, index, profile, source, deliverable)?;
                Ok(DeliverableMode::Local)
            }
        }
    }

    fn submit_cloud(
        &self,
        service: &dyn TranscodeService,
        run_id: &str,
        profile: Profile,
        target: &CloudTarget,
        deliverable: &mut Deliverable,
    ) -> Result<(), TranscodeError> {
        let job = TranscodeJobSpec::new(profile, target, run_id);
        let submitted = service.submit(&job)?;

        info!("Submitted cloud job {} ({})", submitted.job_id, profile);

        let expected = format!(
            "{}{}",
            destination_prefix(&target.bucket, run_id, profile),
            output_name(profile, &source_stem(&target.input_uri), profile.spec().cloud_container)
        );

        deliverable.status = DeliverableStatus::Rendering;
        deliverable.mode = Some(DeliverableMode::Cloud);
        deliverable.job_id = Some(submitted.job_id);
        deliverable.job_arn = Some(submitted.job_arn);
        deliverable.path = Some(expected);
        deliverable.error = None;
        deliverable.preview_metadata = Some(PreviewMetadata::for_profile(
            profile.spec(),
            DeliverableMode::Cloud,
            Some(target.input_uri.clone()),
        ));
        Ok(())
    }

    /// Encodes into `<run_dir>/<NN>/`, one slot per deliverable position, so
    /// deliverables sharing a profile never overwrite each other.
    fn encode_local(
        &self,
        run_id: &str,
        run_dir: &Path,
        index: usize,
        profile: Profile,
        source: &SourceAsset,
        deliverable: &mut Deliverable,
    ) -> Result<(), TranscodeError> {
        let input = source.local_file().ok_or_else(|| {
            TranscodeError::Precondition(match source.local_path.as_deref() {
                Some(path) if !path.is_empty() => format!(
                    "source file not found: {}",
                    sanitize::redact_path(Path::new(path))
                ),
                _ => "run has no local source file".to_string(),
            })
        })?;
        let binary = self
            .capabilities
            .local_encoder_path
            .as_ref()
            .ok_or_else(|| TranscodeError::Precondition("no local encoder available".to_string()))?;

        let slot_dir = run_dir.join(format!("{:02}", index + 1));
        let output = LocalEncoder::new(binary).encode(profile, &input, &slot_dir)?;
        if !output.exists() {
            return Err(TranscodeError::DeliverableFailed(format!(
                "encoder reported success but produced no output at {}",
                sanitize::redact_path(&output)
            )));
        }

        deliverable.status = DeliverableStatus::Ready;
        deliverable.mode = Some(DeliverableMode::Local);
        deliverable.path = Some(output.to_string_lossy().into_owned());
        deliverable.local_path = None;
        deliverable.error = None;
        deliverable.preview_metadata = Some(PreviewMetadata::for_profile(
            profile.spec(),
            DeliverableMode::Local,
            Some(sanitize::redact_path(&input)),
        ));

        if let Some(uri) = self.mirror_output(run_id, run_dir, profile, &output) {
            deliverable.local_path = deliverable.path.take();
            deliverable.path = Some(uri);
        }
        Ok(())
    }

    /// Copies a local output to `runs/<run_id>/<profile>/<NN>/` in the
    /// destination bucket, keeping its layout under the run directory. HLS
    /// outputs carry their segments along. Failures are logged and leave the
    /// output local.
    fn mirror_output(
        &self,
        run_id: &str,
        run_dir: &Path,
        profile: Profile,
        output: &Path,
    ) -> Option<String> {
        let store = self.object_store.as_ref()?;
        let bucket = self
            .defaults
            .destination_bucket
            .as_deref()
            .filter(|b| !b.trim().is_empty())?;
        let prefix = format!("runs/{}/{}", run_id, profile.as_str());

        let files: Vec<PathBuf> = if profile == Profile::AdaptiveStreaming {
            let dir = output.parent()?;
            match std::fs::read_dir(dir) {
                Ok(entries) => entries
                    .flatten()
                    .map(|e| e.path())
                    .filter(|p| p.is_file())
                    .collect(),
                Err(e) => {
                    warn!("Cannot list HLS output for mirroring: {}", e);
                    return None;
                }
            }
        } else {
            vec![output.to_path_buf()]
        };

        let mut primary = None;
        for file in &files {
            let Ok(relative) = file.strip_prefix(run_dir) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let key = format!("{}/{}", prefix, relative);
            match store.put_file(bucket, &key, file) {
                Ok(object) => {
                    if file == output {
                        primary = Some(object.uri);
                    }
                }
                Err(e) => {
                    warn!(
                        "Mirroring {} failed, keeping local output: {}",
                        sanitize::redact_path(file),
                        e
                    );
                    return None;
                }
            }
        }
        primary
    }

    /// Polls the cloud service for every rendering deliverable. Returns the
    /// number of deliverables whose status changed.
    pub fn refresh(&self, deliverables: &mut [Deliverable]) -> usize {
        let Some(service) = self.cloud.as_ref() else {
            return 0;
        };

        let mut changed = 0;
        for deliverable in deliverables
            .iter_mut()
            .filter(|d| d.status == DeliverableStatus::Rendering)
        {
            let Some(job_id) = deliverable.job_id.clone() else {
                continue;
            };
            match service.status(&job_id) {
                Ok(CloudJobStatus::Complete) => {
                    deliverable.status = DeliverableStatus::Ready;
                    deliverable.error = None;
                    changed += 1;
                }
                Ok(CloudJobStatus::Error(message)) => {
                    deliverable.mark_failed(message);
                    changed += 1;
                }
                Ok(CloudJobStatus::Submitted) | Ok(CloudJobStatus::Progressing) => {}
                Err(e) => warn!("Status check for job {} failed: {}", job_id, e),
            }
        }
        changed
    }
}

/// File stem of the last path segment of a URI or path.
fn source_stem(locator: &str) -> String {
    let name = locator.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };
    if stem.is_empty() {
        "source".to_string()
    } else {
        stem.to_string()
    }
}

fn output_name(profile: Profile, stem: &str, container: Container) -> String {
    let suffix = profile.spec().suffix;
    match container {
        Container::Hls => format!("{}_{}/index.m3u8", stem, suffix),
        Container::Mp4 | Container::Mov => format!("{}_{}.{}", stem, suffix, container.as_str()),
    }
}
