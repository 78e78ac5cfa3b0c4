use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::blueprint::DeliverableTemplate;
use crate::transcode::{PackagingSummary, Profile, ProfileSpec};

/// Aggregate status of a run, derived from its deliverables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    /// All pending → pending; anything still pending/rendering → running;
    /// all terminal → completed if at least one deliverable is ready,
    /// failed otherwise. An empty run is trivially completed.
    pub fn derive(deliverables: &[Deliverable]) -> Self {
        if deliverables.is_empty() {
            return RunStatus::Completed;
        }
        if deliverables
            .iter()
            .all(|d| d.status == DeliverableStatus::Pending)
        {
            return RunStatus::Pending;
        }
        if deliverables.iter().any(|d| !d.status.is_terminal()) {
            return RunStatus::Running;
        }
        if deliverables
            .iter()
            .any(|d| d.status == DeliverableStatus::Ready)
        {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliverableStatus {
    Pending,
    /// Submitted to the cloud service, completion not yet observed.
    Rendering,
    Ready,
    Failed,
    /// No profile could be inferred.
    Skipped,
}

impl DeliverableStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliverableStatus::Ready | DeliverableStatus::Failed | DeliverableStatus::Skipped
        )
    }
}

/// Backend that produced (or is producing) a deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliverableMode {
    Cloud,
    Local,
}

/// Static profile facts merged with what actually ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewMetadata {
    pub resolution: String,
    pub bitrate: String,
    pub container: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<DeliverableMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl PreviewMetadata {
    pub fn for_profile(spec: &ProfileSpec, mode: DeliverableMode, source: Option<String>) -> Self {
        let container = match mode {
            DeliverableMode::Cloud => spec.cloud_container,
            DeliverableMode::Local => spec.local_container,
        };
        Self {
            resolution: spec.resolution(),
            bitrate: spec.bitrate_label(),
            container: container.as_str().to_string(),
            mode: Some(mode),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    pub status: DeliverableStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<DeliverableMode>,
    /// Remote locator when mirrored or submitted to the cloud, else a local path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Local copy of an output whose `path` points at remote storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_metadata: Option<PreviewMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_local: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
}

impl Deliverable {
    pub fn from_template(template: &DeliverableTemplate) -> Self {
        Self {
            label: template.label.clone(),
            kind: template.kind.clone(),
            profile: template.profile,
            status: DeliverableStatus::Pending,
            mode: None,
            path: None,
            local_path: None,
            job_id: None,
            job_arn: None,
            error: None,
            note: None,
            preview_metadata: None,
            force_local: template.force_local,
            role: template.role.clone(),
            queue: template.queue.clone(),
        }
    }

    pub fn mark_skipped(&mut self, note: String) {
        self.status = DeliverableStatus::Skipped;
        self.error = None;
        self.note = Some(note);
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = DeliverableStatus::Failed;
        self.error = Some(error);
    }
}

/// One execution of a blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub blueprint_name: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub labels: Map<String, Value>,
    pub status: RunStatus,
    pub deliverables: Vec<Deliverable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<PackagingSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Run {
    pub fn new(
        blueprint_name: &str,
        templates: &[DeliverableTemplate],
        inputs: Map<String, Value>,
        labels: Map<String, Value>,
    ) -> Self {
        let now = Utc::now();
        let deliverables: Vec<Deliverable> =
            templates.iter().map(Deliverable::from_template).collect();
        let status = RunStatus::derive(&deliverables);
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            blueprint_name: blueprint_name.to_string(),
            inputs,
            labels,
            status,
            deliverables,
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Re-derives `status` and bumps `updated_at`.
    pub fn touch(&mut self) {
        self.status = RunStatus::derive(&self.deliverables);
        self.updated_at = Utc::now();
    }
}
