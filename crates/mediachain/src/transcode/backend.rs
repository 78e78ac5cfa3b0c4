//! Backend selection for a single deliverable.

use crate::run::Deliverable;
use crate::storage::SourceAsset;

use super::capabilities::Capabilities;

pub const ROLE_ENV: &str = "TRANSCODE_ROLE";
pub const QUEUE_ENV: &str = "TRANSCODE_QUEUE";

/// Transcoder-wide defaults, overridable per deliverable.
#[derive(Debug, Clone, Default)]
pub struct BackendDefaults {
    pub destination_bucket: Option<String>,
    pub role: Option<String>,
    pub queue: Option<String>,
    pub force_local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Cloud(CloudTarget),
    Local,
}

/// Everything a cloud submission needs that is not part of the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudTarget {
    pub input_uri: String,
    pub bucket: String,
    pub role: String,
    pub queue: String,
}

/// Force-local always wins. Cloud needs a cloud service, a remote source, a
/// destination bucket, a role and a queue. Everything else runs locally.
pub fn select_backend(
    deliverable: &Deliverable,
    source: &SourceAsset,
    capabilities: &Capabilities,
    defaults: &BackendDefaults,
) -> Backend {
    if deliverable.force_local.unwrap_or(defaults.force_local) {
        return Backend::Local;
    }
    if !capabilities.cloud_available {
        return Backend::Local;
    }

    let Some(input_uri) = source.remote_uri() else {
        return Backend::Local;
    };
    let Some(bucket) = non_empty(defaults.destination_bucket.as_deref()) else {
        return Backend::Local;
    };
    let role = resolve_setting(deliverable.role.as_deref(), defaults.role.as_deref(), ROLE_ENV);
    let queue = resolve_setting(
        deliverable.queue.as_deref(),
        defaults.queue.as_deref(),
        QUEUE_ENV,
    );

    match (role, queue) {
        (Some(role), Some(queue)) => Backend::Cloud(CloudTarget {
            input_uri,
            bucket: bucket.to_string(),
            role,
            queue,
        }),
        _ => Backend::Local,
    }
}

/// Deliverable override, then config, then the environment.
pub fn resolve_setting(
    override_value: Option<&str>,
    config_value: Option<&str>,
    env_var: &str,
) -> Option<String> {
    non_empty(override_value)
        .or_else(|| non_empty(config_value))
        .map(str::to_string)
        .or_else(|| {
            std::env::var(env_var)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
