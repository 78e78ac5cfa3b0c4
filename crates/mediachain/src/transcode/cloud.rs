//! Client for the asynchronous cloud transcode service.
//!
//! Jobs are submitted with `POST <endpoint>/jobs` and polled with
//! `GET <endpoint>/jobs/<id>`. Submission never waits for the render.

use std::collections::BTreeMap;
use std::time::Duration;

use log::{debug, info};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::CloudError;
use crate::sanitize;
use crate::storage::remote_uri;

use super::backend::CloudTarget;
use super::profile::Profile;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutput {
    pub container: String,
    pub width: u32,
    pub height: u32,
    pub codec: String,
    pub bitrate_bps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeJobSpec {
    pub input: String,
    pub output: JobOutput,
    /// Remote prefix the service writes into.
    pub destination: String,
    pub role: String,
    pub queue: String,
    pub tags: BTreeMap<String, String>,
}

impl TranscodeJobSpec {
    pub fn new(profile: Profile, target: &CloudTarget, run_id: &str) -> Self {
        let spec = profile.spec();
        let mut tags = BTreeMap::new();
        tags.insert("run_id".to_string(), run_id.to_string());
        tags.insert("profile".to_string(), profile.as_str().to_string());

        Self {
            input: target.input_uri.clone(),
            output: JobOutput {
                container: spec.cloud_container.as_str().to_string(),
                width: spec.width,
                height: spec.height,
                codec: spec.cloud_codec.to_string(),
                bitrate_bps: u64::from(spec.bitrate_kbps) * 1000,
            },
            destination: destination_prefix(&target.bucket, run_id, profile),
            role: target.role.clone(),
            queue: target.queue.clone(),
            tags,
        }
    }
}

/// `remote://<bucket>/runs/<run_id>/<profile>/`
pub fn destination_prefix(bucket: &str, run_id: &str, profile: Profile) -> String {
    remote_uri(bucket, &format!("runs/{}/{}/", run_id, profile.as_str()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedJob {
    pub job_id: String,
    pub job_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudJobStatus {
    Submitted,
    Progressing,
    Complete,
    Error(String),
}

impl CloudJobStatus {
    fn from_wire(status: &str, message: Option<String>) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "complete" | "completed" => CloudJobStatus::Complete,
            "error" | "failed" | "canceled" => CloudJobStatus::Error(
                message.unwrap_or_else(|| format!("transcode job ended with status {}", status)),
            ),
            "submitted" => CloudJobStatus::Submitted,
            _ => CloudJobStatus::Progressing,
        }
    }
}

pub trait TranscodeService: Send + Sync {
    fn submit(&self, job: &TranscodeJobSpec) -> Result<SubmittedJob, CloudError>;
    fn status(&self, job_id: &str) -> Result<CloudJobStatus, CloudError>;
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(alias = "id")]
    job_id: String,
    #[serde(default, alias = "arn")]
    job_arn: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default, alias = "error")]
    error_message: Option<String>,
}

pub struct HttpTranscodeService {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: Option<SecretString>,
}

impl HttpTranscodeService {
    pub fn new(endpoint: &str, token: Option<SecretString>) -> Result<Self, CloudError> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(CloudError::InvalidEndpoint(sanitize::redact_url(endpoint)));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        info!(
            "Cloud transcode service at {}",
            sanitize::redact_url(endpoint)
        );

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token,
        })
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, CloudError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        let body = if body.len() > MAX_ERROR_BODY_LENGTH {
            let mut cut = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated)", &body[..cut])
        } else {
            body
        };
        Err(CloudError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl TranscodeService for HttpTranscodeService {
    fn submit(&self, job: &TranscodeJobSpec) -> Result<SubmittedJob, CloudError> {
        let url = format!("{}/jobs", self.endpoint);
        let response = self.authorize(self.client.post(&url).json(job)).send()?;
        let parsed: SubmitResponse = Self::check(response)?.json()?;

        debug!("Submitted transcode job {}", parsed.job_id);

        let job_arn = parsed
            .job_arn
            .unwrap_or_else(|| format!("{}/jobs/{}", self.endpoint, parsed.job_id));
        Ok(SubmittedJob {
            job_id: parsed.job_id,
            job_arn,
        })
    }

    fn status(&self, job_id: &str) -> Result<CloudJobStatus, CloudError> {
        let url = format!("{}/jobs/{}", self.endpoint, job_id);
        let response = self.authorize(self.client.get(&url)).send()?;
        let parsed: StatusResponse = Self::check(response)?.json()?;
        Ok(CloudJobStatus::from_wire(&parsed.status, parsed.error_message))
    }
}
