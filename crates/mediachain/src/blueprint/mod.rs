//! Blueprints: named templates listing the deliverables a run produces.

pub mod registry;

use serde::{Deserialize, Serialize};

use crate::transcode::Profile;

pub use registry::BlueprintRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableTemplate {
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Explicit profile; when absent it is inferred from `label`/`type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_local: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
}

impl DeliverableTemplate {
    pub fn new(label: &str, kind: &str) -> Self {
        Self {
            label: label.to_string(),
            kind: kind.to_string(),
            profile: None,
            force_local: None,
            role: None,
            queue: None,
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_inputs: Vec<String>,
    pub deliverables: Vec<DeliverableTemplate>,
}

impl Blueprint {
    pub fn summary(&self) -> BlueprintSummary {
        let profiles = self
            .deliverables
            .iter()
            .filter_map(|d| d.profile)
            .fold(Vec::new(), |mut acc, p| {
                if !acc.contains(&p) {
                    acc.push(p);
                }
                acc
            });

        BlueprintSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            required_inputs: self.required_inputs.clone(),
            deliverable_count: self.deliverables.len(),
            profiles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintSummary {
    pub name: String,
    pub description: String,
    pub required_inputs: Vec<String>,
    pub deliverable_count: usize,
    /// Explicitly declared profiles only; inferred ones are resolved at run time.
    pub profiles: Vec<Profile>,
}
