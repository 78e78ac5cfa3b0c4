use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::transcode::Profile;

use super::{Blueprint, BlueprintSummary, DeliverableTemplate};

/// Immutable catalog of blueprints keyed by name.
#[derive(Debug, Clone)]
pub struct BlueprintRegistry {
    blueprints: BTreeMap<String, Blueprint>,
}

impl BlueprintRegistry {
    /// Builds a registry, rejecting duplicate names and empty deliverable lists.
    pub fn new(blueprints: Vec<Blueprint>) -> Result<Self, ConfigError> {
        let mut map = BTreeMap::new();
        for blueprint in blueprints {
            if blueprint.name.trim().is_empty() {
                return Err(ConfigError::InvalidBlueprint {
                    name: blueprint.name,
                    reason: "Blueprint name must not be empty".to_string(),
                });
            }
            if blueprint.deliverables.is_empty() {
                return Err(ConfigError::InvalidBlueprint {
                    name: blueprint.name,
                    reason: "Blueprint declares no deliverables".to_string(),
                });
            }
            if map.contains_key(&blueprint.name) {
                return Err(ConfigError::InvalidBlueprint {
                    name: blueprint.name,
                    reason: "Duplicate blueprint name".to_string(),
                });
            }
            map.insert(blueprint.name.clone(), blueprint);
        }
        Ok(Self { blueprints: map })
    }

    /// The catalog shipped with the engine.
    pub fn builtin() -> Self {
        let blueprints = builtin_blueprints()
            .into_iter()
            .map(|b| (b.name.clone(), b))
            .collect();
        Self { blueprints }
    }

    pub fn get(&self, name: &str) -> Option<&Blueprint> {
        self.blueprints.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blueprints.contains_key(name)
    }

    /// Summaries sorted by blueprint name.
    pub fn summaries(&self) -> Vec<BlueprintSummary> {
        self.blueprints.values().map(Blueprint::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}

pub fn builtin_blueprints() -> Vec<Blueprint> {
    vec![
        Blueprint {
            name: "social_pack".to_string(),
            description: "Vertical social cut from a single source asset".to_string(),
            required_inputs: vec!["source".to_string()],
            deliverables: vec![DeliverableTemplate::new("TikTok vertical cut", "social_cut")],
        },
        Blueprint {
            name: "ott_delivery".to_string(),
            description: "Mezzanine master plus HLS package for OTT platforms".to_string(),
            required_inputs: vec!["source".to_string()],
            deliverables: vec![
                DeliverableTemplate::new("ProRes mezzanine", "mezzanine"),
                DeliverableTemplate::new("OTT HLS package", "ott_packaged"),
            ],
        },
        Blueprint {
            name: "launch_campaign".to_string(),
            description: "Full launch kit: master, streaming package and social cut".to_string(),
            required_inputs: vec!["source".to_string(), "title".to_string()],
            deliverables: vec![
                DeliverableTemplate::new("Archive master", "mezzanine")
                    .with_profile(Profile::Mezzanine),
                DeliverableTemplate::new("Streaming HLS", "hls"),
                DeliverableTemplate::new("Vertical teaser", "social_cut"),
            ],
        },
    ]
}
