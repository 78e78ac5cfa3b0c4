//! Profile inference from free-text deliverable hints.
//!
//! An ordered rule table, evaluated first-match-wins over the lower-cased
//! `label` and `type` of a deliverable.

use super::profile::Profile;

/// Lower-cased hints a rule is evaluated against.
#[derive(Debug, Clone)]
pub struct Cue {
    pub label: String,
    pub kind: String,
}

impl Cue {
    pub fn new(label: &str, kind: &str) -> Self {
        Self {
            label: label.to_lowercase(),
            kind: kind.trim().to_lowercase(),
        }
    }

    fn label_contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.label.contains(n))
    }

    fn kind_is_any(&self, kinds: &[&str]) -> bool {
        kinds.iter().any(|k| self.kind == *k)
    }
}

pub struct ProfileRule {
    pub name: &'static str,
    pub matches: fn(&Cue) -> bool,
    pub profile: Profile,
}

pub struct ProfileRules {
    rules: Vec<ProfileRule>,
}

impl ProfileRules {
    pub fn new(rules: Vec<ProfileRule>) -> Self {
        Self { rules }
    }

    /// Returns the profile and the name of the first rule that matched.
    pub fn infer(&self, label: &str, kind: &str) -> Option<(Profile, &'static str)> {
        let cue = Cue::new(label, kind);
        self.rules
            .iter()
            .find(|rule| (rule.matches)(&cue))
            .map(|rule| (rule.profile, rule.name))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ProfileRules {
    fn default() -> Self {
        Self::new(vec![
            ProfileRule {
                name: "mezzanine",
                matches: |c| c.label_contains_any(&["prores"]) || c.kind_is_any(&["mezzanine"]),
                profile: Profile::Mezzanine,
            },
            ProfileRule {
                name: "adaptive_streaming",
                matches: |c| {
                    c.label_contains_any(&["hls"]) || c.kind_is_any(&["ott", "ott_packaged", "hls"])
                },
                profile: Profile::AdaptiveStreaming,
            },
            ProfileRule {
                name: "social_vertical",
                matches: |c| {
                    c.label_contains_any(&["tiktok", "vertical"]) || c.kind_is_any(&["social_cut"])
                },
                profile: Profile::SocialVertical,
            },
        ])
    }
}
