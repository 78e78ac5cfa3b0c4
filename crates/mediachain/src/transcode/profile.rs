//! Fixed packaging profiles. Each profile pins resolution, codec, bitrate
//! and container for both backends; nothing here is configurable per call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// 4K master for downstream re-encodes.
    Mezzanine,
    /// 1080p HLS ladder rung with an M3U8 manifest.
    AdaptiveStreaming,
    /// 9:16 cut for social platforms.
    SocialVertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Mov,
    Hls,
}

impl Container {
    pub fn as_str(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mov => "mov",
            Container::Hls => "hls",
        }
    }
}

/// Encoding contract for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileSpec {
    pub width: u32,
    pub height: u32,
    /// Codec used by the local encoder.
    pub local_codec: &'static str,
    /// Codec requested from the cloud transcode service.
    pub cloud_codec: &'static str,
    pub bitrate_kbps: u32,
    pub local_container: Container,
    pub cloud_container: Container,
    /// Suffix appended to the source stem for output names.
    pub suffix: &'static str,
}

impl ProfileSpec {
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn bitrate_label(&self) -> String {
        if self.bitrate_kbps % 1000 == 0 {
            format!("{} Mbps", self.bitrate_kbps / 1000)
        } else {
            format!("{:.1} Mbps", f64::from(self.bitrate_kbps) / 1000.0)
        }
    }
}

const MEZZANINE: ProfileSpec = ProfileSpec {
    width: 3840,
    height: 2160,
    local_codec: "h264",
    cloud_codec: "prores_422_hq",
    bitrate_kbps: 35_000,
    local_container: Container::Mp4,
    cloud_container: Container::Mov,
    suffix: "mezzanine",
};

const ADAPTIVE_STREAMING: ProfileSpec = ProfileSpec {
    width: 1920,
    height: 1080,
    local_codec: "h264",
    cloud_codec: "h264",
    bitrate_kbps: 6_000,
    local_container: Container::Hls,
    cloud_container: Container::Hls,
    suffix: "hls",
};

const SOCIAL_VERTICAL: ProfileSpec = ProfileSpec {
    width: 1080,
    height: 1920,
    local_codec: "h264",
    cloud_codec: "h264",
    bitrate_kbps: 8_500,
    local_container: Container::Mp4,
    cloud_container: Container::Mp4,
    suffix: "vertical",
};

impl Profile {
    pub const ALL: [Profile; 3] = [
        Profile::Mezzanine,
        Profile::AdaptiveStreaming,
        Profile::SocialVertical,
    ];

    pub fn spec(&self) -> &'static ProfileSpec {
        match self {
            Profile::Mezzanine => &MEZZANINE,
            Profile::AdaptiveStreaming => &ADAPTIVE_STREAMING,
            Profile::SocialVertical => &SOCIAL_VERTICAL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Mezzanine => "mezzanine",
            Profile::AdaptiveStreaming => "adaptive_streaming",
            Profile::SocialVertical => "social_vertical",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "mezzanine" | "prores" | "mezzanine_4k" => Ok(Profile::Mezzanine),
            "adaptive_streaming" | "hls" | "ott" => Ok(Profile::AdaptiveStreaming),
            "social_vertical" | "vertical" | "social" => Ok(Profile::SocialVertical),
            other => Err(format!("unknown profile '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_table_matches_contract() {
        let m = Profile::Mezzanine.spec();
        assert_eq!((m.width, m.height), (3840, 2160));
        assert_eq!(m.cloud_codec, "prores_422_hq");
        assert_eq!(m.cloud_container, Container::Mov);
        assert_eq!(m.local_container, Container::Mp4);

        let a = Profile::AdaptiveStreaming.spec();
        assert_eq!((a.width, a.height), (1920, 1080));
        assert_eq!(a.bitrate_kbps, 6_000);
        assert_eq!(a.local_container, Container::Hls);

        let s = Profile::SocialVertical.spec();
        assert_eq!((s.width, s.height), (1080, 1920));
        assert_eq!(s.bitrate_kbps, 8_500);
    }

    #[test]
    fn test_bitrate_label() {
        assert_eq!(Profile::AdaptiveStreaming.spec().bitrate_label(), "6 Mbps");
        assert_eq!(Profile::SocialVertical.spec().bitrate_label(), "8.5 Mbps");
    }

    #[test]
    fn test_profile_from_str_accepts_aliases() {
        assert_eq!("HLS".parse::<Profile>().unwrap(), Profile::AdaptiveStreaming);
        assert_eq!("social-vertical".parse::<Profile>().unwrap(), Profile::SocialVertical);
        assert_eq!("prores".parse::<Profile>().unwrap(), Profile::Mezzanine);
        assert!("dvd".parse::<Profile>().is_err());
    }

    #[test]
    fn test_profile_serde_names() {
        let json = serde_json::to_string(&Profile::AdaptiveStreaming).unwrap();
        assert_eq!(json, "\"adaptive_streaming\"");
        let parsed: Profile = serde_json::from_str("\"social_vertical\"").unwrap();
        assert_eq!(parsed, Profile::SocialVertical);
    }
}
