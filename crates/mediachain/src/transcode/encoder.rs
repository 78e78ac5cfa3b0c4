//! Local packaging through an ffmpeg-compatible command-line encoder.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::TranscodeError;

use super::profile::Profile;

/// Upper bound on the encoder diagnostics kept on a failed deliverable.
pub const STDERR_TAIL_BYTES: usize = 4000;

pub struct LocalEncoder {
    binary: PathBuf,
}

impl LocalEncoder {
    pub fn new<P: AsRef<Path>>(binary: P) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Runs the encoder for `profile` and returns the primary output path:
    /// the file itself, or the playlist for HLS.
    pub fn encode(
        &self,
        profile: Profile,
        input: &Path,
        out_dir: &Path,
    ) -> Result<PathBuf, TranscodeError> {
        if !input.is_file() {
            return Err(TranscodeError::Precondition(format!(
                "source file not found: {}",
                input.display()
            )));
        }

        let output = output_path(profile, input, out_dir);
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TranscodeError::CreateRunDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let args = build_args(profile, input, &output);
        debug!("Running {} {}", self.binary.display(), args.join(" "));

        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| TranscodeError::Spawn {
                binary: self.binary.clone(),
                source: e,
            })?;

        if !result.status.success() {
            let code = result
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let stderr = String::from_utf8_lossy(&result.stderr);
            let stderr = tail(stderr.trim(), STDERR_TAIL_BYTES);
            let stderr = if stderr.is_empty() {
                "no diagnostic output".to_string()
            } else {
                stderr.to_string()
            };
            return Err(TranscodeError::EncoderExited { code, stderr });
        }

        Ok(output)
    }
}

/// `<out_dir>/<stem>_<suffix>.mp4`, or `<out_dir>/<stem>_hls/index.m3u8`.
pub fn output_path(profile: Profile, input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "source".to_string());
    let suffix = profile.spec().suffix;

    match profile {
        Profile::AdaptiveStreaming => out_dir
            .join(format!("{}_{}", stem, suffix))
            .join("index.m3u8"),
        Profile::Mezzanine | Profile::SocialVertical => {
            out_dir.join(format!("{}_{}.mp4", stem, suffix))
        }
    }
}

/// Full argument list for one encode. The scale/pad filter letterboxes into
/// the profile's frame without changing the aspect ratio.
pub fn build_args(profile: Profile, input: &Path, output: &Path) -> Vec<String> {
    let spec = profile.spec();
    let (w, h) = (spec.width, spec.height);

    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-vf".into(),
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2"
        ),
    ];

    let codec_args: &[&str] = match profile {
        Profile::Mezzanine => &[
            "-c:v", "libx264", "-preset", "slow", "-crf", "18", "-pix_fmt", "yuv420p", "-c:a",
            "aac", "-b:a", "320k", "-movflags", "+faststart",
        ],
        Profile::AdaptiveStreaming => &[
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-b:v",
            "6000k",
            "-maxrate",
            "6420k",
            "-bufsize",
            "12000k",
            "-c:a",
            "aac",
            "-b:a",
            "128k",
            "-f",
            "hls",
            "-hls_time",
            "6",
            "-hls_playlist_type",
            "vod",
        ],
        Profile::SocialVertical => &[
            "-c:v",
            "libx264",
            "-preset",
            "medium",
            "-b:v",
            "8500k",
            "-maxrate",
            "9000k",
            "-bufsize",
            "17000k",
            "-c:a",
            "aac",
            "-b:a",
            "192k",
            "-movflags",
            "+faststart",
        ],
    };
    args.extend(codec_args.iter().map(|a| a.to_string()));

    if profile == Profile::AdaptiveStreaming {
        let segment_dir = output.parent().unwrap_or_else(|| Path::new("."));
        args.push("-hls_segment_filename".into());
        args.push(
            segment_dir
                .join("segment_%03d.ts")
                .to_string_lossy()
                .into_owned(),
        );
    }

    args.push(output.to_string_lossy().into_owned());
    args
}

/// The last `max_bytes` of `text`, cut on a character boundary.
pub fn tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
