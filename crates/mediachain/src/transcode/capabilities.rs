use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::Serialize;

pub const DEFAULT_ENCODER: &str = "ffmpeg";

/// Which backends this process can use. Resolved once when the transcoder
/// is built and never re-probed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub cloud_available: bool,
    pub local_encoder_path: Option<PathBuf>,
}

impl Capabilities {
    /// Uses `configured_encoder` when it exists, otherwise the first
    /// `ffmpeg` on `PATH`.
    pub fn detect(configured_encoder: Option<&Path>, cloud_available: bool) -> Self {
        let local_encoder_path = match configured_encoder {
            Some(path) if path.is_file() => Some(path.to_path_buf()),
            Some(path) => {
                log::warn!(
                    "Configured encoder {} not found, searching PATH",
                    path.display()
                );
                find_on_path(DEFAULT_ENCODER)
            }
            None => find_on_path(DEFAULT_ENCODER),
        };

        match &local_encoder_path {
            Some(path) => log::info!("Local encoder: {}", path.display()),
            None => log::warn!("No local encoder available; local deliverables will fail"),
        }

        Self {
            cloud_available,
            local_encoder_path,
        }
    }

    pub fn local_available(&self) -> bool {
        self.local_encoder_path.is_some()
    }
}

pub fn find_on_path(binary: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    find_in(binary, &path_var)
}

/// Searches each directory of a `PATH`-style list for `binary`.
pub fn find_in(binary: &str, path_list: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_list)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| candidates(&dir, binary))
        .find(|candidate| candidate.is_file())
}

fn candidates(dir: &Path, binary: &str) -> Vec<PathBuf> {
    let mut out = vec![dir.join(binary)];
    if cfg!(windows) {
        out.push(dir.join(format!("{}.exe", binary)));
    }
    out
}
