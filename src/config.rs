use std::path::PathBuf;

use directories::{ProjectDirs, UserDirs};

/// Process-wide path configuration, resolved once at startup and kept for
/// the lifetime of the process.
#[derive(Clone, Debug)]
pub struct AppPaths {
    /// Per-run log files live here.
    pub log_dir: PathBuf,
    /// Vendored ffmpeg tree (`<vendor>/bin/ffmpeg[.exe]`).
    pub vendor_dir: PathBuf,
    /// Initial value of the destination-folder field.
    pub default_download_dir: PathBuf,
}

impl AppPaths {
    pub fn resolve() -> Self {
        let data_dir = ProjectDirs::from("", "", "baixavid")
            .map(|dirs| dirs.data_local_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".baixavid"));

        let default_download_dir = UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(|dir| dir.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("./downloads"));

        Self {
            log_dir: data_dir.join("log"),
            vendor_dir: data_dir.join("ffmpeg"),
            default_download_dir,
        }
    }
}
