//! Ensures the ffmpeg conversion tool is available before downloads need it.
//!
//! Resolution order: system search path, then the vendored copy under the
//! app data directory, and only when both miss a one-time fetch of the
//! release archive. The resolved location is cached by `main` for the
//! process lifetime.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use crate::error::ProvisionError;

const FFMPEG_ARCHIVE_URL: &str =
    "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip";

/// Where the resolved ffmpeg binary lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolLocation {
    /// Found on the system search path; nothing to configure.
    System(PathBuf),
    /// Vendored copy under the app data directory.
    Vendored(PathBuf),
}

pub fn ffmpeg_binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "ffmpeg.exe"
    } else {
        "ffmpeg"
    }
}

fn probe_system() -> Option<PathBuf> {
    which::which(ffmpeg_binary_name()).ok()
}

/// Resolves ffmpeg, fetching and unpacking the release archive on first run
/// if neither the system path nor the vendor directory has it. On success the
/// vendored `bin` directory is prepended to the process search path so the
/// extractor's post-processing step can find the tool.
pub fn ensure_ffmpeg(vendor_dir: &Path) -> Result<ToolLocation, ProvisionError> {
    let location = ensure_ffmpeg_with(vendor_dir, probe_system(), fetch_release_archive)?;
    expose_on_search_path(&location);
    Ok(location)
}

/// Core resolution logic with the system probe and the network fetch
/// injected. Does not touch the process environment.
fn ensure_ffmpeg_with<F>(
    vendor_dir: &Path,
    system: Option<PathBuf>,
    fetch: F,
) -> Result<ToolLocation, ProvisionError>
where
    F: FnOnce(&Path) -> Result<PathBuf, ProvisionError>,
{
    if let Some(path) = system {
        info!(path = %path.display(), "ffmpeg found on the system path");
        return Ok(ToolLocation::System(path));
    }

    let vendored = vendor_dir.join("bin").join(ffmpeg_binary_name());
    if vendored.is_file() {
        info!(path = %vendored.display(), "using vendored ffmpeg");
        return Ok(ToolLocation::Vendored(vendored));
    }

    info!("ffmpeg not found, fetching release archive");
    fs::create_dir_all(vendor_dir)?;
    let archive = fetch(vendor_dir)?;
    extract_archive(&archive, vendor_dir)?;
    let _ = fs::remove_file(&archive);
    promote_bin_dir(vendor_dir)?;

    if vendored.is_file() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&vendored, fs::Permissions::from_mode(0o755))?;
        }
        info!(path = %vendored.display(), "ffmpeg installed");
        Ok(ToolLocation::Vendored(vendored))
    } else {
        Err(ProvisionError::BinaryNotFound)
    }
}

/// Downloads the packaged ffmpeg build into the vendor directory and returns
/// the archive path. The packaged build only exists for Windows; elsewhere
/// the caller keeps running with degraded capability.
fn fetch_release_archive(vendor_dir: &Path) -> Result<PathBuf, ProvisionError> {
    if !cfg!(target_os = "windows") {
        return Err(ProvisionError::UnsupportedPlatform);
    }
    let archive_path = vendor_dir.join("ffmpeg.zip");
    let mut response = reqwest::blocking::get(FFMPEG_ARCHIVE_URL)?.error_for_status()?;
    let mut file = fs::File::create(&archive_path)?;
    response.copy_to(&mut file)?;
    Ok(archive_path)
}

fn extract_archive(archive_path: &Path, vendor_dir: &Path) -> Result<(), ProvisionError> {
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    archive.extract(vendor_dir)?;
    Ok(())
}

/// The release zip unpacks to `ffmpeg-<version>-essentials_build/bin/...`;
/// relocate that `bin` directory to the fixed `<vendor>/bin` path so repeat
/// runs short-circuit on the probe.
fn promote_bin_dir(vendor_dir: &Path) -> Result<(), ProvisionError> {
    let target = vendor_dir.join("bin");
    if target.join(ffmpeg_binary_name()).is_file() {
        return Ok(());
    }
    for entry in WalkDir::new(vendor_dir)
        .min_depth(2)
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if entry.file_type().is_dir()
            && entry.file_name() == "bin"
            && entry.path().join(ffmpeg_binary_name()).is_file()
        {
            fs::rename(entry.path(), &target)?;
            return Ok(());
        }
    }
    Err(ProvisionError::BinaryNotFound)
}

/// Prepends the vendored `bin` directory to the process search path. Runs
/// once during startup, before the runtime or any worker thread exists.
fn expose_on_search_path(location: &ToolLocation) {
    let ToolLocation::Vendored(binary) = location else {
        return;
    };
    let Some(bin_dir) = binary.parent() else {
        return;
    };
    let updated = search_path_with(bin_dir, env::var_os("PATH"));
    // SAFETY: single-threaded startup; no other thread reads the environment
    // until the runtime is created afterwards.
    unsafe { env::set_var("PATH", updated) };
    info!(dir = %bin_dir.display(), "vendored ffmpeg added to PATH");
}

fn search_path_with(dir: &Path, current: Option<OsString>) -> OsString {
    let mut paths = vec![dir.to_path_buf()];
    if let Some(current) = current {
        paths.extend(env::split_paths(&current));
    }
    env::join_paths(paths).unwrap_or_else(|_| dir.as_os_str().to_os_string())
}
