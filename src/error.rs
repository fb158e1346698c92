use thiserror::Error;

/// Errors raised while ensuring the conversion tool is available.
/// None of these abort startup; the app degrades to video-only capability.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("ffmpeg binary not found in the extracted archive")]
    BinaryNotFound,

    #[error("managed ffmpeg download is only supported on Windows")]
    UnsupportedPlatform,
}

/// Errors raised inside a download task. Every variant is converted into a
/// `DownloadEvent::Failed` before the task ends; nothing propagates silently.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("yt-dlp não encontrado no sistema")]
    MissingExtractor,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Extractor(String),
}
