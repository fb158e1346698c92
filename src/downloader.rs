//! Runs one download on a background task and reports back through events.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
    sync::mpsc::UnboundedSender,
};
use tracing::{info, warn};

use crate::error::DownloadError;
use crate::model::{DownloadEvent, DownloadRequest, OutputFormat, Quality};
use crate::progress::parse_progress_line;

/// Structured template so progress arrives as numeric byte counts instead of
/// a rendered percent string.
const PROGRESS_TEMPLATE: &str = "download:PROGRESS|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress.speed)s|%(progress.eta)s";

fn extractor_binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    }
}

/// Locates the yt-dlp executable on the search path.
pub fn resolve_extractor() -> Result<PathBuf, DownloadError> {
    which::which(extractor_binary_name()).map_err(|_| DownloadError::MissingExtractor)
}

/// Maps the user's quality/format choice to the extractor's stream selector.
pub fn selector(format: OutputFormat, quality: Quality) -> &'static str {
    match (format, quality) {
        (OutputFormat::Mp4, Quality::High) => "bestvideo+bestaudio",
        (OutputFormat::Mp4, Quality::Medium) => "best[height<=480]",
        (OutputFormat::Mp4, Quality::Low) => "worst",
        (OutputFormat::Mp3, _) => "bestaudio",
    }
}

/// Builds the full extractor command line for a request.
pub fn build_args(request: &DownloadRequest) -> Vec<String> {
    let output_template = request
        .folder
        .join("%(title)s.%(ext)s")
        .to_string_lossy()
        .into_owned();

    let mut args = vec![
        "-f".to_owned(),
        selector(request.format, request.quality).to_owned(),
        "--newline".to_owned(),
        "--no-playlist".to_owned(),
        "--progress-template".to_owned(),
        PROGRESS_TEMPLATE.to_owned(),
        "-o".to_owned(),
        output_template,
    ];

    match request.format {
        // Prefer the common container when muxing video+audio.
        OutputFormat::Mp4 => {
            args.push("--merge-output-format".to_owned());
            args.push("mp4".to_owned());
        }
        // Audio-only: extract and transcode to mp3 at a fixed bitrate.
        OutputFormat::Mp3 => {
            args.push("-x".to_owned());
            args.push("--audio-format".to_owned());
            args.push("mp3".to_owned());
            args.push("--audio-quality".to_owned());
            args.push("192K".to_owned());
        }
    }

    args.push(request.url.clone());
    args
}

/// Drives one download to completion. Always sends exactly one terminal
/// event; every internal error becomes a `Failed` event.
pub async fn run_download(
    bin: PathBuf,
    request: DownloadRequest,
    tx: UnboundedSender<DownloadEvent>,
) {
    info!(url = %request.url, selector = selector(request.format, request.quality), "starting download");
    match try_download(&bin, &request, &tx).await {
        Ok(()) => {
            info!(url = %request.url, "download finished");
            let _ = tx.send(DownloadEvent::Finished);
        }
        Err(err) => {
            warn!(url = %request.url, error = %err, "download failed");
            let _ = tx.send(DownloadEvent::Failed(err.to_string()));
        }
    }
}

async fn try_download(
    bin: &Path,
    request: &DownloadRequest,
    tx: &UnboundedSender<DownloadEvent>,
) -> Result<(), DownloadError> {
    let mut child = Command::new(bin)
        .args(build_args(request))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::Extractor("falha ao capturar a saída do yt-dlp".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::Extractor("falha ao capturar a saída do yt-dlp".into()))?;

    // Keep the last stderr line around as the failure message.
    let stderr_tail = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail: Option<String> = None;
        while let Ok(Some(line)) = lines.next_line().await {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                tail = Some(trimmed.to_string());
            }
        }
        tail
    });

    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(update) = parse_progress_line(&line) {
            let _ = tx.send(DownloadEvent::Progress {
                percent: update.percent,
                detail: update.detail,
            });
        }
    }

    let status = child.wait().await?;
    let tail = stderr_tail.await.unwrap_or(None);
    if status.success() {
        Ok(())
    } else {
        Err(DownloadError::Extractor(tail.unwrap_or_else(|| {
            "yt-dlp terminou com erro".to_string()
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn request(format: OutputFormat, quality: Quality) -> DownloadRequest {
        DownloadRequest {
            url: "https://video/x".to_string(),
            quality,
            format,
            folder: PathBuf::from("/tmp/videos"),
        }
    }

    #[test]
    fn selector_table_is_reproduced_exactly() {
        assert_eq!(selector(OutputFormat::Mp4, Quality::High), "bestvideo+bestaudio");
        assert_eq!(selector(OutputFormat::Mp4, Quality::Medium), "best[height<=480]");
        assert_eq!(selector(OutputFormat::Mp4, Quality::Low), "worst");
        for quality in Quality::ALL {
            assert_eq!(selector(OutputFormat::Mp3, quality), "bestaudio");
        }
    }

    #[test]
    fn video_args_prefer_the_mp4_container() {
        let args = build_args(&request(OutputFormat::Mp4, Quality::High));
        let selector_pos = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[selector_pos + 1], "bestvideo+bestaudio");
        let merge_pos = args.iter().position(|a| a == "--merge-output-format").unwrap();
        assert_eq!(args[merge_pos + 1], "mp4");
        assert!(!args.contains(&"-x".to_string()));
    }

    #[test]
    fn audio_args_carry_the_transcode_directive() {
        let args = build_args(&request(OutputFormat::Mp3, Quality::Medium));
        assert!(args.contains(&"-x".to_string()));
        let fmt_pos = args.iter().position(|a| a == "--audio-format").unwrap();
        assert_eq!(args[fmt_pos + 1], "mp3");
        let quality_pos = args.iter().position(|a| a == "--audio-quality").unwrap();
        assert_eq!(args[quality_pos + 1], "192K");
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn output_template_lands_in_the_chosen_folder_and_url_comes_last() {
        let args = build_args(&request(OutputFormat::Mp4, Quality::Low));
        let out_pos = args.iter().position(|a| a == "-o").unwrap();
        assert!(args[out_pos + 1].ends_with("%(title)s.%(ext)s"));
        assert!(args[out_pos + 1].contains("videos"));
        assert_eq!(args.last().unwrap(), "https://video/x");
    }

    #[test]
    fn progress_template_uses_structured_byte_fields() {
        let args = build_args(&request(OutputFormat::Mp4, Quality::High));
        let template_pos = args.iter().position(|a| a == "--progress-template").unwrap();
        let template = &args[template_pos + 1];
        assert!(template.contains("%(progress.downloaded_bytes)s"));
        assert!(template.contains("%(progress.total_bytes)s"));
        assert!(!template.contains("_percent_str"));
    }

    #[tokio::test]
    async fn spawn_failure_becomes_a_single_failed_event() {
        let (tx, mut rx) = unbounded_channel();
        run_download(
            PathBuf::from("/definitely/not/here/yt-dlp"),
            request(OutputFormat::Mp4, Quality::High),
            tx,
        )
        .await;

        match rx.recv().await {
            Some(DownloadEvent::Failed(_)) => {}
            other => panic!("expected a failure event, got {:?}", other),
        }
        assert!(rx.recv().await.is_none(), "exactly one terminal event");
    }
}
