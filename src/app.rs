//! Headless state machine behind the form: validation, the single
//! in-flight gate, and how download events reshape the UI.

use std::path::PathBuf;

use tracing::debug;

use crate::model::{DownloadEvent, DownloadRequest, OutputFormat, Quality};

/// Modal dialog queued for the UI thread to show.
#[derive(Clone, Debug, PartialEq)]
pub enum Dialog {
    Warning(String),
    Error(String),
    Success(String),
}

/// Everything the form renders and mutates. All mutation happens on the UI
/// thread; the download task only talks to this through `DownloadEvent`s.
pub struct UiState {
    pub url_input: String,
    pub folder_input: String,
    pub quality: Quality,
    pub format: OutputFormat,
    /// Percent complete, 0.0 to 100.0.
    pub progress: f32,
    pub status: String,
    pub in_flight: bool,
    dialog: Option<Dialog>,
    default_folder: PathBuf,
}

impl UiState {
    pub fn new(default_folder: PathBuf) -> Self {
        Self {
            url_input: String::new(),
            folder_input: default_folder.display().to_string(),
            quality: Quality::High,
            format: OutputFormat::Mp4,
            progress: 0.0,
            status: "Pronto para download".to_string(),
            in_flight: false,
            dialog: None,
            default_folder,
        }
    }

    /// Validates the form and, if it passes, flips to the in-flight state
    /// and returns the request for the caller to spawn. While a download is
    /// running this is a no-op.
    pub fn submit(&mut self) -> Option<DownloadRequest> {
        if self.in_flight {
            return None;
        }

        let url = self.url_input.trim();
        if url.is_empty() {
            self.dialog = Some(Dialog::Warning("Insira o link do vídeo.".to_string()));
            return None;
        }

        let folder = if self.folder_input.trim().is_empty() {
            self.default_folder.clone()
        } else {
            PathBuf::from(self.folder_input.trim())
        };

        self.in_flight = true;
        self.progress = 0.0;
        self.status = "Iniciando download...".to_string();

        Some(DownloadRequest {
            url: url.to_string(),
            quality: self.quality,
            format: self.format,
            folder,
        })
    }

    /// Applies one event from the download task.
    pub fn apply_event(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Progress { percent, detail } => {
                debug!(percent, "progress");
                // Progress never moves backwards mid-download.
                if percent > self.progress {
                    self.progress = percent;
                }
                self.status = detail;
            }
            DownloadEvent::Finished => {
                self.progress = 100.0;
                self.status = "Download concluído com sucesso!".to_string();
                self.in_flight = false;
                self.dialog = Some(Dialog::Success(format!(
                    "Download concluído em:\n{}",
                    self.folder_input
                )));
            }
            DownloadEvent::Failed(message) => {
                self.progress = 0.0;
                self.status = "Erro no download".to_string();
                self.in_flight = false;
                self.dialog = Some(Dialog::Error(format!("Erro ao baixar vídeo:\n{message}")));
            }
        }
    }

    /// Takes the pending modal, if any. The caller owns showing it.
    pub fn take_dialog(&mut self) -> Option<Dialog> {
        self.dialog.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::selector;

    fn state_with_url(url: &str) -> UiState {
        let mut state = UiState::new(PathBuf::from("/tmp/downloads"));
        state.url_input = url.to_string();
        state
    }

    #[test]
    fn scenario_a_high_quality_video_completes() {
        let mut state = state_with_url("https://video/x");
        state.quality = Quality::High;
        state.format = OutputFormat::Mp4;

        let request = state.submit().expect("valid request");
        assert_eq!(selector(request.format, request.quality), "bestvideo+bestaudio");
        assert!(state.in_flight);

        state.apply_event(DownloadEvent::Finished);
        assert_eq!(state.progress, 100.0);
        assert!(state.status.contains("Download concluído"));
        assert!(!state.in_flight);
        assert!(matches!(state.take_dialog(), Some(Dialog::Success(_))));
    }

    #[test]
    fn scenario_b_empty_url_never_starts_a_task() {
        let mut state = state_with_url("   ");
        assert!(state.submit().is_none());
        assert!(!state.in_flight);
        assert_eq!(
            state.take_dialog(),
            Some(Dialog::Warning("Insira o link do vídeo.".to_string()))
        );
    }

    #[test]
    fn scenario_c_failure_resets_and_surfaces_the_message() {
        let mut state = state_with_url("https://video/x");
        state.submit().unwrap();
        state.apply_event(DownloadEvent::Progress {
            percent: 40.0,
            detail: "Velocidade: 1.0 MiB/s | Tempo restante: 10s".to_string(),
        });

        state.apply_event(DownloadEvent::Failed("Network unreachable".to_string()));
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.status, "Erro no download");
        assert!(!state.in_flight);
        match state.take_dialog() {
            Some(Dialog::Error(message)) => assert!(message.contains("Network unreachable")),
            other => panic!("expected an error dialog, got {:?}", other),
        }
        // Trigger is usable again.
        state.url_input = "https://video/y".to_string();
        assert!(state.submit().is_some());
    }

    #[test]
    fn resubmitting_while_in_flight_is_a_no_op() {
        let mut state = state_with_url("https://video/x");
        assert!(state.submit().is_some());
        assert!(state.submit().is_none());
        assert!(state.take_dialog().is_none(), "no warning for the gated attempt");

        state.apply_event(DownloadEvent::Finished);
        assert!(state.submit().is_some(), "re-enabled after the terminal event");
    }

    #[test]
    fn progress_is_monotonic_within_a_download() {
        let mut state = state_with_url("https://video/x");
        state.submit().unwrap();
        state.apply_event(DownloadEvent::Progress {
            percent: 50.0,
            detail: "a".to_string(),
        });
        state.apply_event(DownloadEvent::Progress {
            percent: 30.0,
            detail: "b".to_string(),
        });
        assert_eq!(state.progress, 50.0);
        assert_eq!(state.status, "b", "status still follows the latest event");
    }

    #[test]
    fn empty_folder_falls_back_to_the_default() {
        let mut state = state_with_url("https://video/x");
        state.folder_input = String::new();
        let request = state.submit().unwrap();
        assert_eq!(request.folder, PathBuf::from("/tmp/downloads"));
    }
}
