use std::path::PathBuf;

/// Quality tier selected in the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quality {
    High,
    Medium,
    Low,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::High, Quality::Medium, Quality::Low];

    /// Label shown in the quality dropdown.
    pub fn label(self) -> &'static str {
        match self {
            Quality::High => "Alta",
            Quality::Medium => "Média",
            Quality::Low => "Baixa",
        }
    }
}

/// Output container selected in the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Video container (muxed video+audio).
    Mp4,
    /// Audio only, transcoded to mp3.
    Mp3,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Mp4, OutputFormat::Mp3];

    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mp3 => "mp3",
        }
    }
}

/// Everything the orchestrator needs to run one download.
/// Built from the form fields and immutable once submitted.
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    pub url: String,
    pub quality: Quality,
    pub format: OutputFormat,
    /// Destination directory chosen by the user.
    pub folder: PathBuf,
}

/// Event sent from the download task back to the UI thread.
#[derive(Clone, Debug, PartialEq)]
pub enum DownloadEvent {
    /// Intermediate progress update.
    Progress {
        /// Percent complete, 0.0 to 100.0.
        percent: f32,
        /// Human-readable rate/ETA summary.
        detail: String,
    },
    /// Terminal: the file is on disk.
    Finished,
    /// Terminal: the download failed with the given message.
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_labels_match_the_dropdown() {
        assert_eq!(Quality::High.label(), "Alta");
        assert_eq!(Quality::Medium.label(), "Média");
        assert_eq!(Quality::Low.label(), "Baixa");
    }

    #[test]
    fn format_labels_match_the_dropdown() {
        assert_eq!(OutputFormat::Mp4.label(), "mp4");
        assert_eq!(OutputFormat::Mp3.label(), "mp3");
    }
}
