//! Parses the structured progress lines emitted by the extractor.
//!
//! The orchestrator passes a `--progress-template` so yt-dlp prints
//! `PROGRESS|downloaded|total|total_estimate|speed|eta` per update, with
//! `NA` for fields it does not know yet. Percent is computed from the byte
//! counts; the display percent string yt-dlp renders is never scraped.

const LINE_PREFIX: &str = "PROGRESS|";

/// One decoded progress line.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressUpdate {
    /// Percent complete, clamped to 0.0..=100.0.
    pub percent: f32,
    /// Rate/ETA summary shown in the status label.
    pub detail: String,
}

/// Decodes a single stdout line. Lines that are not progress-template lines,
/// or that carry no usable byte total, yield `None`.
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let rest = line.trim().strip_prefix(LINE_PREFIX)?;
    let mut fields = rest.split('|');

    let downloaded = parse_field(fields.next()?)?;
    let total = parse_field(fields.next()?);
    let estimate = parse_field(fields.next()?);
    let speed = fields.next().and_then(parse_field);
    let eta = fields.next().and_then(parse_field);

    // Prefer the exact total; fall back to yt-dlp's estimate.
    let total = total.or(estimate).filter(|t| *t > 0.0)?;
    let percent = ((downloaded / total) * 100.0).clamp(0.0, 100.0) as f32;

    Some(ProgressUpdate {
        percent,
        detail: format!(
            "Velocidade: {} | Tempo restante: {}",
            format_rate(speed),
            format_eta(eta)
        ),
    })
}

fn parse_field(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "NA" {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Renders a bytes-per-second rate, or "--" when unknown.
fn format_rate(speed: Option<f64>) -> String {
    match speed {
        Some(bytes) if bytes >= 1024.0 * 1024.0 => {
            format!("{:.1} MiB/s", bytes / (1024.0 * 1024.0))
        }
        Some(bytes) if bytes >= 1024.0 => format!("{:.1} KiB/s", bytes / 1024.0),
        Some(bytes) => format!("{:.0} B/s", bytes),
        None => "--".to_string(),
    }
}

fn format_eta(eta: Option<f64>) -> String {
    match eta {
        Some(seconds) => format!("{}s", seconds.round() as u64),
        None => "--".to_string(),
    }
}
