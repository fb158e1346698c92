//! Thumbnail preview for the pasted video URL.

use eframe::egui::ColorImage;

/// Extracts the `v` parameter from a YouTube URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    url.split("v=")
        .nth(1)
        .and_then(|s| s.split('&').next())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Fetches and decodes the standard high-quality thumbnail for a video.
/// Runs on a blocking task; returns `None` on any network or decode error.
pub fn fetch_thumbnail(video_id: &str) -> Option<ColorImage> {
    let url = format!("https://img.youtube.com/vi/{}/hqdefault.jpg", video_id);
    let resp = reqwest::blocking::get(&url).ok()?.bytes().ok()?;
    let img = image::load_from_memory(&resp).ok()?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, &img))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_v_parameter() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn drops_trailing_query_parameters() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=abc123&t=42s"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn urls_without_a_video_id_yield_none() {
        assert_eq!(extract_video_id("https://example.com/clip.mp4"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v="), None);
    }
}
