//! Video link detection in message bodies.

use std::sync::OnceLock;

use regex::Regex;

/// Provider name stored for YouTube links.
pub const YOUTUBE: &str = "youtube";

fn youtube_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"\b(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:[^\s#]*&)?v=|embed/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
            )
            .ok()
        })
        .as_ref()
}

/// Extract the first YouTube video ID from `text`.
pub fn youtube_video_id(text: &str) -> Option<String> {
    youtube_pattern()?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Whether `id` has the shape of a YouTube video ID.
pub fn is_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
