use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

pub mod tracks;
pub mod youtube;

pub use tracks::{select_track, CaptionTrack};
pub use youtube::YoutubeExtractor;

use crate::Result;

/// Length of a YouTube video id
pub const VIDEO_ID_LEN: usize = 11;

/// Canonical 11-character YouTube video id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Accept a bare id made of exactly 11 characters from `[a-zA-Z0-9_-]`
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == VIDEO_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VideoId {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        VideoId::parse(&value).ok_or_else(|| format!("invalid video id: {}", value))
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

fn video_id_regex() -> &'static Regex {
    static VIDEO_ID_REGEX: OnceLock<Regex> = OnceLock::new();
    VIDEO_ID_REGEX.get_or_init(|| {
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)([a-zA-Z0-9_-]{11})")
            .expect("Failed to compile video id regex")
    })
}

/// Extract the video id from a page location.
///
/// Recognises `youtube.com/watch?v=<id>` and the `youtu.be/<id>` short form.
/// Anything else is not a watch page and yields `None`.
pub fn extract_video_id(location: &str) -> Option<VideoId> {
    video_id_regex()
        .captures(location)
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId(m.as_str().to_string()))
}

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_watch_url() {
        let id = extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");

        let id = extract_video_id("https://m.youtube.com/watch?v=a_b-C1d2E3f").unwrap();
        assert_eq!(id.as_str(), "a_b-C1d2E3f");
    }

    #[test]
    fn test_extract_short_url() {
        let id = extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc").unwrap();
        assert_eq!(id.to_string(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_extract_takes_first_eleven_characters() {
        let id = extract_video_id("https://youtu.be/dQw4w9WgXcQextra").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_extract_rejects_other_pages() {
        assert!(extract_video_id("https://www.youtube.com/").is_none());
        assert!(extract_video_id("https://www.youtube.com/feed/subscriptions").is_none());
        assert!(extract_video_id("https://www.youtube.com/watch?list=PL123&v=dQw4w9WgXcQ").is_none());
        assert!(extract_video_id("https://youtu.be/short").is_none());
        assert!(extract_video_id("https://vimeo.com/123456789").is_none());
        assert!(extract_video_id("").is_none());
    }

    #[test]
    fn test_video_id_parse() {
        assert!(VideoId::parse("dQw4w9WgXcQ").is_some());
        assert!(VideoId::parse("dQw4w9WgXc").is_none());
        assert!(VideoId::parse("dQw4w9WgXc!").is_none());

        let id: VideoId = serde_json::from_str("\"dQw4w9WgXcQ\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"dQw4w9WgXcQ\"");
        assert!(serde_json::from_str::<VideoId>("\"nope\"").is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://www.youtube.com/watch").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("not-a-url").is_err());
    }
}
