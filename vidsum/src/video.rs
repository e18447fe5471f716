use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_-]{11}$").expect("valid regex"));

/// An id after `v=` or after a path separator, not followed by more id characters.
static EMBEDDED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})(?:[^0-9A-Za-z_-]|$)").expect("valid regex")
});

/// An 11-character video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Extract the id from a bare id or a video link.
    ///
    /// Handles `watch?v=`, `youtu.be/`, `embed/`, `shorts/` and `live/` links,
    /// with or without extra query parameters.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();

        if BARE_ID.is_match(reference) {
            return Ok(VideoId(reference.to_string()));
        }

        EMBEDDED_ID
            .captures(reference)
            .and_then(|caps| caps.get(1))
            .map(|m| VideoId(m.as_str().to_string()))
            .ok_or_else(|| Error::InvalidReference(reference.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch page for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VideoId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        VideoId::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    fn parsed(reference: &str) -> String {
        VideoId::parse(reference).unwrap().to_string()
    }

    #[test]
    fn test_bare_video_id() {
        assert_eq!(parsed(ID), ID);
        assert_eq!(parsed("  dQw4w9WgXcQ  "), ID);
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(parsed("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), ID);
    }

    #[test]
    fn test_watch_url_with_params() {
        assert_eq!(parsed("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=120"), ID);
        assert_eq!(
            parsed("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"),
            ID
        );
    }

    #[test]
    fn test_short_url() {
        assert_eq!(parsed("https://youtu.be/dQw4w9WgXcQ"), ID);
        assert_eq!(parsed("https://youtu.be/dQw4w9WgXcQ?si=abcdef"), ID);
    }

    #[test]
    fn test_embed_shorts_live() {
        assert_eq!(parsed("https://www.youtube.com/embed/dQw4w9WgXcQ"), ID);
        assert_eq!(parsed("https://www.youtube.com/shorts/dQw4w9WgXcQ"), ID);
        assert_eq!(parsed("https://www.youtube.com/live/dQw4w9WgXcQ?feature=share"), ID);
    }

    #[test]
    fn test_mobile_and_schemeless() {
        assert_eq!(parsed("https://m.youtube.com/watch?v=dQw4w9WgXcQ"), ID);
        assert_eq!(parsed("youtube.com/watch?v=dQw4w9WgXcQ"), ID);
    }

    #[test]
    fn test_longer_path_segment_is_not_an_id() {
        assert!(VideoId::parse("https://example.com/abcdefghijklmnop").is_err());
    }

    #[test]
    fn test_invalid_references() {
        for bad in ["", "not-a-valid-id", "hello world", "$(whoami)", "https://example.com/"] {
            let err = VideoId::parse(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidReference(_)), "{bad:?}");
        }
    }

    #[test]
    fn test_canonical_watch_url() {
        let id: VideoId = "https://youtu.be/dQw4w9WgXcQ".parse().unwrap();
        assert_eq!(id.as_str(), ID);
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }
}
