use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Language;
use crate::error::{Error, Result};

/// Maximum characters of yt-dlp stderr carried into an error message.
const MAX_STDERR_CHARS: usize = 1000;

/// Caption track downloaded for one video.
#[derive(Debug, Clone)]
pub struct CaptionDownload {
    /// Raw WebVTT contents.
    pub vtt: String,
    pub track: CaptionTrack,
    pub title: Option<String>,
    pub video_id: Option<String>,
}

/// A caption track offered by the video host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    /// Track name as yt-dlp reports it ("en", "en-US", "de-orig").
    pub language: String,
    /// Auto-generated by speech recognition rather than uploaded.
    pub automatic: bool,
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: Option<String>,
    title: Option<String>,
    subtitles: Option<BTreeMap<String, IgnoredAny>>,
    automatic_captions: Option<BTreeMap<String, IgnoredAny>>,
}

impl YtDlpInfo {
    fn manual_tracks(&self) -> impl Iterator<Item = &str> {
        self.subtitles
            .iter()
            .flat_map(|m| m.keys())
            .map(String::as_str)
            // streams list their chat replay among the subtitles
            .filter(|name| *name != "live_chat")
    }

    fn automatic_tracks(&self) -> impl Iterator<Item = &str> {
        self.automatic_captions
            .iter()
            .flat_map(|m| m.keys())
            .map(String::as_str)
    }
}

/// Validate that a string looks like a URL.
/// Rejects anything that isn't http:// or https://.
fn validate_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Ok(())
    } else {
        Err(Error::Download(format!(
            "invalid URL (must start with http:// or https://): {trimmed}"
        )))
    }
}

/// Pick the caption track to download.
///
/// Order: manual track in the requested language, automatic track in the
/// requested language, then any manual track, then any automatic track. An
/// exact language match beats a regional variant.
fn select_track(info: &YtDlpInfo, language: &Language) -> Option<CaptionTrack> {
    let best_match = |tracks: Vec<&str>| -> Option<String> {
        tracks
            .iter()
            .find(|t| t.eq_ignore_ascii_case(language.code()))
            .or_else(|| tracks.iter().find(|t| language.matches_track(t)))
            .map(|t| t.to_string())
    };

    if let Some(name) = best_match(info.manual_tracks().collect()) {
        return Some(CaptionTrack {
            language: name,
            automatic: false,
        });
    }
    if let Some(name) = best_match(info.automatic_tracks().collect()) {
        return Some(CaptionTrack {
            language: name,
            automatic: true,
        });
    }

    let fallback = info
        .manual_tracks()
        .next()
        .map(|name| CaptionTrack {
            language: name.to_string(),
            automatic: false,
        })
        .or_else(|| {
            // automatic captions include machine translations into every
            // language; the "-orig" track is the one actually transcribed
            info.automatic_tracks()
                .find(|name| name.ends_with("-orig"))
                .or_else(|| info.automatic_tracks().next())
                .map(|name| CaptionTrack {
                    language: name.to_string(),
                    automatic: true,
                })
        });

    if let Some(track) = &fallback {
        warn!(
            requested = %language,
            using = %track.language,
            automatic = track.automatic,
            "no captions in requested language, falling back"
        );
    }
    fallback
}

/// Download the best caption track for `url` into `output_dir` using yt-dlp.
///
/// # Security
/// - URL is validated to start with http:// or https://
/// - Arguments are passed to yt-dlp via `.arg()` (no shell expansion)
/// - `--no-exec` prevents yt-dlp from running post-processing commands
/// - The caption file path is validated to be inside output_dir
pub async fn download_captions(
    url: &str,
    language: &Language,
    output_dir: &Path,
) -> Result<CaptionDownload> {
    validate_url(url)?;

    info!(%url, %language, "fetching captions");

    let check = tokio::process::Command::new("yt-dlp")
        .arg("--version")
        .output()
        .await;

    if check.is_err() {
        return Err(Error::YtDlpNotFound);
    }

    tokio::fs::create_dir_all(output_dir).await?;

    let output_template = output_dir
        .join("%(id)s.%(ext)s")
        .to_str()
        .ok_or_else(|| Error::Download("output directory path contains invalid UTF-8".into()))?
        .to_string();

    let info_output = tokio::process::Command::new("yt-dlp")
        .args(["--dump-json", "--no-download", "--no-exec", "--no-playlist"])
        .arg(url)
        .output()
        .await?;

    if !info_output.status.success() {
        return Err(Error::Download(format!(
            "yt-dlp failed to read video info: {}",
            truncate_stderr(&info_output.stderr)
        )));
    }

    let info: YtDlpInfo = serde_json::from_slice(&info_output.stdout)?;
    let track = select_track(&info, language).ok_or(Error::NoCaptions)?;

    debug!(
        track = %track.language,
        automatic = track.automatic,
        "caption track selected"
    );

    let write_flag = if track.automatic {
        "--write-auto-subs"
    } else {
        "--write-subs"
    };

    let output = tokio::process::Command::new("yt-dlp")
        .args([
            "--skip-download",
            write_flag,
            "--sub-format",
            "vtt",
            "--sub-langs",
            &track.language,
            "--no-playlist",
            "--no-exec",
            "--output",
            &output_template,
        ])
        .arg(url)
        .output()
        .await?;

    if !output.status.success() {
        return Err(Error::Download(format!(
            "yt-dlp failed: {}",
            truncate_stderr(&output.stderr)
        )));
    }

    let caption_path = find_caption_file(output_dir)?.ok_or(Error::NoCaptions)?;
    validate_path_in_dir(&caption_path, output_dir)?;

    let vtt = tokio::fs::read_to_string(&caption_path).await?;

    debug!(path = %caption_path.display(), bytes = vtt.len(), "captions downloaded");

    Ok(CaptionDownload {
        vtt,
        track,
        title: info.title,
        video_id: info.id,
    })
}

fn truncate_stderr(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .trim()
        .chars()
        .take(MAX_STDERR_CHARS)
        .collect()
}

/// Normalize a path by resolving `.` and `..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir => {}
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}

/// Validate that a path is inside the expected directory (prevents path traversal).
fn validate_path_in_dir(path: &Path, expected_dir: &Path) -> Result<()> {
    let canonical_dir = expected_dir
        .canonicalize()
        .unwrap_or_else(|_| normalize_path(expected_dir));
    let canonical_path = path
        .canonicalize()
        .unwrap_or_else(|_| normalize_path(path));

    if canonical_path.starts_with(&canonical_dir) {
        Ok(())
    } else {
        warn!(
            path = %path.display(),
            expected_dir = %expected_dir.display(),
            "caption file path outside expected directory"
        );
        Err(Error::Download(
            "caption file path is outside the expected output directory".into(),
        ))
    }
}

/// Find the most recently modified `.vtt` file in a directory.
fn find_caption_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut best: Option<(PathBuf, std::time::SystemTime)> = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_vtt = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("vtt"));
        if !is_vtt {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            if best.as_ref().is_none_or(|(_, t)| modified > *t) {
                best = Some((path, modified));
            }
        }
    }

    Ok(best.map(|(p, _)| p))
}
