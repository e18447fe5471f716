//! Video summarization library — link in, captions fetched, summary out.
//!
//! **vidsum** fetches a video's caption track (via yt-dlp), strips the caption
//! markup down to plain text, and summarizes it with a chat-completion model.
//! Transcripts too long for one call are split into word-aligned chunks,
//! summarized chunk by chunk, and merged by a final call.
//!
//! # Quick start
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> vidsum::Result<()> {
//! use vidsum::{SummarizeOptions, SummaryStyle};
//!
//! // Reads the API key from GROQ_API_KEY
//! let options = SummarizeOptions::new().style(SummaryStyle::BulletPoints);
//! let result = vidsum::summarize_video("https://youtu.be/dQw4w9WgXcQ", &options).await?;
//! println!("{}", result.summary.text);
//! # Ok(())
//! # }
//! ```
//!
//! Any backend can be plugged in by implementing [`TextCompletionPort`] and
//! calling [`summarize_transcript`] or [`summarize`].

pub mod captions;
pub mod chunk;
pub mod completion;
pub mod config;
#[cfg(feature = "download")]
pub(crate) mod download;
pub mod error;
pub mod prompt;
pub(crate) mod summarize;
pub mod types;
pub mod video;

pub use completion::{ChatCompletionClient, CompletionError, TextCompletionPort};
pub use config::{FileConfig, Language, SummarizeOptions, SummaryStyle};
pub use error::{Error, Hint, Result, Stage};
pub use summarize::summarize;
pub use types::{Summary, SummaryQuality, SummaryStats, Transcript, VideoSummary};
pub use video::VideoId;

use std::path::Path;

use tracing::info;

/// Fetch and clean the captions of a video.
///
/// `reference` is a video link or a bare video id. Fails with
/// [`Error::InsufficientContent`] when the cleaned captions are shorter than
/// `options.min_transcript_chars`.
#[cfg(feature = "download")]
pub async fn fetch_transcript(reference: &str, options: &SummarizeOptions) -> Result<Transcript> {
    let id = VideoId::parse(reference)?;
    let url = id.watch_url();

    // A unique temp directory per invocation so concurrent runs
    // (even within the same process) don't collide.
    let tmp_dir = std::env::temp_dir().join(format!(
        "vidsum-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));
    let _cleanup = TempDirGuard(&tmp_dir);

    let fetched = download::download_captions(&url, &options.language, &tmp_dir).await?;
    let text = captions::normalize(
        &captions::cue_text(&fetched.vtt),
        options.min_transcript_chars,
    )?;

    let transcript = Transcript {
        text,
        language: fetched.track.language,
        video_id: Some(fetched.video_id.unwrap_or_else(|| id.to_string())),
        source_url: Some(url),
        source_title: fetched.title,
    };

    info!(
        chars = transcript.char_count(),
        words = transcript.word_count(),
        language = %transcript.language,
        "transcript ready"
    );

    Ok(transcript)
}

/// Load a transcript from a local caption file.
///
/// WebVTT and SubRip files are reduced to their cue text first; anything
/// else is treated as plain text.
pub fn transcript_from_file(
    path: impl AsRef<Path>,
    options: &SummarizeOptions,
) -> Result<Transcript> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::CaptionsNotFound {
            path: path.to_path_buf(),
        });
    }

    let raw = std::fs::read_to_string(path)?;
    let is_caption_file = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("vtt") || ext.eq_ignore_ascii_case("srt"))
        || raw.trim_start_matches('\u{feff}').starts_with("WEBVTT");

    let raw = if is_caption_file {
        captions::cue_text(&raw)
    } else {
        raw
    };
    let text = captions::normalize(&raw, options.min_transcript_chars)?;

    info!(path = %path.display(), chars = text.chars().count(), "transcript loaded");

    let mut transcript = Transcript::from_text(text, options.language.code());
    transcript.source_title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned());
    Ok(transcript)
}

/// Summarize an already-fetched transcript.
pub async fn summarize_transcript<P>(
    transcript: Transcript,
    options: &SummarizeOptions,
    port: &P,
) -> Result<VideoSummary>
where
    P: TextCompletionPort + ?Sized,
{
    let summary = summarize(&transcript.text, port, options).await?;
    let result = VideoSummary::new(transcript, summary);

    info!(
        quality = ?result.summary.quality,
        summary_words = result.stats.summary_words,
        compression_percent = result.stats.compression_percent,
        "summary complete"
    );

    Ok(result)
}

/// Fetch a video's captions and summarize them with the given completion backend.
#[cfg(feature = "download")]
pub async fn summarize_video_with<P>(
    reference: &str,
    options: &SummarizeOptions,
    port: &P,
) -> Result<VideoSummary>
where
    P: TextCompletionPort + ?Sized,
{
    let transcript = fetch_transcript(reference, options).await?;
    summarize_transcript(transcript, options, port).await
}

/// Fetch a video's captions and summarize them with the chat-completion API
/// configured in `options`.
#[cfg(feature = "download")]
pub async fn summarize_video(reference: &str, options: &SummarizeOptions) -> Result<VideoSummary> {
    // Fail on a missing key before spending time on the download
    let client = ChatCompletionClient::from_options(options)?;
    summarize_video_with(reference, options, &client).await
}

/// RAII guard that removes an entire temp directory when dropped.
#[cfg(feature = "download")]
struct TempDirGuard<'a>(&'a std::path::Path);

#[cfg(feature = "download")]
impl Drop for TempDirGuard<'_> {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = std::fs::remove_dir_all(self.0) {
                tracing::warn!(path = %self.0.display(), error = %e, "failed to clean up temp dir");
            }
        }
    }
}
