use std::fmt;
use std::path::PathBuf;

use crate::completion::CompletionError;

/// All errors that can occur in vidsum.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid video reference: \"{0}\" — expected a video URL or an 11-character video ID")]
    InvalidReference(String),

    #[error("transcript too short ({chars} characters, need at least {min}) — the video has no usable captions")]
    InsufficientContent { chars: usize, min: usize },

    #[error("no captions available for this video")]
    NoCaptions,

    #[error("error generating summary ({stage}): {source}")]
    Summarization {
        stage: Stage,
        #[source]
        source: CompletionError,
    },

    #[error("API key not found — set GROQ_API_KEY or pass an explicit key")]
    MissingApiKey,

    #[error("unsupported language hint: \"{0}\" — expected a tag like \"en\" or \"pt-BR\"")]
    UnsupportedLanguage(String),

    #[error("unknown summary style: \"{0}\" — use one of general, detailed, bullet_points, key_takeaways")]
    UnknownStyle(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("caption file not found: {path}")]
    CaptionsNotFound { path: PathBuf },

    #[error("config error in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[cfg(feature = "download")]
    #[error("download error: {0}")]
    Download(String),

    #[cfg(feature = "download")]
    #[error("yt-dlp not found — install with: pip install yt-dlp")]
    YtDlpNotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where in the summarization pipeline a completion call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The single call used for transcripts below the chunking threshold.
    Direct,
    /// A map-phase call. `index` is 1-based.
    Chunk { index: usize, total: usize },
    /// The merge call, when there are no section summaries to fall back on.
    Reduce,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Direct => write!(f, "direct summary"),
            Stage::Chunk { index, total } => write!(f, "chunk {index} of {total}"),
            Stage::Reduce => write!(f, "final summary"),
        }
    }
}

/// How a caller should present an error to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// The input has to change before trying again.
    CorrectInput,
    /// The remote service failed; retrying may help.
    Retry,
}

impl Error {
    /// Classify the error for user-facing presentation, if it falls into one
    /// of the known categories.
    pub fn hint(&self) -> Option<Hint> {
        match self {
            Error::InvalidReference(_)
            | Error::InsufficientContent { .. }
            | Error::NoCaptions
            | Error::CaptionsNotFound { .. } => Some(Hint::CorrectInput),
            Error::Summarization { .. } => Some(Hint::Retry),
            _ => None,
        }
    }

    /// The 1-based index of the chunk whose summarization failed, if any.
    pub fn failed_chunk(&self) -> Option<usize> {
        match self {
            Error::Summarization {
                stage: Stage::Chunk { index, .. },
                ..
            } => Some(*index),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
