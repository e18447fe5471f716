use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::completion::{DEFAULT_API_URL, DEFAULT_MODEL};
use crate::error::{Error, Result};

/// Transcripts longer than this many characters are summarized chunk by chunk.
pub const DEFAULT_OVERSIZED_THRESHOLD: usize = 3000;
/// Maximum characters per chunk in the map phase.
pub const DEFAULT_CHUNK_MAX_CHARS: usize = 2500;
/// Token budget for each map-phase call.
pub const DEFAULT_CHUNK_MAX_TOKENS: u32 = 300;
/// Token budget for the direct call and the reduce call.
pub const DEFAULT_FINAL_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
/// Cleaned captions shorter than this are treated as "no usable captions".
pub const DEFAULT_MIN_TRANSCRIPT_CHARS: usize = 50;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable consulted when no API key is configured explicitly.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

static LANGUAGE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("valid regex"));

/// Summary style. Selects prompt wording only; every style runs the same pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStyle {
    /// Balanced overview.
    #[default]
    General,
    /// Comprehensive summary with key points and main topics.
    Detailed,
    /// Main topics as a bullet list.
    #[serde(alias = "bullet-points")]
    BulletPoints,
    /// Main insights and takeaways.
    #[serde(alias = "key-takeaways")]
    KeyTakeaways,
}

impl SummaryStyle {
    pub const ALL: [SummaryStyle; 4] = [
        SummaryStyle::General,
        SummaryStyle::Detailed,
        SummaryStyle::BulletPoints,
        SummaryStyle::KeyTakeaways,
    ];

    /// Identifier as used in config files and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            SummaryStyle::General => "general",
            SummaryStyle::Detailed => "detailed",
            SummaryStyle::BulletPoints => "bullet_points",
            SummaryStyle::KeyTakeaways => "key_takeaways",
        }
    }

    /// Human-readable title.
    pub fn label(&self) -> &'static str {
        match self {
            SummaryStyle::General => "General Summary",
            SummaryStyle::Detailed => "Detailed Summary",
            SummaryStyle::BulletPoints => "Bullet Points",
            SummaryStyle::KeyTakeaways => "Key Takeaways",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SummaryStyle::General => "Balanced overview",
            SummaryStyle::Detailed => "Comprehensive summary",
            SummaryStyle::BulletPoints => "Key points listed",
            SummaryStyle::KeyTakeaways => "Main insights",
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SummaryStyle {
    type Err = Error;

    /// Accepts both `bullet_points` and `bullet-points` spellings.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        SummaryStyle::ALL
            .into_iter()
            .find(|style| style.name() == normalized)
            .ok_or_else(|| Error::UnknownStyle(s.to_string()))
    }
}

/// A caption language hint passed to the caption fetcher.
///
/// Holds a short language tag such as "en", "de" or "pt-BR". The primary
/// subtag is lowercased; region and script subtags keep their case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language(String);

impl Language {
    pub fn new(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        if !LANGUAGE_TAG.is_match(tag) {
            return Err(Error::UnsupportedLanguage(tag.to_string()));
        }

        let normalized = match tag.split_once('-') {
            Some((primary, rest)) => format!("{}-{rest}", primary.to_lowercase()),
            None => tag.to_lowercase(),
        };
        Ok(Language(normalized))
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Whether a caption track name is this language or a regional variant of it
    /// ("en" matches "en", "en-US" and "en-GB").
    pub fn matches_track(&self, track: &str) -> bool {
        let track = track.to_lowercase();
        let code = self.0.to_lowercase();
        track == code || track.starts_with(&format!("{code}-"))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for Language {
    fn default() -> Self {
        Language("en".into())
    }
}

/// Builder for summarization options.
#[derive(Debug, Clone)]
pub struct SummarizeOptions {
    pub style: SummaryStyle,
    pub language: Language,
    pub oversized_threshold: usize,
    pub chunk_max_chars: usize,
    pub chunk_max_tokens: u32,
    pub final_max_tokens: u32,
    pub temperature: f32,
    pub min_transcript_chars: usize,
    pub model: String,
    pub api_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            style: SummaryStyle::General,
            language: Language::default(),
            oversized_threshold: DEFAULT_OVERSIZED_THRESHOLD,
            chunk_max_chars: DEFAULT_CHUNK_MAX_CHARS,
            chunk_max_tokens: DEFAULT_CHUNK_MAX_TOKENS,
            final_max_tokens: DEFAULT_FINAL_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            min_transcript_chars: DEFAULT_MIN_TRANSCRIPT_CHARS,
            model: DEFAULT_MODEL.into(),
            api_url: DEFAULT_API_URL.into(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SummarizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style(mut self, style: SummaryStyle) -> Self {
        self.style = style;
        self
    }

    /// Set the caption language hint. Accepts tags like "en", "de", "pt-BR".
    pub fn language(mut self, lang: &str) -> Result<Self> {
        self.language = Language::new(lang)?;
        Ok(self)
    }

    pub fn oversized_threshold(mut self, chars: usize) -> Self {
        self.oversized_threshold = chars;
        self
    }

    pub fn chunk_max_chars(mut self, chars: usize) -> Result<Self> {
        if chars == 0 {
            return Err(Error::InvalidOption(
                "chunk size must be at least 1 character".into(),
            ));
        }
        self.chunk_max_chars = chars;
        Ok(self)
    }

    pub fn chunk_max_tokens(mut self, tokens: u32) -> Result<Self> {
        if tokens == 0 {
            return Err(Error::InvalidOption("chunk max tokens must be at least 1".into()));
        }
        self.chunk_max_tokens = tokens;
        Ok(self)
    }

    pub fn final_max_tokens(mut self, tokens: u32) -> Result<Self> {
        if tokens == 0 {
            return Err(Error::InvalidOption("max tokens must be at least 1".into()));
        }
        self.final_max_tokens = tokens;
        Ok(self)
    }

    /// Sampling temperature, 0.0 to 2.0.
    pub fn temperature(mut self, temp: f32) -> Result<Self> {
        if !(0.0..=2.0).contains(&temp) {
            return Err(Error::InvalidOption(format!(
                "temperature must be between 0.0 and 2.0, got {temp}"
            )));
        }
        self.temperature = temp;
        Ok(self)
    }

    pub fn min_transcript_chars(mut self, chars: usize) -> Self {
        self.min_transcript_chars = chars;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::InvalidOption("request timeout must be non-zero".into()));
        }
        self.request_timeout = timeout;
        Ok(self)
    }

    /// Resolve the API key: the explicit option first, then `GROQ_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(API_KEY_ENV)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }

    /// Whether `text` is long enough to go through the map-reduce path.
    pub fn needs_chunking(&self, text: &str) -> bool {
        text.chars().count() > self.oversized_threshold
    }

    /// Log option combinations that are legal but pointless.
    pub(crate) fn warn_on_odd_tuning(&self) {
        if self.chunk_max_chars >= self.oversized_threshold {
            warn!(
                chunk_max_chars = self.chunk_max_chars,
                oversized_threshold = self.oversized_threshold,
                "chunk size is not below the chunking threshold; map phase may produce a single chunk"
            );
        }
    }
}

/// Settings read from a TOML config file. Every key is optional; missing keys
/// leave the current option untouched.
///
/// ```toml
/// style = "bullet_points"
/// language = "en"
/// model = "llama-3.1-8b-instant"
/// chunk_max_chars = 2000
/// timeout_secs = 30
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub style: Option<SummaryStyle>,
    pub language: Option<String>,
    pub model: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub oversized_threshold: Option<usize>,
    pub chunk_max_chars: Option<usize>,
    pub chunk_max_tokens: Option<u32>,
    pub final_max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub min_transcript_chars: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// `~/.config/vidsum/config.toml` on Linux, the platform equivalent elsewhere.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vidsum").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents, path)
    }

    /// Load the file at [`FileConfig::default_path`] if it exists.
    pub fn load_default() -> Result<Option<Self>> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading config file");
                Self::load(&path).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn parse(contents: &str, path: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay the values present in this file onto `options`.
    pub fn apply(&self, mut options: SummarizeOptions) -> Result<SummarizeOptions> {
        if let Some(style) = self.style {
            options = options.style(style);
        }
        if let Some(lang) = &self.language {
            options = options.language(lang)?;
        }
        if let Some(model) = &self.model {
            options = options.model(model.clone());
        }
        if let Some(url) = &self.api_url {
            options = options.api_url(url.clone());
        }
        if let Some(key) = &self.api_key {
            options = options.api_key(key.clone());
        }
        if let Some(chars) = self.oversized_threshold {
            options = options.oversized_threshold(chars);
        }
        if let Some(chars) = self.chunk_max_chars {
            options = options.chunk_max_chars(chars)?;
        }
        if let Some(tokens) = self.chunk_max_tokens {
            options = options.chunk_max_tokens(tokens)?;
        }
        if let Some(tokens) = self.final_max_tokens {
            options = options.final_max_tokens(tokens)?;
        }
        if let Some(temp) = self.temperature {
            options = options.temperature(temp)?;
        }
        if let Some(chars) = self.min_transcript_chars {
            options = options.min_transcript_chars(chars);
        }
        if let Some(secs) = self.timeout_secs {
            options = options.request_timeout(Duration::from_secs(secs))?;
        }
        Ok(options)
    }
}
