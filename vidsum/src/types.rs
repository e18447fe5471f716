use serde::{Deserialize, Serialize};

use crate::config::SummaryStyle;

/// Cleaned caption text of one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    /// Caption track language as reported by the caption source.
    pub language: String,
    pub video_id: Option<String>,
    pub source_url: Option<String>,
    pub source_title: Option<String>,
}

impl Transcript {
    /// A transcript with no source metadata.
    pub fn from_text(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            video_id: None,
            source_url: None,
            source_title: None,
        }
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Which path produced a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryQuality {
    /// Short transcript summarized in a single call.
    Direct,
    /// Chunk summaries merged by a final call.
    Reduced,
    /// The final merge call failed; the text is the joined chunk summaries.
    Degraded,
}

/// Result of summarizing one transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    pub style: SummaryStyle,
    pub quality: SummaryQuality,
    /// Number of segments summarized in the map phase (0 on the direct path).
    pub chunks: usize,
}

impl Summary {
    pub fn is_degraded(&self) -> bool {
        self.quality == SummaryQuality::Degraded
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Word counts and compression of a summary relative to its transcript.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub transcript_words: usize,
    pub summary_words: usize,
    /// Summary words as a percentage of transcript words.
    pub compression_percent: f64,
}

impl SummaryStats {
    pub fn compute(transcript: &str, summary: &str) -> Self {
        let transcript_words = word_count(transcript);
        let summary_words = word_count(summary);
        let compression_percent = if transcript_words == 0 {
            0.0
        } else {
            summary_words as f64 / transcript_words as f64 * 100.0
        };
        Self {
            transcript_words,
            summary_words,
            compression_percent,
        }
    }
}

/// Complete result for one video: transcript, summary and statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSummary {
    pub transcript: Transcript,
    pub summary: Summary,
    pub stats: SummaryStats,
}

impl VideoSummary {
    pub fn new(transcript: Transcript, summary: Summary) -> Self {
        let stats = SummaryStats::compute(&transcript.text, &summary.text);
        Self {
            transcript,
            summary,
            stats,
        }
    }

    /// Format as JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Format as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Format as a Markdown document with a statistics table.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let title = self
            .transcript
            .source_title
            .as_deref()
            .unwrap_or("Video Summary");
        out.push_str(&format!("# {title}\n\n"));

        if let Some(url) = &self.transcript.source_url {
            out.push_str(&format!("Source: <{url}>\n\n"));
        }

        out.push_str(&format!("## {}\n\n", self.summary.style.label()));
        out.push_str(self.summary.text.trim());
        out.push_str("\n\n");

        if self.summary.is_degraded() {
            out.push_str("> Note: the final merge step failed; these are the raw section summaries.\n\n");
        }

        out.push_str("| Original Words | Summary Words | Compression |\n");
        out.push_str("|---:|---:|---:|\n");
        out.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            self.stats.transcript_words, self.stats.summary_words, self.stats.compression_percent
        ));
        out
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
