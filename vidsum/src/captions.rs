//! Caption cleaning: WebVTT payload in, one line of plain text out.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Karaoke grouping tags from auto-generated captions: `<c>`, `</c>`, `<c.colorE5E5E5>`.
static GROUPING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?c(?:\.[\w.-]+)?>").expect("valid regex"));

/// Inline word timestamps: `<00:00:06.480>`.
static INLINE_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\d{2}:\d{2}:\d{2}\.\d{3}>").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Reduce a WebVTT file to its cue payload lines, joined with single spaces.
///
/// Drops the `WEBVTT` header and its metadata (`Kind:`, `Language:`), `NOTE`
/// and `STYLE` blocks, cue timing lines, numeric cue identifiers and blank
/// lines. Auto-captions repeat each line in the following cue, so consecutive
/// duplicates are kept once.
pub fn cue_text(vtt: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut block_start = true;
    let mut skipping_block = false;

    for line in vtt.lines() {
        let line = line.trim();

        if line.is_empty() {
            block_start = true;
            skipping_block = false;
            continue;
        }
        let starts_block = std::mem::replace(&mut block_start, false);

        if starts_block && is_non_cue_block(line) {
            skipping_block = true;
            continue;
        }
        if skipping_block {
            continue;
        }
        if line.contains("-->") {
            continue;
        }
        if line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if kept.last() == Some(&line) {
            continue;
        }
        kept.push(line);
    }

    kept.join(" ")
}

/// File header, comment, style and region blocks carry no spoken text.
fn is_non_cue_block(first_line: &str) -> bool {
    let line = first_line.trim_start_matches('\u{feff}');
    line.starts_with("WEBVTT")
        || line == "NOTE"
        || line.starts_with("NOTE ")
        || line == "STYLE"
        || line == "REGION"
}

/// Strip caption markup and collapse whitespace.
///
/// Tags are removed repeatedly until none remain, so markup hidden inside
/// other markup (`<<c>c>`) cannot survive a single pass. The result is a
/// fixed point: `clean(&clean(x)) == clean(x)`.
pub fn clean(raw: &str) -> String {
    let mut text = raw.to_string();
    loop {
        let stripped = GROUPING_TAG.replace_all(&text, "");
        let stripped = INLINE_TIMESTAMP.replace_all(&stripped, "").into_owned();
        if stripped == text {
            break;
        }
        text = stripped;
    }

    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Clean `raw` and reject results shorter than `min_chars` characters.
pub fn normalize(raw: &str, min_chars: usize) -> Result<String> {
    let text = clean(raw);
    let chars = text.chars().count();
    if text.is_empty() || chars < min_chars {
        return Err(Error::InsufficientContent {
            chars,
            min: min_chars,
        });
    }
    Ok(text)
}
