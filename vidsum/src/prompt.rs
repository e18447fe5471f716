//! Prompt templates.
//!
//! Every template is an instruction line; the text being summarized is
//! appended after a blank line. The map-phase template is the same for all
//! styles; only direct and reduce prompts vary by [`SummaryStyle`].

use crate::config::SummaryStyle;

/// Map-phase instruction, shared by all styles.
pub const CHUNK_TEMPLATE: &str =
    "Please provide a concise summary of this part of a video transcript:";

/// Direct and reduce instructions for one style.
#[derive(Debug, Clone, Copy)]
pub struct StyleTemplates {
    pub style: SummaryStyle,
    /// Used when the whole transcript fits in one call.
    pub direct: &'static str,
    /// Used to merge the section summaries of a chunked transcript.
    pub reduce: &'static str,
}

pub const STYLE_TEMPLATES: [StyleTemplates; 4] = [
    StyleTemplates {
        style: SummaryStyle::General,
        direct: "Please provide a clear and concise summary of the following video transcript:",
        reduce: "Please create a cohesive summary from these section summaries of a video:",
    },
    StyleTemplates {
        style: SummaryStyle::Detailed,
        direct: "Please provide a detailed summary with key points and main topics from the following video transcript:",
        reduce: "Please create a detailed, well-structured summary from these section summaries:",
    },
    StyleTemplates {
        style: SummaryStyle::BulletPoints,
        direct: "Please summarize the following video transcript in bullet points, highlighting the main topics:",
        reduce: "Please organize these section summaries into clear bullet points:",
    },
    StyleTemplates {
        style: SummaryStyle::KeyTakeaways,
        direct: "Please extract the key takeaways and main insights from the following video transcript:",
        reduce: "Please extract the main insights and key takeaways from these summaries:",
    },
];

pub fn templates(style: SummaryStyle) -> &'static StyleTemplates {
    // STYLE_TEMPLATES is ordered like SummaryStyle::ALL
    &STYLE_TEMPLATES[style as usize]
}

fn compose(instruction: &str, body: &str) -> String {
    format!("{instruction}\n\n{body}")
}

/// Prompt for summarizing a whole transcript in one call.
pub fn direct_prompt(style: SummaryStyle, transcript: &str) -> String {
    compose(templates(style).direct, transcript)
}

/// Prompt for summarizing one segment during the map phase.
pub fn chunk_prompt(segment: &str) -> String {
    compose(CHUNK_TEMPLATE, segment)
}

/// Prompt for merging the joined section summaries.
pub fn reduce_prompt(style: SummaryStyle, combined: &str) -> String {
    compose(templates(style).reduce, combined)
}
