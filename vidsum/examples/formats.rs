//! Summarize a local caption file and print it as Markdown and JSON.
//!
//! Usage: GROQ_API_KEY=... cargo run --example formats -- path/to/captions.vtt

use vidsum::{ChatCompletionClient, SummarizeOptions, SummaryStyle};

#[tokio::main]
async fn main() -> vidsum::Result<()> {
    let path = std::env::args()
        .nth(1)
        .expect("usage: formats <caption-file>");

    let opts = SummarizeOptions::new()
        .style(SummaryStyle::KeyTakeaways)
        .temperature(0.2)?;

    let client = ChatCompletionClient::from_options(&opts)?;
    let transcript = vidsum::transcript_from_file(&path, &opts)?;
    let result = vidsum::summarize_transcript(transcript, &opts, &client).await?;

    println!("=== Markdown ===\n{}", result.to_markdown());
    println!("=== JSON ===\n{}", result.to_json_pretty()?);

    Ok(())
}
