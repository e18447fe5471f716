//! Plug in a different completion backend and tune the chunking.
//!
//! The backend here just echoes the first words of each prompt, which shows
//! how many calls the map-reduce pipeline makes for a given input.
//!
//! Usage: cargo run --example custom_port -- path/to/captions.vtt

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use vidsum::{CompletionError, SummarizeOptions, SummaryStyle, TextCompletionPort};

#[derive(Default)]
struct EchoBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl TextCompletionPort for EchoBackend {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, CompletionError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let body = prompt.split_once("\n\n").map_or(prompt, |(_, body)| body);
        let preview: Vec<&str> = body.split_whitespace().take(8).collect();
        Ok(format!("[call {n}, {max_tokens} tokens] {}", preview.join(" ")))
    }
}

#[tokio::main]
async fn main() -> vidsum::Result<()> {
    let path = std::env::args()
        .nth(1)
        .expect("usage: custom_port <caption-file>");

    let opts = SummarizeOptions::new()
        .style(SummaryStyle::BulletPoints)
        .oversized_threshold(1000)
        .chunk_max_chars(800)?
        .chunk_max_tokens(100)?;

    let backend = EchoBackend::default();
    let transcript = vidsum::transcript_from_file(&path, &opts)?;
    let result = vidsum::summarize_transcript(transcript, &opts, &backend).await?;

    println!(
        "{} calls, {} chunks, quality {:?}\n",
        backend.calls.load(Ordering::SeqCst),
        result.summary.chunks,
        result.summary.quality
    );
    println!("{}", result.summary.text);

    Ok(())
}
