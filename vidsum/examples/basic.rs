//! Summarize a video and print the summary.
//!
//! Usage: GROQ_API_KEY=... cargo run --example basic -- https://youtu.be/<id>

#[tokio::main]
async fn main() -> vidsum::Result<()> {
    let link = std::env::args()
        .nth(1)
        .expect("usage: basic <video-link>");

    let result = vidsum::summarize_video(&link, &vidsum::SummarizeOptions::default()).await?;

    println!("{}", result.summary.text);

    Ok(())
}
