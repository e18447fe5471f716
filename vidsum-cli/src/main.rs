use std::borrow::Cow;
use std::future::Future;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use vidsum::{
    ChatCompletionClient, Error, FileConfig, Hint, SummarizeOptions, SummaryStyle, Transcript,
    VideoSummary,
};

#[derive(Parser)]
#[command(name = "vidsum", about = "Summarize a video from its captions")]
struct Cli {
    /// Video link or 11-character video ID. Prompted for when omitted.
    #[arg(conflicts_with = "file")]
    input: Option<String>,

    /// Summarize a local caption file (.vtt, .srt or plain text) instead of a video.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Summary style.
    #[arg(short, long)]
    style: Option<StyleArg>,

    /// Preferred caption language (e.g. "en", "de", "pt-BR").
    #[arg(short, long)]
    language: Option<String>,

    /// Chat model name.
    #[arg(short, long)]
    model: Option<String>,

    /// OpenAI-compatible chat completions endpoint.
    #[arg(long)]
    api_url: Option<String>,

    /// API key for the completion endpoint.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Transcripts longer than this many characters are summarized in chunks.
    #[arg(long)]
    threshold: Option<usize>,

    /// Maximum characters per chunk.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Token budget for the final summary.
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Token budget for each chunk summary.
    #[arg(long)]
    chunk_max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arg(long)]
    temperature: Option<f32>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Config file (default: ~/.config/vidsum/config.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Write output to file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the cleaned transcript and stop.
    #[arg(long)]
    transcript_only: bool,

    /// Also print the cleaned transcript to stderr before summarizing.
    #[arg(long)]
    show_transcript: bool,

    /// List available summary styles.
    #[arg(long)]
    list_styles: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StyleArg {
    General,
    Detailed,
    BulletPoints,
    KeyTakeaways,
}

impl From<StyleArg> for SummaryStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::General => SummaryStyle::General,
            StyleArg::Detailed => SummaryStyle::Detailed,
            StyleArg::BulletPoints => SummaryStyle::BulletPoints,
            StyleArg::KeyTakeaways => SummaryStyle::KeyTakeaways,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Markdown,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vidsum=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.list_styles {
        println!("{:<16} {:<18} {}", "STYLE", "TITLE", "DESCRIPTION");
        println!("{:<16} {:<18} {}", "-----", "-----", "-----------");
        for style in SummaryStyle::ALL {
            println!(
                "{:<16} {:<18} {}",
                style.name().replace('_', "-"),
                style.label(),
                style.description()
            );
        }
        return;
    }

    let opts = build_options(&cli).unwrap_or_else(|e| fail(e));

    // Built up front so a missing key fails before any download
    let client = if cli.transcript_only {
        None
    } else {
        Some(ChatCompletionClient::from_options(&opts).unwrap_or_else(|e| fail(e)))
    };

    let transcript = match &cli.file {
        Some(path) => vidsum::transcript_from_file(path, &opts),
        None => {
            let reference = match cli.input.clone() {
                Some(input) => input,
                None => prompt_for_link().unwrap_or_else(|e| fail(e)),
            };
            let pb = spinner("Fetching captions...");
            let result = interruptible(vidsum::fetch_transcript(&reference, &opts)).await;
            pb.finish_and_clear();
            result.unwrap_or_else(|| cancelled())
        }
    }
    .unwrap_or_else(|e| fail(e));

    eprintln!(
        "Transcript: {} words, {} characters, language: {}",
        format_count(transcript.word_count()),
        format_count(transcript.char_count()),
        transcript.language,
    );

    if cli.transcript_only {
        emit(&cli.output, &format!("{}\n", transcript.text));
        return;
    }

    if cli.show_transcript {
        eprintln!("\n{}\n", transcript.text);
    }

    let Some(client) = client else {
        return;
    };

    let pb = spinner(summarizing_message(&transcript, &opts));
    let result = interruptible(vidsum::summarize_transcript(transcript, &opts, &client)).await;
    pb.finish_and_clear();

    let summary = result
        .unwrap_or_else(|| cancelled())
        .unwrap_or_else(|e| fail(e));
    report(&summary);

    let output_text = match cli.format {
        OutputFormat::Text => format!("{}\n", summary.summary.text.trim_end()),
        OutputFormat::Markdown => summary.to_markdown(),
        OutputFormat::Json => match summary.to_json_pretty() {
            Ok(j) => j + "\n",
            Err(e) => fail(e),
        },
    };

    emit(&cli.output, &output_text);
}

/// Defaults, then the config file, then command-line flags.
fn build_options(cli: &Cli) -> vidsum::Result<SummarizeOptions> {
    let mut opts = SummarizeOptions::new();

    let file = match &cli.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => FileConfig::load_default()?,
    };
    if let Some(file) = file {
        opts = file.apply(opts)?;
    }

    if let Some(style) = cli.style {
        opts = opts.style(style.into());
    }
    if let Some(lang) = &cli.language {
        opts = opts.language(lang)?;
    }
    if let Some(model) = &cli.model {
        opts = opts.model(model.clone());
    }
    if let Some(url) = &cli.api_url {
        opts = opts.api_url(url.clone());
    }
    if let Some(key) = &cli.api_key {
        opts = opts.api_key(key.clone());
    }
    if let Some(chars) = cli.threshold {
        opts = opts.oversized_threshold(chars);
    }
    if let Some(chars) = cli.chunk_size {
        opts = opts.chunk_max_chars(chars)?;
    }
    if let Some(tokens) = cli.max_tokens {
        opts = opts.final_max_tokens(tokens)?;
    }
    if let Some(tokens) = cli.chunk_max_tokens {
        opts = opts.chunk_max_tokens(tokens)?;
    }
    if let Some(temp) = cli.temperature {
        opts = opts.temperature(temp)?;
    }
    if let Some(secs) = cli.timeout {
        opts = opts.request_timeout(Duration::from_secs(secs))?;
    }

    Ok(opts)
}

fn prompt_for_link() -> vidsum::Result<String> {
    eprint!("Paste video link: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::InvalidReference(String::new()));
    }
    Ok(line.to_string())
}

/// Run `fut` to completion unless Ctrl-C arrives first, in which case the
/// future is dropped (cleaning up whatever it owns) and `None` is returned.
async fn interruptible<F: Future>(fut: F) -> Option<F::Output> {
    tokio::select! {
        output = fut => Some(output),
        _ = tokio::signal::ctrl_c() => None,
    }
}

fn cancelled() -> ! {
    eprintln!("Cancelled");
    std::process::exit(130);
}

fn summarizing_message(transcript: &Transcript, opts: &SummarizeOptions) -> String {
    if opts.needs_chunking(&transcript.text) {
        let chunks = vidsum::chunk::segments(&transcript.text, opts.chunk_max_chars).count();
        format!("Summarizing ({chunks} chunks)...")
    } else {
        "Summarizing...".to_string()
    }
}

fn spinner(message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .expect("valid template"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn report(summary: &VideoSummary) {
    let stats = &summary.stats;
    eprintln!(
        "Summary complete: {} words from {} ({:.1}% of original), style: {}",
        format_count(stats.summary_words),
        format_count(stats.transcript_words),
        stats.compression_percent,
        summary.summary.style.label(),
    );
    if summary.summary.is_degraded() {
        eprintln!(
            "Warning: the final merge step failed; output is the {} section summaries joined together",
            summary.summary.chunks
        );
    }
}

fn emit(output: &Option<PathBuf>, text: &str) {
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                eprintln!("Error writing to {}: {e}", path.display());
                std::process::exit(1);
            }
            eprintln!("Written to {}", path.display());
        }
        None => print!("{text}"),
    }
}

fn fail(e: Error) -> ! {
    eprintln!("Error: {e}");
    match e.hint() {
        Some(Hint::CorrectInput) => {
            eprintln!("Check the video link, or pick a video that has captions");
        }
        Some(Hint::Retry) => match e.failed_chunk() {
            Some(chunk) => eprintln!(
                "Summarizing chunk {chunk} failed; the service may be busy, try again shortly"
            ),
            None => eprintln!("The summarization service failed; try again shortly"),
        },
        None => {
            if matches!(e, Error::MissingApiKey) {
                eprintln!("Pass --api-key or set GROQ_API_KEY");
            }
        }
    }
    std::process::exit(1);
}

fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "vidsum",
            "https://youtu.be/dQw4w9WgXcQ",
            "--config",
            "/nonexistent/vidsum.toml",
        ]);
        // an explicit config path that does not exist is an error
        assert!(build_options(&cli).is_err());

        let path = std::env::temp_dir().join(format!("vidsum-cli-{}.toml", std::process::id()));
        std::fs::write(&path, "style = \"detailed\"\nchunk_max_chars = 1000\n").unwrap();
        let cli = Cli::parse_from([
            "vidsum",
            "dQw4w9WgXcQ",
            "--config",
            path.to_str().unwrap(),
            "--style",
            "bullet-points",
            "--threshold",
            "2000",
        ]);
        let opts = build_options(&cli).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(opts.style, SummaryStyle::BulletPoints);
        assert_eq!(opts.chunk_max_chars, 1000);
        assert_eq!(opts.oversized_threshold, 2000);
    }

    struct DropFlag(std::sync::Arc<std::sync::atomic::AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_interruptible_returns_output_and_releases_future() {
        let dropped = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let guard = DropFlag(dropped.clone());

        let output = interruptible(async move {
            let _guard = guard;
            tokio::task::yield_now().await;
            7
        })
        .await;

        assert_eq!(output, Some(7));
        assert!(dropped.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_input_conflicts_with_file() {
        let result = Cli::try_parse_from(["vidsum", "dQw4w9WgXcQ", "--file", "talk.vtt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_summarizing_message() {
        let opts = SummarizeOptions::new();
        let short = Transcript::from_text("a short transcript", "en");
        assert_eq!(summarizing_message(&short, &opts), "Summarizing...");

        let long = Transcript::from_text(vec!["abcdef"; 1000].join(" "), "en");
        assert_eq!(summarizing_message(&long, &opts), "Summarizing (3 chunks)...");
    }
}
