//! Map-reduce summarization over a [`TextCompletionPort`].
//!
//! Short transcripts are summarized in one call. Longer ones are partitioned,
//! each segment is summarized in order, and the joined section summaries are
//! merged by one final call. If that final call fails the joined section
//! summaries are returned as a degraded result, unless they are blank; a
//! failure anywhere earlier aborts the whole request.

use tracing::{debug, info, warn};

use crate::chunk;
use crate::completion::TextCompletionPort;
use crate::config::SummarizeOptions;
use crate::error::{Error, Result, Stage};
use crate::prompt;
use crate::types::{Summary, SummaryQuality};

/// Separator between section summaries in the reduce input.
const SECTION_SEPARATOR: &str = "\n\n";

/// Summarize `text` in the style and with the budgets given by `options`.
///
/// Completion calls are issued one at a time, in segment order. Dropping the
/// returned future abandons the in-flight call and issues no further calls.
pub async fn summarize<P>(text: &str, port: &P, options: &SummarizeOptions) -> Result<Summary>
where
    P: TextCompletionPort + ?Sized,
{
    let style = options.style;
    let chars = text.chars().count();

    if !options.needs_chunking(text) {
        info!(chars, %style, "summarizing transcript in a single call");
        let prompt = prompt::direct_prompt(style, text);
        let summary = port
            .complete(&prompt, options.final_max_tokens, options.temperature)
            .await
            .map_err(|source| Error::Summarization {
                stage: Stage::Direct,
                source,
            })?;

        return Ok(Summary {
            text: summary,
            style,
            quality: SummaryQuality::Direct,
            chunks: 0,
        });
    }

    options.warn_on_odd_tuning();

    let segments = chunk::partition(text, options.chunk_max_chars);
    if segments.is_empty() {
        return Err(Error::InsufficientContent {
            chars: 0,
            min: options.min_transcript_chars,
        });
    }

    let total = segments.len();
    info!(chars, chunks = total, %style, "summarizing transcript in chunks");

    let mut partials = Vec::with_capacity(total);
    for (i, segment) in segments.iter().enumerate() {
        let index = i + 1;
        debug!(chunk = index, total, chars = segment.chars().count(), "summarizing chunk");

        let partial = port
            .complete(
                &prompt::chunk_prompt(segment),
                options.chunk_max_tokens,
                options.temperature,
            )
            .await
            .map_err(|source| Error::Summarization {
                stage: Stage::Chunk { index, total },
                source,
            })?;
        partials.push(partial);
    }

    let combined = partials.join(SECTION_SEPARATOR);

    let reduce = prompt::reduce_prompt(style, &combined);
    match port
        .complete(&reduce, options.final_max_tokens, options.temperature)
        .await
    {
        Ok(summary) => Ok(Summary {
            text: summary,
            style,
            quality: SummaryQuality::Reduced,
            chunks: total,
        }),
        Err(source) if combined.trim().is_empty() => Err(Error::Summarization {
            stage: Stage::Reduce,
            source,
        }),
        Err(e) => {
            warn!(error = %e, chunks = total, "final summary failed; returning section summaries");
            Ok(Summary {
                text: combined,
                style,
                quality: SummaryQuality::Degraded,
                chunks: total,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::completion::CompletionError;
    use crate::config::SummaryStyle;

    #[derive(Debug, Clone)]
    struct Call {
        prompt: String,
        max_tokens: u32,
        temperature: f32,
    }

    /// Records every call; fails the calls listed in `fail_on` (1-based).
    /// Replies "summary N" unless a fixed reply is set.
    #[derive(Default)]
    struct ScriptedPort {
        calls: Mutex<Vec<Call>>,
        fail_on: Vec<usize>,
        reply: Option<String>,
    }

    impl ScriptedPort {
        fn new() -> Self {
            Self::default()
        }

        fn failing_on(calls: &[usize]) -> Self {
            Self {
                fail_on: calls.to_vec(),
                ..Self::default()
            }
        }

        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextCompletionPort for ScriptedPort {
        async fn complete(
            &self,
            prompt: &str,
            max_tokens: u32,
            temperature: f32,
        ) -> std::result::Result<String, CompletionError> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(Call {
                    prompt: prompt.to_string(),
                    max_tokens,
                    temperature,
                });
                calls.len()
            };

            if self.fail_on.contains(&n) {
                return Err(CompletionError::Status {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(self.reply.clone().unwrap_or_else(|| format!("summary {n}")))
        }
    }

    /// 6,999 characters: three segments at the default chunk size.
    fn long_text() -> String {
        vec!["abcdef"; 1000].join(" ")
    }

    fn short_text() -> String {
        "x".repeat(100) + &" word".repeat(80) // 500 chars
    }

    // --- direct path ---

    #[tokio::test]
    async fn test_short_text_single_call_bullet_points() {
        let port = ScriptedPort::new();
        let opts = SummarizeOptions::new().style(SummaryStyle::BulletPoints);
        let text = short_text();

        let summary = summarize(&text, &port, &opts).await.unwrap();

        let calls = port.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].prompt,
            format!("{}\n\n{text}", prompt::templates(SummaryStyle::BulletPoints).direct)
        );
        assert_eq!(calls[0].max_tokens, 500);
        assert_eq!(summary.text, "summary 1");
        assert_eq!(summary.quality, SummaryQuality::Direct);
        assert_eq!(summary.chunks, 0);
    }

    #[tokio::test]
    async fn test_short_text_output_returned_verbatim() {
        let port = ScriptedPort::replying("  - point one\n- point two \n");
        let summary = summarize(&short_text(), &port, &SummarizeOptions::new())
            .await
            .unwrap();
        assert_eq!(summary.text, "  - point one\n- point two \n");
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let opts = SummarizeOptions::new();

        let port = ScriptedPort::new();
        summarize(&"a".repeat(3000), &port, &opts).await.unwrap();
        assert_eq!(port.calls().len(), 1);

        let port = ScriptedPort::new();
        let text = format!("{} {}", "a".repeat(1500), "b".repeat(1500)); // 3001 chars
        let summary = summarize(&text, &port, &opts).await.unwrap();
        assert_eq!(summary.quality, SummaryQuality::Reduced);
        assert_eq!(summary.chunks, 2);
        assert_eq!(port.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_direct_failure_is_not_recovered() {
        let port = ScriptedPort::failing_on(&[1]);
        let err = summarize(&short_text(), &port, &SummarizeOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Summarization {
                stage: Stage::Direct,
                ..
            }
        ));
        assert_eq!(port.calls().len(), 1);
    }

    // --- map-reduce path ---

    #[tokio::test]
    async fn test_map_reduce_call_count_and_order() {
        let port = ScriptedPort::new();
        let opts = SummarizeOptions::new();
        let text = long_text();

        let summary = summarize(&text, &port, &opts).await.unwrap();

        let calls = port.calls();
        assert_eq!(calls.len(), 4);

        let segments = chunk::partition(&text, opts.chunk_max_chars);
        assert_eq!(segments.len(), 3);
        for (call, segment) in calls[..3].iter().zip(&segments) {
            assert_eq!(call.prompt, prompt::chunk_prompt(segment));
            assert_eq!(call.max_tokens, 300);
        }

        assert_eq!(
            calls[3].prompt,
            prompt::reduce_prompt(SummaryStyle::General, "summary 1\n\nsummary 2\n\nsummary 3")
        );
        assert_eq!(calls[3].max_tokens, 500);

        assert_eq!(summary.text, "summary 4");
        assert_eq!(summary.quality, SummaryQuality::Reduced);
        assert_eq!(summary.chunks, 3);
    }

    #[tokio::test]
    async fn test_reduce_failure_degrades_to_joined_sections() {
        let port = ScriptedPort::failing_on(&[4]);
        let summary = summarize(&long_text(), &port, &SummarizeOptions::new())
            .await
            .unwrap();

        assert_eq!(summary.quality, SummaryQuality::Degraded);
        assert!(summary.is_degraded());
        assert_eq!(summary.text, "summary 1\n\nsummary 2\n\nsummary 3");
        assert!(!summary.text.is_empty());
        assert_eq!(port.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_reduce_failure_with_blank_sections_is_an_error() {
        let port = ScriptedPort {
            fail_on: vec![2],
            reply: Some("  ".into()),
            ..ScriptedPort::default()
        };
        let opts = SummarizeOptions::new().oversized_threshold(10);

        let err = summarize("a transcript longer than ten", &port, &opts)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Summarization {
                stage: Stage::Reduce,
                ..
            }
        ));
        assert_eq!(err.failed_chunk(), None);
        assert_eq!(port.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_map_failure_stops_and_reports_chunk() {
        let port = ScriptedPort::failing_on(&[2]);
        let err = summarize(&long_text(), &port, &SummarizeOptions::new())
            .await
            .unwrap_err();

        assert_eq!(err.failed_chunk(), Some(2));
        assert!(matches!(
            err,
            Error::Summarization {
                stage: Stage::Chunk { index: 2, total: 3 },
                ..
            }
        ));
        assert!(err.to_string().contains("chunk 2 of 3"));
        assert_eq!(port.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_first_chunk_failure() {
        let port = ScriptedPort::failing_on(&[1, 2, 3]);
        let err = summarize(&long_text(), &port, &SummarizeOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.failed_chunk(), Some(1));
        assert_eq!(port.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_last_chunk_failure_skips_reduce() {
        let port = ScriptedPort::failing_on(&[3]);
        let err = summarize(&long_text(), &port, &SummarizeOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.failed_chunk(), Some(3));
        assert_eq!(port.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_style_changes_wording_only() {
        let text = long_text();
        let mut chunk_prompts = Vec::new();

        for style in SummaryStyle::ALL {
            let port = ScriptedPort::new();
            let opts = SummarizeOptions::new().style(style);
            let summary = summarize(&text, &port, &opts).await.unwrap();

            let calls = port.calls();
            assert_eq!(calls.len(), 4);
            assert_eq!(summary.style, style);
            assert!(calls[3].prompt.starts_with(prompt::templates(style).reduce));
            chunk_prompts.push(
                calls[..3]
                    .iter()
                    .map(|c| c.prompt.clone())
                    .collect::<Vec<_>>(),
            );
        }

        assert!(chunk_prompts.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_custom_budgets_and_temperature() {
        let port = ScriptedPort::new();
        let opts = SummarizeOptions::new()
            .oversized_threshold(100)
            .chunk_max_chars(60)
            .unwrap()
            .chunk_max_tokens(50)
            .unwrap()
            .final_max_tokens(120)
            .unwrap()
            .temperature(0.7)
            .unwrap();
        let text = "word ".repeat(40); // 200 chars

        let summary = summarize(&text, &port, &opts).await.unwrap();

        let calls = port.calls();
        let chunks = chunk::partition(&text, 60).len();
        assert_eq!(summary.chunks, chunks);
        assert_eq!(calls.len(), chunks + 1);
        assert!(calls[..chunks].iter().all(|c| c.max_tokens == 50));
        assert_eq!(calls[chunks].max_tokens, 120);
        assert!(calls.iter().all(|c| (c.temperature - 0.7).abs() < f32::EPSILON));
    }

    #[tokio::test]
    async fn test_chunk_size_above_threshold_single_chunk() {
        let port = ScriptedPort::new();
        let opts = SummarizeOptions::new()
            .oversized_threshold(100)
            .chunk_max_chars(10_000)
            .unwrap();
        let summary = summarize(&"word ".repeat(40), &port, &opts).await.unwrap();
        assert_eq!(summary.chunks, 1);
        assert_eq!(port.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_whitespace_only_oversized_text() {
        let port = ScriptedPort::new();
        let err = summarize(&" ".repeat(4000), &port, &SummarizeOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientContent { .. }));
        assert!(port.calls().is_empty());
    }

    // --- concurrency and cancellation ---

    /// Tracks how many calls are in flight at once.
    #[derive(Default)]
    struct OverlapProbe {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextCompletionPort for OverlapProbe {
        async fn complete(
            &self,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> std::result::Result<String, CompletionError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("part {n}"))
        }
    }

    #[tokio::test]
    async fn test_chunk_calls_never_overlap() {
        let probe = OverlapProbe::default();
        summarize(&long_text(), &probe, &SummarizeOptions::new())
            .await
            .unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 4);
        assert_eq!(probe.max_in_flight.load(Ordering::SeqCst), 1);
    }

    /// Never answers call number `stall_at`.
    struct StallingPort {
        stall_at: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextCompletionPort for StallingPort {
        async fn complete(
            &self,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> std::result::Result<String, CompletionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.stall_at {
                std::future::pending::<()>().await;
            }
            Ok(format!("part {n}"))
        }
    }

    #[tokio::test]
    async fn test_dropping_future_stops_further_calls() {
        let port = StallingPort {
            stall_at: 2,
            calls: AtomicUsize::new(0),
        };
        let opts = SummarizeOptions::new();
        let text = long_text();

        let result =
            tokio::time::timeout(Duration::from_millis(50), summarize(&text, &port, &opts)).await;
        assert!(result.is_err(), "summarize should still be waiting on chunk 2");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(port.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_works_through_trait_object() {
        let port: Box<dyn TextCompletionPort> = Box::new(ScriptedPort::new());
        let summary = summarize(&short_text(), port.as_ref(), &SummarizeOptions::new())
            .await
            .unwrap();
        assert_eq!(summary.text, "summary 1");
    }
}
