//! Sample source abstraction for frame ingestion.
//!
//! Provides a unified trait for reading frames from different sources:
//! pre-loaded replays (CSV or synthetic) and JSON lines (stdin or any reader).

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

use crate::sensors::parse_json_frame;
use crate::types::{wall_clock_now, FrameSample};

/// Events produced by a sample source.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleEvent {
    /// A frame was read.
    Sample(FrameSample),
    /// Source reached end of data.
    Eof,
}

/// Trait abstracting where frames come from.
///
/// Implementations handle format parsing and pacing internally.
/// The processing loop calls [`next_sample`](SampleSource::next_sample) in a
/// select! with cancellation.
#[async_trait]
pub trait SampleSource: Send + 'static {
    /// Read the next frame from the source.
    ///
    /// Returns `SampleEvent::Eof` when no more data is available.
    /// Returns `Err` on read failures.
    async fn next_sample(&mut self) -> Result<SampleEvent>;

    /// Human-readable name for logging (e.g. "replay", "stdin").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Replay Source (CSV file / synthetic session)
// ============================================================================

/// Replays pre-loaded frames with optional inter-frame delay.
pub struct ReplaySource {
    samples: std::vec::IntoIter<FrameSample>,
    delay_ms: u64,
    yielded_first: bool,
    name: String,
}

impl ReplaySource {
    pub fn new(samples: Vec<FrameSample>, delay_ms: u64) -> Self {
        Self {
            samples: samples.into_iter(),
            delay_ms,
            yielded_first: false,
            name: "replay".to_string(),
        }
    }

    /// Override the name shown in logs.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl SampleSource for ReplaySource {
    async fn next_sample(&mut self) -> Result<SampleEvent> {
        // No delay before the first frame
        if self.yielded_first && self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }
        match self.samples.next() {
            Some(s) => {
                self.yielded_first = true;
                Ok(SampleEvent::Sample(s))
            }
            None => Ok(SampleEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// JSON Lines Source (stdin or any buffered reader)
// ============================================================================

/// Reads JSON-formatted frames, one object per line.
///
/// Used with the simulation binary:
/// `simulation | posture-guard --stdin`
pub struct JsonLinesSource<R> {
    reader: R,
    line_buffer: String,
    name: &'static str,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_buffer: String::with_capacity(256),
            name: "json-lines",
        }
    }
}

impl JsonLinesSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            line_buffer: String::with_capacity(256),
            name: "stdin",
        }
    }
}

#[async_trait]
impl<R> SampleSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn next_sample(&mut self) -> Result<SampleEvent> {
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(SampleEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match parse_json_frame(line, wall_clock_now()) {
                Ok(sample) => return Ok(SampleEvent::Sample(sample)),
                Err(e) => {
                    tracing::warn!(source = self.name, error = %e, "Skipping malformed frame");
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replay_source_yields_then_eof() {
        let mut source = ReplaySource::new(
            vec![FrameSample::absent(1.0), FrameSample::present(2.0, 0.1, 0.0)],
            0,
        );
        assert_eq!(
            source.next_sample().await.unwrap(),
            SampleEvent::Sample(FrameSample::absent(1.0))
        );
        assert!(matches!(source.next_sample().await.unwrap(), SampleEvent::Sample(_)));
        assert_eq!(source.next_sample().await.unwrap(), SampleEvent::Eof);
        assert_eq!(source.next_sample().await.unwrap(), SampleEvent::Eof);
    }

    #[tokio::test]
    async fn test_json_lines_skips_blank_and_malformed() {
        let reader = tokio_test::io::Builder::new()
            .read(b"{\"timestamp\":1.0,\"body_detected\":true,\"forward_lean\":0.1,\"shoulder_tilt\":0.0}\n")
            .read(b"\n")
            .read(b"garbage\n")
            .read(b"{\"timestamp\":2.0,\"body_detected\":false}\n")
            .build();
        let mut source = JsonLinesSource::new(BufReader::new(reader));

        assert_eq!(
            source.next_sample().await.unwrap(),
            SampleEvent::Sample(FrameSample::present(1.0, 0.1, 0.0))
        );
        assert_eq!(
            source.next_sample().await.unwrap(),
            SampleEvent::Sample(FrameSample::absent(2.0))
        );
        assert_eq!(source.next_sample().await.unwrap(), SampleEvent::Eof);
        assert_eq!(source.source_name(), "json-lines");
    }

    #[tokio::test]
    async fn test_json_lines_propagates_read_error() {
        let reader = tokio_test::io::Builder::new()
            .read_error(std::io::Error::new(std::io::ErrorKind::Other, "camera unplugged"))
            .build();
        let mut source = JsonLinesSource::new(BufReader::new(reader));
        assert!(source.next_sample().await.is_err());
    }
}
