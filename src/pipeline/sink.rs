//! Notification sinks: where beeps, break alerts and per-frame output go.
//!
//! The decision engine only emits intents. A sink turns them into something
//! the user notices (terminal bell, log line, NDJSON event stream).

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::types::TickOutput;

/// Consumer of alert intents.
///
/// The processing loop calls [`beep`](Self::beep) on a beep intent,
/// [`start_break_alert`](Self::start_break_alert) on break start (looping
/// playback), [`stop_break_alert`](Self::stop_break_alert) on break stop and
/// [`render`](Self::render) for every frame. Errors are logged by the loop
/// and never stop processing.
pub trait NotificationSink: Send + Sync + 'static {
    fn beep(&mut self) -> Result<()>;

    fn start_break_alert(&mut self) -> Result<()>;

    fn stop_break_alert(&mut self) -> Result<()>;

    fn render(&mut self, output: &TickOutput) -> Result<()>;

    /// Human-readable name for logging.
    fn sink_name(&self) -> &str;
}

// ============================================================================
// Console Sink
// ============================================================================

/// Logs notifications through tracing, optionally ringing the terminal bell.
///
/// The bell goes to stderr so stdout stays clean for `--emit-json`.
pub struct ConsoleSink<B = std::io::Stderr> {
    bell: Option<B>,
    last_prompt: Option<&'static str>,
}

impl ConsoleSink {
    pub fn new(bell: bool) -> Self {
        Self {
            bell: bell.then(std::io::stderr),
            last_prompt: None,
        }
    }
}

impl<B: Write> ConsoleSink<B> {
    /// Ring the bell on `writer` instead of stderr.
    pub fn with_bell(writer: B) -> Self {
        Self {
            bell: Some(writer),
            last_prompt: None,
        }
    }

    fn ring(&mut self) -> Result<()> {
        if let Some(out) = self.bell.as_mut() {
            out.write_all(b"\x07").context("failed to ring terminal bell")?;
            out.flush().context("failed to flush bell output")?;
        }
        Ok(())
    }
}

impl<B: Write + Send + Sync + 'static> NotificationSink for ConsoleSink<B> {
    fn beep(&mut self) -> Result<()> {
        info!("🔔 Sit straight!");
        self.ring()
    }

    fn start_break_alert(&mut self) -> Result<()> {
        info!("☕ Break alert playing, take a break");
        self.ring()
    }

    fn stop_break_alert(&mut self) -> Result<()> {
        info!("Break alert stopped");
        Ok(())
    }

    fn render(&mut self, output: &TickOutput) -> Result<()> {
        let prompt = output.prompt();
        if prompt != self.last_prompt {
            if let Some(text) = prompt {
                info!(fatigue = output.fatigue_score, bad_secs = output.bad_duration_secs, "{}", text);
            }
            self.last_prompt = prompt;
        }
        debug!(
            posture = %output.label,
            slouch = output.slouch_value,
            bad_secs = output.bad_duration_secs,
            fatigue = output.fatigue_score,
            "frame"
        );
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "console"
    }
}

// ============================================================================
// JSON Event Sink
// ============================================================================

/// Writes every frame result as one JSON object per line.
///
/// Intents are already part of each `TickOutput`, so the explicit
/// notification calls write nothing.
pub struct JsonEventSink<W> {
    writer: W,
}

impl<W: Write + Send + Sync + 'static> JsonEventSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonEventSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + Sync + 'static> NotificationSink for JsonEventSink<W> {
    fn beep(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_break_alert(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop_break_alert(&mut self) -> Result<()> {
        Ok(())
    }

    fn render(&mut self, output: &TickOutput) -> Result<()> {
        serde_json::to_writer(&mut self.writer, output).context("failed to encode frame")?;
        self.writer
            .write_all(b"\n")
            .context("failed to write frame")?;
        self.writer.flush().context("failed to flush frame stream")
    }

    fn sink_name(&self) -> &str {
        "json"
    }
}
