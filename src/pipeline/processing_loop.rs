//! Unified frame processing loop shared across all input modes.
//!
//! Pulls frames from a [`SampleSource`], runs them through the
//! [`SessionCoordinator`], dispatches intents to every [`NotificationSink`]
//! and publishes a snapshot to the shared [`AppState`].

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::sink::NotificationSink;
use super::source::{SampleEvent, SampleSource};
use super::{AppState, SessionCoordinator, SessionStats, SystemStatus};
use crate::config::defaults::{MAX_CONSECUTIVE_SOURCE_ERRORS, PROGRESS_LOG_INTERVAL_TICKS};
use crate::types::{wall_clock_now, FrameSample, TickOutput, Timestamp};

// ============================================================================
// Processing Loop
// ============================================================================

/// Owns all state needed for the frame processing loop.
///
/// Built with [`new()`](ProcessingLoop::new), optionally given sinks with
/// [`with_sink()`](ProcessingLoop::with_sink), then consumed by
/// [`run()`](ProcessingLoop::run).
pub struct ProcessingLoop {
    coordinator: SessionCoordinator,
    app_state: Arc<RwLock<AppState>>,
    sinks: Vec<Box<dyn NotificationSink>>,
    cancel_token: CancellationToken,
    /// Last frame timestamp and when it arrived, for stamping error ticks
    last_seen: Option<(Timestamp, Instant)>,
}

impl ProcessingLoop {
    pub fn new(
        coordinator: SessionCoordinator,
        app_state: Arc<RwLock<AppState>>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            app_state,
            sinks: Vec::new(),
            cancel_token,
            last_seen: None,
        }
    }

    /// Attach a notification sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Run the processing loop until the source is exhausted or cancellation.
    ///
    /// Source read errors are processed as absence frames. After
    /// `MAX_CONSECUTIVE_SOURCE_ERRORS` in a row the loop stops with an error.
    pub async fn run<S: SampleSource>(mut self, source: &mut S) -> Result<SessionStats> {
        let mut consecutive_errors = 0u32;

        info!("📊 Processing frames from {}...", source.source_name());
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        {
            let mut state = self.app_state.write().await;
            state.source = Some(source.source_name().to_string());
        }

        let outcome = loop {
            let result = tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("[FrameProcessor] Shutdown signal received");
                    break Ok(());
                }
                result = source.next_sample() => result,
            };

            let sample = match result {
                Ok(SampleEvent::Sample(sample)) => {
                    consecutive_errors = 0;
                    self.last_seen = Some((sample.timestamp, Instant::now()));
                    sample
                }
                Ok(SampleEvent::Eof) => {
                    info!(
                        "[FrameProcessor] Source reached end ({} frames processed)",
                        self.coordinator.get_stats().samples_processed
                    );
                    break Ok(());
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors > MAX_CONSECUTIVE_SOURCE_ERRORS {
                        error!(
                            errors = consecutive_errors,
                            error = %e,
                            "[FrameProcessor] Source keeps failing, stopping"
                        );
                        break Err(e);
                    }
                    warn!(
                        errors = consecutive_errors,
                        error = %e,
                        "[FrameProcessor] Source error, treating frame as absent"
                    );
                    FrameSample::absent(self.error_tick_timestamp())
                }
            };

            let output = self.coordinator.process_sample(&sample);
            self.dispatch(&output);
            self.publish(&output).await;

            let processed = self.coordinator.get_stats().samples_processed;
            if processed % PROGRESS_LOG_INTERVAL_TICKS == 0 {
                let summary = self.coordinator.summary(output.timestamp);
                info!(
                    "📈 Progress: {} frames | Posture: {} | Fatigue: {} | Good {:.1}% / Bad {:.1}% | Alerts: {}",
                    processed,
                    output.label,
                    output.fatigue_score,
                    summary.good_posture_pct,
                    summary.bad_posture_pct,
                    summary.alerts_triggered
                );
            }
        };

        let stats = self.coordinator.get_stats();
        {
            let mut state = self.app_state.write().await;
            state.stats = stats;
            state.status = if outcome.is_ok() {
                SystemStatus::Stopped
            } else {
                SystemStatus::Error
            };
        }
        self.log_final_statistics(&stats);

        match outcome {
            Ok(()) => Ok(stats),
            Err(e) => bail!("sample source '{}' failed: {e}", source.source_name()),
        }
    }

    /// Timestamp for a frame synthesised from a read error.
    ///
    /// Advances the last real timestamp by the wall time since it arrived so
    /// replayed and live clocks are never mixed.
    fn error_tick_timestamp(&self) -> Timestamp {
        self.last_seen.map_or_else(wall_clock_now, |(ts, at)| {
            ts + at.elapsed().as_secs_f64()
        })
    }

    /// Hand the frame's intents to every sink. Sink failures are logged only.
    fn dispatch(&mut self, output: &TickOutput) {
        let intents = output.intents;
        for sink in &mut self.sinks {
            let results = [
                intents.beep.then(|| sink.beep()),
                intents.break_stop.then(|| sink.stop_break_alert()),
                intents.break_start.then(|| sink.start_break_alert()),
                Some(sink.render(output)),
            ];
            for result in results.into_iter().flatten() {
                if let Err(e) = result {
                    warn!(sink = sink.sink_name(), error = %e, "Notification sink failed");
                }
            }
        }
    }

    /// Publish the latest snapshot for the dashboard.
    async fn publish(&self, output: &TickOutput) {
        let summary = self.coordinator.summary(output.timestamp);
        let point = self.coordinator.latest_fatigue_point();

        let mut state = self.app_state.write().await;
        state.status = SystemStatus::from_label(output.label);
        state.last_update = Some(chrono::Utc::now());
        state.latest_tick = Some(*output);
        state.calibration = self.coordinator.calibration_state();
        state.alerts = Some(*self.coordinator.alert_state());
        state.summary = Some(summary);
        state.stats = self.coordinator.get_stats();
        if let Some(point) = point {
            state.push_fatigue_point(point);
        }
    }

    fn log_final_statistics(&self, stats: &SessionStats) {
        let summary = self
            .coordinator
            .latest()
            .map(|tick| self.coordinator.summary(tick.timestamp));

        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("📊 FINAL STATISTICS");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("   Frames Processed:     {}", stats.samples_processed);
        info!("   Absent Frames:        {}", stats.absent_samples);
        info!("   Posture Beeps:        {}", stats.beeps);
        info!("   Breaks Started:       {}", stats.breaks_started);
        info!("   Session Resets:       {}", stats.session_resets);
        if let Some(s) = summary {
            info!("   Good / Bad Posture:   {:.1}% / {:.1}%", s.good_posture_pct, s.bad_posture_pct);
            info!("   Session Duration:     {}s", s.session_duration_secs);
            info!("   Total Bad Posture:    {}s", s.total_bad_posture_secs);
            info!("   Fatigue / Risk Score: {} / {}", s.fatigue_score, s.risk_score);
        }
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}
