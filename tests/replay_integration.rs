//! Replay Integration Tests
//!
//! Runs recorded and synthetic sessions end-to-end through the processing
//! loop: source → coordinator → sinks → published `AppState`.

use std::io::Write;
use std::sync::{Arc, Mutex};

use posture_guard::config::MonitorConfig;
use posture_guard::pipeline::{
    AppState, JsonEventSink, JsonLinesSource, NotificationSink, ProcessingLoop, ReplaySource,
    SessionCoordinator, SystemStatus,
};
use posture_guard::sensors;
use posture_guard::types::{TickOutput, Timestamp};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Sink that records every notification it receives.
#[derive(Clone, Default)]
struct RecordingSink {
    events: Arc<Mutex<Vec<&'static str>>>,
    ticks: Arc<Mutex<Vec<TickOutput>>>,
}

impl NotificationSink for RecordingSink {
    fn beep(&mut self) -> anyhow::Result<()> {
        self.events.lock().unwrap().push("beep");
        Ok(())
    }

    fn start_break_alert(&mut self) -> anyhow::Result<()> {
        self.events.lock().unwrap().push("break_start");
        Ok(())
    }

    fn stop_break_alert(&mut self) -> anyhow::Result<()> {
        self.events.lock().unwrap().push("break_stop");
        Ok(())
    }

    fn render(&mut self, output: &TickOutput) -> anyhow::Result<()> {
        self.ticks.lock().unwrap().push(*output);
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "recording"
    }
}

/// Sink whose every call fails.
struct FailingSink;

impl NotificationSink for FailingSink {
    fn beep(&mut self) -> anyhow::Result<()> {
        anyhow::bail!("speaker unplugged")
    }

    fn start_break_alert(&mut self) -> anyhow::Result<()> {
        anyhow::bail!("speaker unplugged")
    }

    fn stop_break_alert(&mut self) -> anyhow::Result<()> {
        anyhow::bail!("speaker unplugged")
    }

    fn render(&mut self, _output: &TickOutput) -> anyhow::Result<()> {
        anyhow::bail!("display gone")
    }

    fn sink_name(&self) -> &str {
        "failing"
    }
}

fn processing_loop(start: Timestamp, state: &Arc<RwLock<AppState>>) -> ProcessingLoop {
    let coordinator = SessionCoordinator::new(MonitorConfig::default(), start).unwrap();
    ProcessingLoop::new(coordinator, Arc::clone(state), CancellationToken::new())
}

#[tokio::test]
async fn synthetic_session_exercises_every_alert_path() {
    let start = 1_700_000_000.0;
    let samples = sensors::generate_session_data(start);
    let total = samples.len() as u64;

    let state = Arc::new(RwLock::new(AppState::default()));
    let sink = RecordingSink::default();
    let mut source = ReplaySource::new(samples, 0).named("synthetic");

    let stats = processing_loop(start, &state)
        .with_sink(Box::new(sink.clone()))
        .with_sink(Box::new(FailingSink))
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(stats.samples_processed, total);
    assert!(stats.beeps >= 1, "stats: {stats}");
    assert!(stats.breaks_started >= 1, "stats: {stats}");
    assert_eq!(stats.session_resets, 1);
    assert!(stats.absent_samples > 0);

    // Every tick reached the working sink despite the failing one
    let ticks = sink.ticks.lock().unwrap();
    assert_eq!(ticks.len() as u64, total);

    // Intents were dispatched in the order they were issued
    let events = sink.events.lock().unwrap();
    let first_beep = events.iter().position(|e| *e == "beep").unwrap();
    let first_break = events.iter().position(|e| *e == "break_start").unwrap();
    let first_stop = events.iter().position(|e| *e == "break_stop").unwrap();
    assert!(first_beep < first_break);
    assert!(first_break < first_stop);

    let published = state.read().await;
    assert_eq!(published.status, SystemStatus::Stopped);
    assert_eq!(published.source.as_deref(), Some("synthetic"));
    assert_eq!(published.stats, stats);
    let summary = published.summary.unwrap();
    assert!(summary.bad_frames > 0);
    assert!(summary.good_frames > 0);
    assert!(summary.bad_posture_pct > 50.0);
    assert_eq!(summary.alerts_triggered, stats.beeps + stats.breaks_started);
}

#[tokio::test]
async fn csv_replay_matches_direct_processing() {
    let samples = sensors::generate_session_data(0.0);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "timestamp,body_detected,forward_lean,shoulder_tilt").unwrap();
    for s in &samples {
        if s.body_detected {
            writeln!(
                file,
                "{},1,{},{}",
                s.timestamp, s.signal.forward_lean, s.signal.shoulder_tilt
            )
            .unwrap();
        } else {
            writeln!(file, "{},0,,", s.timestamp).unwrap();
        }
    }
    file.flush().unwrap();

    let loaded = sensors::read_csv_samples(file.path()).unwrap();
    assert_eq!(loaded, samples);

    let mut direct = SessionCoordinator::new(MonitorConfig::default(), 0.0).unwrap();
    for s in &samples {
        direct.process_sample(s);
    }

    let state = Arc::new(RwLock::new(AppState::default()));
    let stats = processing_loop(0.0, &state)
        .run(&mut ReplaySource::new(loaded, 0))
        .await
        .unwrap();
    assert_eq!(stats, direct.get_stats());
}

#[tokio::test]
async fn json_lines_replay_emits_ndjson_ticks() {
    let input = concat!(
        "{\"timestamp\": 0.0, \"body_detected\": true, \"forward_lean\": 0.1, \"shoulder_tilt\": 0.0}\n",
        "not json at all\n",
        "{\"timestamp\": 0.5, \"forward_lean\": 0.1, \"shoulder_tilt\": 0.0}\n",
        "{\"timestamp\": 1.0, \"body_detected\": false}\n",
    );
    let mut source = JsonLinesSource::new(tokio::io::BufReader::new(input.as_bytes()));

    let state = Arc::new(RwLock::new(AppState::default()));
    let stats = processing_loop(0.0, &state)
        .with_sink(Box::new(JsonEventSink::new(Vec::new())))
        .run(&mut source)
        .await
        .unwrap();

    // The malformed line is skipped, the rest are processed
    assert_eq!(stats.samples_processed, 3);
    assert_eq!(stats.absent_samples, 1);

    let published = state.read().await;
    assert_eq!(published.source.as_deref(), Some("json-lines"));
    assert_eq!(published.calibration.calibration_sample_count, 2);
    let latest = published.latest_tick.unwrap();
    assert_eq!(latest.timestamp, 1.0);
    assert_eq!(latest.label.to_string(), "Unknown");
}

#[tokio::test]
async fn json_event_sink_writes_one_line_per_tick() {
    let mut sink = JsonEventSink::new(Vec::new());
    let mut coordinator = SessionCoordinator::new(MonitorConfig::default(), 0.0).unwrap();
    for s in sensors::generate_session_data(0.0).iter().take(5) {
        let output = coordinator.process_sample(s);
        sink.render(&output).unwrap();
    }

    let written = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 5);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["label"], "Calibrating");
    assert_eq!(first["beep"], false);
}

#[tokio::test]
async fn recorded_json_lines_start_the_session_at_their_first_frame() {
    // 400 s of upright frames recorded long before the process started
    let input: String = (0..400)
        .map(|i| {
            format!(
                "{{\"timestamp\": {}.0, \"body_detected\": true, \"forward_lean\": 0.1, \"shoulder_tilt\": 0.0}}\n",
                1_600_000_000 + i
            )
        })
        .collect();
    let mut source =
        JsonLinesSource::new(tokio::io::BufReader::new(std::io::Cursor::new(input.into_bytes())));

    let state = Arc::new(RwLock::new(AppState::default()));
    let coordinator = SessionCoordinator::starting_at_first_frame(MonitorConfig::default()).unwrap();
    let processing_loop =
        ProcessingLoop::new(coordinator, Arc::clone(&state), CancellationToken::new());
    let stats = tokio::spawn(async move { processing_loop.run(&mut source).await })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stats.samples_processed, 400);

    let published = state.read().await;
    let summary = published.summary.unwrap();
    assert_eq!(summary.session_duration_secs, 399);
    assert_eq!(summary.fatigue_score, 19);
    assert_eq!(published.latest_tick.unwrap().fatigue_score, 19);
    assert_eq!(published.fatigue_history.back().unwrap().elapsed_seconds, 399.0);
}
