//! Posture Session Simulation
//!
//! Generates noisy pose-estimation frames for testing posture-guard.
//! Simulates a working session including:
//! - Upright sitting while the baseline is captured
//! - A gradual slouch that settles into sustained bad posture
//! - Recovery to upright
//! - Leaving the desk long enough to reset the session
//! - Returning to work
//!
//! # Usage
//! ```bash
//! ./simulation --minutes 5 --speed 10 | ./posture-guard --stdin
//! ```

use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use std::io::{self, Write};
use std::time::{Duration, Instant};

use posture_guard::types::{wall_clock_now, FrameSample};

// ============================================================================
// Posture Constants
// ============================================================================

/// Forward lean of the simulated user sitting upright
const UPRIGHT_LEAN: f64 = 0.10;
/// Forward lean once fully slouched
const SLOUCHED_LEAN: f64 = 0.22;
/// Shoulder tilt while upright
const UPRIGHT_TILT: f64 = 0.01;
/// Shoulder tilt while slouched (leaning on one elbow)
const SLOUCHED_TILT: f64 = 0.04;
/// Chance per frame that the detector loses the body while someone is seated
const DETECTION_DROPOUT: f64 = 0.002;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "posture-simulation")]
#[command(about = "Pose frame simulation for posture-guard testing")]
#[command(version = "1.0")]
struct Args {
    /// Simulation duration in minutes (1-240)
    #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=240))]
    minutes: u32,

    /// Time compression factor (1 = real-time, 100 = 100x faster)
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=1000))]
    speed: u32,

    /// Output format: json or csv
    #[arg(short, long, default_value = "json")]
    format: String,

    /// Suppress session log (only output frames)
    #[arg(short, long)]
    quiet: bool,

    /// Output frame rate in Hz
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..=120))]
    frame_rate: u32,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

// ============================================================================
// Simulation Phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Sitting upright while the baseline is learned (0-15%)
    Calibration,
    /// Normal upright work (15-30%)
    Upright,
    /// Lean drifts forward (30-40%)
    SlouchOnset,
    /// Sustained slouch (40-60%)
    Slouched,
    /// Back to upright (60-70%)
    Recovery,
    /// Nobody at the desk (70-80%)
    Away,
    /// Back at the desk (80-100%)
    Return,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Calibration => "Calibration (Sitting Upright)",
            Phase::Upright => "Upright Work",
            Phase::SlouchOnset => "Slouch Onset (Gradual Lean)",
            Phase::Slouched => "Sustained Slouch",
            Phase::Recovery => "Recovery (Sitting Up)",
            Phase::Away => "Away From Desk",
            Phase::Return => "Return To Desk",
        }
    }

    fn expectation(self) -> &'static str {
        match self {
            Phase::Calibration => "Expected: Calibrating, then Good",
            Phase::Upright | Phase::Recovery => "Expected: Good, no alerts",
            Phase::SlouchOnset => "Expected: Bad once lean exceeds tolerance",
            Phase::Slouched => "Expected: Sit Straight beeps, then Take a Break",
            Phase::Away => "Expected: Unknown, session reset after timeout",
            Phase::Return => "Expected: Recalibration, then Good",
        }
    }

    fn from_progress(progress: f64) -> Self {
        match progress {
            p if p < 0.15 => Phase::Calibration,
            p if p < 0.30 => Phase::Upright,
            p if p < 0.40 => Phase::SlouchOnset,
            p if p < 0.60 => Phase::Slouched,
            p if p < 0.70 => Phase::Recovery,
            p if p < 0.80 => Phase::Away,
            _ => Phase::Return,
        }
    }
}

// ============================================================================
// Simulation State
// ============================================================================

struct SimulationState {
    rng: StdRng,
    current_phase: Phase,
    sim_time_seconds: f64,
    total_duration_seconds: f64,
    output_frame_rate: f64,
    start_timestamp: f64,

    // Current posture
    forward_lean: f64,
    shoulder_tilt: f64,

    // Statistics
    frames_generated: u64,
    absent_frames: u64,

    // Landmark jitter
    landmark_noise: Normal<f64>,
}

impl SimulationState {
    fn new(
        duration_minutes: u32,
        frame_rate: u32,
        seed: Option<u64>,
    ) -> Result<Self, rand_distr::NormalError> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            rng,
            current_phase: Phase::Calibration,
            sim_time_seconds: 0.0,
            total_duration_seconds: f64::from(duration_minutes) * 60.0,
            output_frame_rate: f64::from(frame_rate),
            start_timestamp: wall_clock_now(),
            forward_lean: UPRIGHT_LEAN,
            shoulder_tilt: UPRIGHT_TILT,
            frames_generated: 0,
            absent_frames: 0,
            landmark_noise: Normal::new(0.0, 0.004)?,
        })
    }

    fn progress(&self) -> f64 {
        self.sim_time_seconds / self.total_duration_seconds
    }

    fn update_phase(&mut self) -> bool {
        let new_phase = Phase::from_progress(self.progress());
        if new_phase == self.current_phase {
            false
        } else {
            self.current_phase = new_phase;
            true
        }
    }

    /// Move the underlying posture toward the phase target.
    fn update_posture(&mut self) {
        let (target_lean, target_tilt, rate) = match self.current_phase {
            Phase::Calibration | Phase::Upright | Phase::Return => {
                (UPRIGHT_LEAN, UPRIGHT_TILT, 0.2)
            }
            Phase::SlouchOnset => (SLOUCHED_LEAN, SLOUCHED_TILT, 0.01),
            Phase::Slouched => (SLOUCHED_LEAN, SLOUCHED_TILT, 0.05),
            Phase::Recovery => (UPRIGHT_LEAN, UPRIGHT_TILT, 0.1),
            Phase::Away => (self.forward_lean, self.shoulder_tilt, 0.0),
        };
        self.forward_lean += (target_lean - self.forward_lean) * rate;
        self.shoulder_tilt += (target_tilt - self.shoulder_tilt) * rate;
    }

    fn generate_frame(&mut self) -> FrameSample {
        self.update_posture();
        self.frames_generated += 1;

        let timestamp = self.start_timestamp + self.sim_time_seconds;
        let dropped = self.rng.gen_bool(DETECTION_DROPOUT);
        if self.current_phase == Phase::Away || dropped {
            self.absent_frames += 1;
            return FrameSample::absent(timestamp);
        }

        let lean = self.forward_lean + self.landmark_noise.sample(&mut self.rng);
        let tilt = (self.shoulder_tilt + self.landmark_noise.sample(&mut self.rng)).abs();
        FrameSample::present(timestamp, lean, tilt)
    }
}

// ============================================================================
// Session Log
// ============================================================================

fn format_time(seconds: f64) -> String {
    let hours = (seconds / 3600.0) as u32;
    let minutes = ((seconds % 3600.0) / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

fn log_session(time: f64, message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[{}] {}", format_time(time), message);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut state = SimulationState::new(args.minutes, args.frame_rate, args.seed)?;

    let total_frames = (state.total_duration_seconds * state.output_frame_rate) as u64;
    let frame_interval_real =
        Duration::from_secs_f64(1.0 / (state.output_frame_rate * f64::from(args.speed)));
    let frame_interval_sim = 1.0 / state.output_frame_rate;

    log_session(0.0, &"=".repeat(70), args.quiet);
    log_session(0.0, "POSTURE SESSION SIMULATION v1.0", args.quiet);
    log_session(0.0, &"=".repeat(70), args.quiet);
    log_session(0.0, "", args.quiet);
    log_session(0.0, "POSTURE PARAMETERS:", args.quiet);
    log_session(0.0, &format!("  Upright lean: {UPRIGHT_LEAN:.2}"), args.quiet);
    log_session(0.0, &format!("  Slouched lean: {SLOUCHED_LEAN:.2}"), args.quiet);
    log_session(0.0, "", args.quiet);
    log_session(0.0, "SIMULATION PARAMETERS:", args.quiet);
    log_session(
        0.0,
        &format!("  Duration: {} minutes ({} frames)", args.minutes, total_frames),
        args.quiet,
    );
    log_session(0.0, &format!("  Speed: {}x compression", args.speed), args.quiet);
    log_session(0.0, &format!("  Frame rate: {} Hz", args.frame_rate), args.quiet);
    if let Some(seed) = args.seed {
        log_session(0.0, &format!("  Random seed: {seed}"), args.quiet);
    }
    log_session(0.0, "", args.quiet);
    log_session(0.0, "SESSION PHASES:", args.quiet);
    log_session(0.0, "  0-15%:   Calibration (sitting upright)", args.quiet);
    log_session(0.0, "  15-30%:  Upright work", args.quiet);
    log_session(0.0, "  30-40%:  Slouch onset", args.quiet);
    log_session(0.0, "  40-60%:  Sustained slouch", args.quiet);
    log_session(0.0, "  60-70%:  Recovery", args.quiet);
    log_session(0.0, "  70-80%:  Away from desk", args.quiet);
    log_session(0.0, "  80-100%: Return to desk", args.quiet);
    log_session(0.0, &"=".repeat(70), args.quiet);
    log_session(0.0, "SIMULATION START", args.quiet);
    log_session(0.0, &"=".repeat(70), args.quiet);

    if args.format == "csv" {
        println!("timestamp,body_detected,forward_lean,shoulder_tilt");
    }

    let start_time = Instant::now();
    let mut last_log_percent = 0;

    let stdout = io::stdout();
    let mut stdout_lock = stdout.lock();

    while state.sim_time_seconds < state.total_duration_seconds {
        let loop_start = Instant::now();

        if state.update_phase() {
            let phase = state.current_phase;
            log_session(state.sim_time_seconds, "", args.quiet);
            log_session(state.sim_time_seconds, &format!(">>> PHASE: {}", phase.name()), args.quiet);
            log_session(state.sim_time_seconds, &format!("    {}", phase.expectation()), args.quiet);
            log_session(state.sim_time_seconds, "", args.quiet);
        }

        // Progress logging (every 10%)
        let current_percent = (state.progress() * 100.0) as u32 / 10 * 10;
        if current_percent > last_log_percent && current_percent <= 100 {
            log_session(
                state.sim_time_seconds,
                &format!(
                    "Progress: {}% | Lean: {:.3} | Tilt: {:.3}",
                    current_percent, state.forward_lean, state.shoulder_tilt
                ),
                args.quiet,
            );
            last_log_percent = current_percent;
        }

        let frame = state.generate_frame();

        if args.format == "csv" {
            if frame.body_detected {
                writeln!(
                    stdout_lock,
                    "{:.3},1,{:.5},{:.5}",
                    frame.timestamp, frame.signal.forward_lean, frame.signal.shoulder_tilt
                )?;
            } else {
                writeln!(stdout_lock, "{:.3},0,,", frame.timestamp)?;
            }
        } else {
            writeln!(stdout_lock, "{}", serde_json::to_string(&frame)?)?;
        }

        stdout_lock.flush()?;

        state.sim_time_seconds += frame_interval_sim;

        // Sleep for time compression
        if args.speed < 1000 {
            let elapsed = loop_start.elapsed();
            if elapsed < frame_interval_real {
                std::thread::sleep(frame_interval_real - elapsed);
            }
        }
    }

    stdout_lock.flush()?;
    drop(stdout_lock);

    let total_elapsed = start_time.elapsed();

    log_session(state.sim_time_seconds, &"=".repeat(70), args.quiet);
    log_session(state.sim_time_seconds, "SIMULATION COMPLETE", args.quiet);
    log_session(state.sim_time_seconds, &"=".repeat(70), args.quiet);
    log_session(state.sim_time_seconds, &format!("Total frames: {}", state.frames_generated), args.quiet);
    log_session(state.sim_time_seconds, &format!("Absent frames: {}", state.absent_frames), args.quiet);
    log_session(
        state.sim_time_seconds,
        &format!("Real time: {:.1}s", total_elapsed.as_secs_f64()),
        args.quiet,
    );
    log_session(state.sim_time_seconds, &"=".repeat(70), args.quiet);

    Ok(())
}
