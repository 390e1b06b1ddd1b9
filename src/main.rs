//! Posture Guard - Posture & Fatigue Decision Engine
//!
//! Turns per-frame pose signals into posture labels, a fatigue score and
//! break/beep alerts, with a JSON dashboard API.
//!
//! # Usage
//!
//! ```bash
//! # Run with synthetic session data
//! cargo run --release
//!
//! # Run with the noisy simulator piped into stdin
//! ./simulation --minutes 5 --speed 10 | ./posture-guard --stdin
//!
//! # Replay a recorded session as fast as possible, NDJSON ticks on stdout
//! ./posture-guard --csv session.csv --speed 0 --no-server --emit-json
//!
//! # Check a config file
//! ./posture-guard check-config posture_guard.toml
//! ```
//!
//! # Environment Variables
//!
//! - `POSTURE_GUARD_CONFIG`: Path to the TOML config (default: `./posture_guard.toml`)
//! - `POSTURE_GUARD_SERVER_ADDR`: HTTP bind address (overrides `[server] addr`)
//! - `POSTURE_GUARD_CORS_ORIGINS`: Comma-separated origins allowed by CORS
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use posture_guard::api::{create_app, DashboardState};
use posture_guard::config::{self, validation, ConfigError, MonitorConfig};
use posture_guard::pipeline::{
    AppState, ConsoleSink, JsonEventSink, JsonLinesSource, ProcessingLoop, ReplaySource,
    SampleSource, SessionCoordinator,
};
use posture_guard::sensors;
use posture_guard::types::{wall_clock_now, FrameSample};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "posture-guard")]
#[command(about = "Posture Guard - posture and fatigue decision engine")]
#[command(version)]
struct CliArgs {
    /// Read frames from stdin (one JSON object per line) instead of synthetic data
    /// Use with simulator: ./simulation | ./posture-guard --stdin
    #[arg(long, conflicts_with = "csv")]
    stdin: bool,

    /// Path to CSV file with recorded frames
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Speed multiplier for replay (1 = realtime, 10 = 10x faster, 0 = no delay)
    #[arg(long, default_value = "1")]
    speed: u64,

    /// Override the server address (default: `[server] addr` from config)
    #[arg(short, long, env = "POSTURE_GUARD_SERVER_ADDR")]
    addr: Option<String>,

    /// Load this config file instead of the standard search order
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not start the dashboard HTTP server
    #[arg(long)]
    no_server: bool,

    /// Write every tick to stdout as a JSON line
    #[arg(long)]
    emit_json: bool,

    /// Ring the terminal bell on beeps and break alerts
    #[arg(long)]
    bell: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Validate a config file and print errors and warnings
    CheckConfig {
        /// Path to the TOML config file
        path: PathBuf,
    },
}

// ============================================================================
// Config Check
// ============================================================================

/// Print every problem found in a config file.
///
/// Returns an error when the file cannot be used to start a session.
fn run_check_config(path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    println!("Checking {}", path.display());
    println!();

    let mut warning_count = 0usize;
    for w in validation::validate_unknown_keys(&contents) {
        println!("  WARNING: {w}");
        warning_count += 1;
    }

    let config = MonitorConfig::from_toml_str(&contents)
        .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;

    let (_, range_warnings) = validation::validate_physical_ranges(&config);
    for w in range_warnings {
        println!("  WARNING: {w}");
        warning_count += 1;
    }

    match config.validate() {
        Ok(()) => {
            println!();
            println!("  Config is valid ({warning_count} warning(s))");
            Ok(())
        }
        Err(ConfigError::Validation(errors)) => {
            for e in &errors {
                println!("  ERROR: {e}");
            }
            println!();
            Err(anyhow::anyhow!(
                "{} validation error(s) in {}",
                errors.len(),
                path.display()
            ))
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    FrameProcessor,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpServer => write!(f, "HttpServer"),
            Self::FrameProcessor => write!(f, "FrameProcessor"),
        }
    }
}

// ============================================================================
// Task Spawning
// ============================================================================

/// Bind the dashboard listener and spawn the HTTP server task into the JoinSet.
async fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    server_addr: &str,
    dashboard_state: DashboardState,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🌐 Starting HTTP server on {}...", server_addr);
    let app = create_app(dashboard_state);
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("Failed to bind to {server_addr}"))?;

    info!("✓ HTTP server listening on {}", server_addr);
    info!("🎯 Dashboard API available at: http://{}/api/v1/status", server_addr);
    info!("");

    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });

    Ok(())
}

/// Monitor all tasks; cancel everything as soon as one fails.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("🛑 Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("🔒 Supervisor: Task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("🔒 Supervisor: Task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("🔒 Supervisor: Task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("🔒 Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Let in-flight tasks observe the cancellation before the runtime exits
    while let Some(result) = task_set.join_next().await {
        if let Ok(Err(e)) = result {
            warn!("🔒 Supervisor: Task ended with error during shutdown: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Unified Pipeline Runner
// ============================================================================

/// Options shared by every input mode.
struct RunOptions {
    server_addr: Option<String>,
    emit_json: bool,
    bell: bool,
}

/// Run the decision engine against `source` until it is exhausted or Ctrl+C.
///
/// The session clock starts at the first frame's own timestamp.
async fn run_pipeline<S: SampleSource>(
    mut source: S,
    config: MonitorConfig,
    options: RunOptions,
    cancel_token: CancellationToken,
) -> Result<()> {
    let coordinator = SessionCoordinator::starting_at_first_frame(config.clone())
        .context("Invalid monitor configuration")?;

    let app_state = Arc::new(RwLock::new(AppState::new(
        config.session.name.clone(),
        config.dashboard.fatigue_history_capacity,
    )));
    info!("✓ Application state initialized");

    info!("🔒 Supervisor: Initializing task monitoring");
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: HTTP Server
    if let Some(addr) = options.server_addr.as_deref() {
        let dashboard_state = DashboardState::new(Arc::clone(&app_state), config);
        spawn_http_server(&mut task_set, addr, dashboard_state, cancel_token.clone()).await?;
    } else {
        info!("🌐 HTTP server disabled (--no-server)");
    }

    // Task 2: Frame Processor
    let proc_cancel = cancel_token.clone();
    let proc_state = Arc::clone(&app_state);
    task_set.spawn(async move {
        info!("[FrameProcessor] Task starting");

        let mut processing_loop = ProcessingLoop::new(coordinator, proc_state, proc_cancel)
            .with_sink(Box::new(ConsoleSink::new(options.bell)));
        if options.emit_json {
            processing_loop = processing_loop.with_sink(Box::new(JsonEventSink::stdout()));
        }

        let stats = processing_loop.run(&mut source).await?;
        info!("[FrameProcessor] {}", stats);
        Ok(TaskName::FrameProcessor)
    });

    run_supervisor(&mut task_set, cancel_token).await
}

// ============================================================================
// Data Loading (CSV / Synthetic)
// ============================================================================

/// Load frames from a CSV file or generate a synthetic session.
fn load_samples(csv_path: Option<&Path>) -> Result<Vec<FrameSample>> {
    if let Some(path) = csv_path {
        info!("📂 Loading frames from CSV: {}", path.display());
        let data = sensors::read_csv_samples(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if data.is_empty() {
            return Err(anyhow::anyhow!("No frames loaded from CSV"));
        }
        info!("   Loaded {} frames", data.len());
        Ok(data)
    } else {
        info!("🧪 Using synthetic session data (calibrate, slouch, leave, return)");
        let data = sensors::generate_session_data(wall_clock_now());
        info!("   Generated {} frames", data.len());
        Ok(data)
    }
}

/// Load the monitor config from `--config` (fails hard) or the search order.
fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    match path {
        Some(p) => {
            let config = MonitorConfig::load_from_file(p)
                .with_context(|| format!("Failed to load config {}", p.display()))?;
            info!(path = %p.display(), "Loaded monitor config");
            Ok(config)
        }
        None => Ok(MonitorConfig::load()),
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    // Subcommand dispatch
    if let Some(SubCommand::CheckConfig { path }) = &args.command {
        return run_check_config(path);
    }

    let monitor_config = load_config(args.config.as_deref())?;
    info!(
        "Session: {} | Calibration: {} frames | Break after fatigue {}",
        monitor_config.session.name,
        monitor_config.calibration.calibration_samples,
        monitor_config.alerts.break_fatigue_threshold
    );

    let server_addr = if args.no_server {
        None
    } else {
        Some(
            args.addr
                .clone()
                .unwrap_or_else(|| monitor_config.server.addr.clone()),
        )
    };
    let options = RunOptions {
        server_addr,
        emit_json: args.emit_json,
        bell: args.bell,
    };

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Posture Guard");
    info!("  Posture & Fatigue Decision Engine");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    if args.stdin {
        // --- Stdin mode ---
        info!("📥 Input: stdin (JSON frames, one per line)");
        run_pipeline(JsonLinesSource::stdin(), monitor_config, options, cancel_token).await?;
    } else {
        // --- CSV / synthetic mode ---
        let samples = load_samples(args.csv.as_deref())?;
        let delay_ms = if args.speed == 0 {
            0
        } else {
            config::defaults::SIMULATION_BASE_DELAY_MS / args.speed
        };
        info!(
            "⏱️  Speed: {}x ({}ms delay between frames)",
            if args.speed == 0 {
                "max".to_string()
            } else {
                args.speed.to_string()
            },
            delay_ms
        );
        let name = if args.csv.is_some() { "csv" } else { "synthetic" };
        info!("📊 {} frames queued for processing", samples.len());
        let source = ReplaySource::new(samples, delay_ms).named(name);
        run_pipeline(source, monitor_config, options, cancel_token).await?;
    }

    info!("");
    info!("✓ Posture Guard shutdown complete");
    Ok(())
}
