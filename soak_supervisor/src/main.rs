//! # Soak Supervisor Binary
//!
//! Runs one exercise behavior until the battery reaches the critical voltage
//! or the operator interrupts the run.
//!
//! # Usage
//!
//! ```bash
//! # Idle soak, samples printed to the log only
//! soak_supervisor --test idle --output screen
//!
//! # Drivetrain soak recorded to ~/battery_soak
//! soak_supervisor --test drivetrain --output file
//!
//! # Settings from a file, record label overridden
//! soak_supervisor --config config/harness.toml --label bench-2
//!
//! # Re-run the supervisor against a recorded discharge
//! soak_supervisor --test arm --replay ~/battery_soak/2024-05-01_101500_arm.csv
//! ```

#![deny(warnings)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use soak_common::config::{ConfigLoader, HarnessConfig, LogLevel, TestKind};
use soak_common::consts::IDLE_TICK_PERIOD;
use soak_common::telemetry::TelemetrySource;
use soak_supervisor::behavior::{ActuatorSet, BehaviorSelector};
use soak_supervisor::cycle::SupervisorLoop;
use soak_supervisor::safety::{SafetySupervisor, ShutdownReason, ShutdownSignal};
use soak_supervisor::sim::{SimArm, SimDrive, SimGripper};
use soak_supervisor::telemetry::{ReplaySource, SimulatedBattery, spawn_transport};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Soak Supervisor - battery endurance test with voltage-triggered shutdown
#[derive(Parser, Debug)]
#[command(name = "soak_supervisor")]
#[command(version)]
#[command(about = "Exercise the robot until the battery reaches critical voltage")]
#[command(long_about = None)]
struct Args {
    /// Path to harness configuration file (harness.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Behavior to exercise: idle, drivetrain or arm
    #[arg(short, long, value_name = "KIND")]
    test: Option<String>,

    /// Where samples go: screen or file
    #[arg(short, long, value_name = "MODE")]
    output: Option<String>,

    /// Record file label (defaults to the test kind)
    #[arg(long)]
    label: Option<String>,

    /// Record directory (defaults to ~/battery_soak)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Replay telemetry from a recorded CSV instead of simulating it
    #[arg(long, value_name = "CSV")]
    replay: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("FATAL: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => HarnessConfig::load(path),
        None => Ok(HarnessConfig::default()),
    };
    let log_level = loaded
        .as_ref()
        .map(|config| config.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    info!("Soak Supervisor v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = loaded?;
    apply_overrides(&mut config, &args);
    let test = config.resolve()?;
    info!(
        "Test '{}' on '{}' (output={}, label={})",
        test.kind, config.shared.service_name, test.output, test.label
    );

    let actuators = match test.kind {
        TestKind::Idle => ActuatorSet::new(),
        TestKind::Drivetrain => ActuatorSet::new().with_drive(Arc::new(SimDrive::new())),
        TestKind::Arm => ActuatorSet::new()
            .with_arm(
                Arc::new(SimArm::new().with_motion_time(Duration::from_millis(200))),
                Arc::new(SimGripper::new()),
            )
            .with_retry(test.retry),
    };
    let behavior = BehaviorSelector::new(test.kind, actuators)?;

    let signal = ShutdownSignal::new();
    let supervisor = match &test.output_dir {
        Some(dir) => SafetySupervisor::with_output_dir(test.output, &test.label, dir, signal.clone()),
        None => SafetySupervisor::new(test.output, &test.label, signal.clone()),
    }?
    .with_safe_stop(behavior.safe_stop_action());
    let supervisor = Arc::new(supervisor);

    let interrupt = supervisor.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        interrupt.request_shutdown(ShutdownReason::OperatorInterrupt);
    })?;

    let source: Box<dyn TelemetrySource> = match &args.replay {
        Some(path) => Box::new(ReplaySource::open(path)?),
        None => Box::new(SimulatedBattery::from_config(&config.simulation, test.kind)),
    };
    let period = Duration::from_millis(config.simulation.sample_period_ms);
    let transport = spawn_transport(source, supervisor.clone(), period)?;

    let mut supervisor_loop = SupervisorLoop::new(behavior, signal);
    if test.kind == TestKind::Idle {
        supervisor_loop = supervisor_loop.with_pace(IDLE_TICK_PERIOD);
    }
    let report = supervisor_loop.run();

    match transport.join() {
        Ok(delivered) => info!("Telemetry transport delivered {} samples", delivered),
        Err(_) => warn!("Telemetry transport panicked"),
    }

    if let Some(reason) = report.reason {
        warn!("{reason}");
    }
    info!(
        "Soak Supervisor shutdown complete ({} ticks, {} samples supervised in {:.1}s)",
        report.ticks,
        supervisor.samples_seen(),
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

/// CLI flags take precedence over the configuration file.
fn apply_overrides(config: &mut HarnessConfig, args: &Args) {
    if let Some(kind) = &args.test {
        config.test.kind = kind.clone();
    }
    if let Some(output) = &args.output {
        config.test.output = output.clone();
    }
    if let Some(label) = &args.label {
        config.test.label = Some(label.clone());
    }
    if let Some(dir) = &args.output_dir {
        config.test.output_dir = Some(dir.clone());
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured.as_directive().parse().unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
