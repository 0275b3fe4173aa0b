//! Telemetry transport and built-in sources.
//!
//! The transport runs on its own thread and hands every sample to
//! [`SafetySupervisor::on_telemetry`]. It stops once the shutdown signal is
//! set. If the source runs dry first, the run is stopped with
//! [`ShutdownReason::TelemetryEnded`], since the battery can no longer be
//! watched.
//!
//! Sources:
//! - [`SimulatedBattery`] - deterministic discharge model for bench runs
//! - [`ReplaySource`] - replays a previously recorded CSV file

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use soak_common::config::{SimulationSection, TestKind};
use soak_common::consts::{NOMINAL_CONTROLLER_VOLTAGE, NOMINAL_RAIL_VOLTAGE};
use soak_common::telemetry::{TelemetrySample, TelemetrySource};
use tracing::{debug, info, warn};

use crate::record::{PersistenceError, read_records};
use crate::safety::{SafetySupervisor, ShutdownReason};

/// Start the transport thread.
///
/// The thread pulls one sample per `period` and returns the number of
/// samples delivered when it exits.
///
/// # Errors
/// Returns the I/O error if the thread cannot be spawned.
pub fn spawn_transport(
    mut source: Box<dyn TelemetrySource>,
    supervisor: Arc<SafetySupervisor>,
    period: Duration,
) -> io::Result<JoinHandle<u64>> {
    thread::Builder::new()
        .name("telemetry".to_string())
        .spawn(move || {
            info!(
                "Telemetry transport started (source={}, period={}ms)",
                source.name(),
                period.as_millis()
            );
            let mut delivered: u64 = 0;
            while !supervisor.signal().is_set() {
                match source.next_sample() {
                    Some(sample) => {
                        supervisor.on_telemetry(&sample);
                        delivered += 1;
                    }
                    None => {
                        warn!("Telemetry source '{}' exhausted", source.name());
                        supervisor.request_shutdown(ShutdownReason::TelemetryEnded);
                        break;
                    }
                }
                if !period.is_zero() {
                    thread::sleep(period);
                }
            }
            debug!("Telemetry transport exiting after {} samples", delivered);
            delivered
        })
}

/// Relative battery load of each behavior in the discharge model.
pub const fn load_factor(kind: TestKind) -> f64 {
    match kind {
        TestKind::Idle => 1.0,
        TestKind::Drivetrain => 2.0,
        TestKind::Arm => 1.5,
    }
}

/// Linear discharge model.
///
/// Battery voltage drops by `drain_per_sample × load` per sample; the rail
/// and controller voltages sag in proportion to the battery drop.
#[derive(Debug, Clone)]
pub struct SimulatedBattery {
    start_voltage: f64,
    voltage: f64,
    drain: f64,
}

impl SimulatedBattery {
    /// Sag of the 13.8 V rail per volt of battery drop.
    const RAIL_SAG: f64 = 0.05;
    /// Sag of the controller supply per volt of battery drop.
    const CONTROLLER_SAG: f64 = 0.01;

    /// Battery starting at `start_voltage` losing `drain` volts per sample.
    pub fn new(start_voltage: f64, drain: f64) -> Self {
        Self {
            start_voltage,
            voltage: start_voltage,
            drain,
        }
    }

    /// Battery configured from the `[simulation]` section for `kind`.
    pub fn from_config(section: &SimulationSection, kind: TestKind) -> Self {
        Self::new(
            section.start_voltage,
            section.drain_per_sample * load_factor(kind),
        )
    }

    /// Voltage of the next sample.
    pub fn voltage(&self) -> f64 {
        self.voltage
    }
}

impl TelemetrySource for SimulatedBattery {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn next_sample(&mut self) -> Option<TelemetrySample> {
        let drop = self.start_voltage - self.voltage;
        let sample = TelemetrySample::now(
            self.voltage,
            NOMINAL_RAIL_VOLTAGE - drop * Self::RAIL_SAG,
            NOMINAL_CONTROLLER_VOLTAGE - drop * Self::CONTROLLER_SAG,
        );
        self.voltage = (self.voltage - self.drain).max(0.0);
        Some(sample)
    }
}

/// Replays the samples of a record file in order.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    samples: VecDeque<TelemetrySample>,
}

impl ReplaySource {
    /// Load every sample of the record at `path`.
    ///
    /// # Errors
    /// Returns `PersistenceError` if the file cannot be read or parsed.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let samples = read_records(path)?;
        info!("Loaded {} samples from {}", samples.len(), path.display());
        Ok(Self::from_samples(samples))
    }

    /// Replay the given samples.
    pub fn from_samples(samples: impl IntoIterator<Item = TelemetrySample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }

    /// Samples not yet delivered.
    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl TelemetrySource for ReplaySource {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn next_sample(&mut self) -> Option<TelemetrySample> {
        self.samples.pop_front()
    }
}
