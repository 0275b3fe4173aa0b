//! Battery safety supervisor.
//!
//! Receives telemetry samples from the transport thread, logs them, appends
//! them to the record file in `file` mode and converts the first sample
//! below [`CRITICAL_BATTERY_VOLTAGE`] into a shutdown. The shutdown is
//! one-shot: the safe-stop action of the active behavior runs at most once,
//! whichever trigger (voltage or operator) gets there first.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use parking_lot::Mutex;
use soak_common::actuator::SafeStop;
use soak_common::config::OutputMode;
use soak_common::consts::CRITICAL_BATTERY_VOLTAGE;
use soak_common::telemetry::TelemetrySample;
use tracing::{error, info, warn};

use super::shutdown::{ShutdownReason, ShutdownSignal};
use crate::record::{PersistenceError, RecordSink, default_record_dir};

/// Telemetry handler and shutdown authority.
pub struct SafetySupervisor {
    signal: ShutdownSignal,
    sink: Option<Mutex<RecordSink>>,
    safe_stop: Option<Arc<dyn SafeStop>>,
    samples: AtomicU64,
}

impl SafetySupervisor {
    /// Create a supervisor recording to `~/battery_soak` in `file` mode.
    ///
    /// # Errors
    /// Returns `PersistenceError` in `file` mode if the home directory is
    /// unknown or the record cannot be created.
    pub fn new(
        mode: OutputMode,
        label: &str,
        signal: ShutdownSignal,
    ) -> Result<Self, PersistenceError> {
        match mode {
            OutputMode::Screen => Ok(Self::build(mode, None, signal)),
            OutputMode::File => {
                let dir = default_record_dir()?;
                Self::with_output_dir(mode, label, &dir, signal)
            }
        }
    }

    /// Create a supervisor recording into `dir` in `file` mode.
    ///
    /// `dir` is ignored in `screen` mode.
    ///
    /// # Errors
    /// Returns `PersistenceError` if the record cannot be created.
    pub fn with_output_dir(
        mode: OutputMode,
        label: &str,
        dir: &Path,
        signal: ShutdownSignal,
    ) -> Result<Self, PersistenceError> {
        let sink = match mode {
            OutputMode::Screen => None,
            OutputMode::File => Some(Mutex::new(RecordSink::create(dir, label, Local::now())?)),
        };
        Ok(Self::build(mode, sink, signal))
    }

    fn build(mode: OutputMode, sink: Option<Mutex<RecordSink>>, signal: ShutdownSignal) -> Self {
        info!(
            "Safety supervisor armed: output={}, critical battery voltage={}V",
            mode, CRITICAL_BATTERY_VOLTAGE
        );
        Self {
            signal,
            sink,
            safe_stop: None,
            samples: AtomicU64::new(0),
        }
    }

    /// Attach the active behavior's safe-stop action.
    #[must_use]
    pub fn with_safe_stop(mut self, action: Option<Arc<dyn SafeStop>>) -> Self {
        self.safe_stop = action;
        self
    }

    /// Handle one telemetry sample.
    ///
    /// Safe to call from several threads; record writes are serialized.
    pub fn on_telemetry(&self, sample: &TelemetrySample) {
        info!(
            "Battery Voltage: {:.6}V    13.8v Rail Voltage: {:.6}V    cRIO Voltage: {:.6}V",
            sample.battery_voltage, sample.rail_voltage_13v8, sample.controller_voltage
        );

        if let Some(sink) = &self.sink {
            let mut sink = sink.lock();
            if let Err(e) = sink.append(sample) {
                error!("Failed to record telemetry sample: {e}");
            }
        }
        self.samples.fetch_add(1, Ordering::Relaxed);

        if sample.is_critical() && !self.signal.is_set() {
            warn!(
                "Battery voltage {:.3}V below critical {}V",
                sample.battery_voltage, CRITICAL_BATTERY_VOLTAGE
            );
            self.request_shutdown(ShutdownReason::CriticalVoltage);
        }
    }

    /// Set the shutdown signal and run the safe-stop action.
    ///
    /// Returns `false` (and does nothing) if the signal was already set.
    pub fn request_shutdown(&self, reason: ShutdownReason) -> bool {
        if !self.signal.trigger(reason) {
            return false;
        }
        warn!("Shutdown requested: {reason}");
        if let Some(action) = &self.safe_stop {
            action.safe_stop();
        }
        true
    }

    /// Shared shutdown signal.
    pub fn signal(&self) -> &ShutdownSignal {
        &self.signal
    }

    /// Path of the record file in `file` mode.
    pub fn record_path(&self) -> Option<PathBuf> {
        self.sink.as_ref().map(|sink| sink.lock().path().to_path_buf())
    }

    /// Number of samples handled so far.
    pub fn samples_seen(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }
}

static_assertions::assert_impl_all!(SafetySupervisor: Send, Sync);
