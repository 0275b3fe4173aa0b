//! Power-state telemetry samples and the source contract.
//!
//! A [`TelemetrySample`] is one reading of the battery, the 13.8 V accessory
//! rail and the controller supply. Samples are produced by a
//! [`TelemetrySource`] and consumed exactly once by the safety supervisor.

use chrono::{DateTime, Utc};

use crate::consts::CRITICAL_BATTERY_VOLTAGE;

/// One power-state reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    /// Time the sample was taken.
    pub timestamp: DateTime<Utc>,
    /// Main battery voltage [V].
    pub battery_voltage: f64,
    /// 13.8 V accessory rail voltage [V].
    pub rail_voltage_13v8: f64,
    /// Controller supply voltage [V].
    pub controller_voltage: f64,
}

impl TelemetrySample {
    /// Create a sample stamped with the given time.
    pub const fn new(
        timestamp: DateTime<Utc>,
        battery_voltage: f64,
        rail_voltage_13v8: f64,
        controller_voltage: f64,
    ) -> Self {
        Self {
            timestamp,
            battery_voltage,
            rail_voltage_13v8,
            controller_voltage,
        }
    }

    /// Create a sample stamped with the current time.
    pub fn now(battery_voltage: f64, rail_voltage_13v8: f64, controller_voltage: f64) -> Self {
        Self::new(
            Utc::now(),
            battery_voltage,
            rail_voltage_13v8,
            controller_voltage,
        )
    }

    /// Whether the battery is below the critical voltage.
    #[inline]
    pub fn is_critical(&self) -> bool {
        self.battery_voltage < CRITICAL_BATTERY_VOLTAGE
    }
}

/// A producer of telemetry samples.
///
/// Implementations block or compute as needed; the transport calls
/// [`next_sample`](TelemetrySource::next_sample) once per period and ends
/// the run when it returns `None`.
pub trait TelemetrySource: Send {
    /// Short identifier used in logs (e.g. `"simulation"`, `"replay"`).
    fn name(&self) -> &'static str;

    /// Produce the next sample, or `None` once the source is exhausted.
    fn next_sample(&mut self) -> Option<TelemetrySample>;
}

static_assertions::assert_impl_all!(TelemetrySample: Send, Sync, Copy);
static_assertions::assert_obj_safe!(TelemetrySource);
