//! System-wide constants for the soak harness.
//!
//! Single source of truth for thresholds, pacing periods and the record
//! format. Imported by all crates; values are defined nowhere else.

use std::time::Duration;

/// Battery voltage below which the test is stopped [V].
///
/// The comparison is strict: a sample of exactly this value does not trip.
pub const CRITICAL_BATTERY_VOLTAGE: f64 = 21.5;

/// Yaw-rate magnitude at which the drivetrain sweep reverses [rad/s].
pub const SWEEP_LIMIT_RAD: f64 = 1.57;

/// Default yaw-rate increment applied on every drivetrain tick [rad/s].
pub const DEFAULT_SWEEP_STEP: f64 = 0.1;

/// Blocking pause at the end of every drivetrain tick (≤ 20 Hz commands).
pub const DRIVE_TICK_PERIOD: Duration = Duration::from_millis(50);

/// Loop pacing used for the idle behavior, which has no pause of its own.
pub const IDLE_TICK_PERIOD: Duration = Duration::from_millis(50);

/// Default delay between arm goal attempts [ms].
pub const DEFAULT_ARM_RETRY_DELAY_MS: u64 = 500;

/// Header line of every record file.
pub const RECORD_HEADER: &str = "Time,Battery Voltage,13.8v Rail Voltage,cRIO Voltage";

/// Record directory, created under the user's home directory.
pub const RECORD_DIR_NAME: &str = "battery_soak";

/// `chrono` format of the timestamp prefix in record file names.
pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// Default telemetry sample period of the simulated battery [ms].
pub const DEFAULT_SAMPLE_PERIOD_MS: u64 = 1000;

/// Nominal voltage of the 13.8 V accessory rail [V].
pub const NOMINAL_RAIL_VOLTAGE: f64 = 13.8;

/// Nominal controller supply voltage [V].
pub const NOMINAL_CONTROLLER_VOLTAGE: f64 = 5.0;
