//! Prelude module for common re-exports.
//!
//! ```rust
//! use soak_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, HarnessConfig, LogLevel, OutputMode, ResolvedTest, TestKind,
};

// ─── Thresholds ─────────────────────────────────────────────────────
pub use crate::consts::{CRITICAL_BATTERY_VOLTAGE, SWEEP_LIMIT_RAD};

// ─── Telemetry ──────────────────────────────────────────────────────
pub use crate::telemetry::{TelemetrySample, TelemetrySource};

// ─── Actuators ──────────────────────────────────────────────────────
pub use crate::actuator::{
    ActuatorError, ArmActionClient, ArmGoal, GripperClient, GripperCommand, RetryPolicy,
    SafeStop, VelocityCommand, VelocitySink,
};
