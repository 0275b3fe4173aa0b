//! Write-once shutdown signal shared by the telemetry and loop threads.
//!
//! Set exactly once (first trigger wins), read every loop iteration, never
//! reset. Release on the writer and Acquire on the readers is sufficient
//! because the value never changes after it is set.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Why the run was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ShutdownReason {
    /// Battery dropped below the critical voltage.
    CriticalVoltage = 1,
    /// Operator interrupted the run (Ctrl+C).
    OperatorInterrupt = 2,
    /// The telemetry source ended, so the battery is no longer supervised.
    TelemetryEnded = 3,
}

impl ShutdownReason {
    const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::CriticalVoltage),
            2 => Some(Self::OperatorInterrupt),
            3 => Some(Self::TelemetryEnded),
            _ => None,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CriticalVoltage => {
                f.write_str("Test is complete. Battery at critical voltage! Recharge now!")
            }
            Self::OperatorInterrupt => f.write_str("Test interrupted by operator"),
            Self::TelemetryEnded => {
                f.write_str("Telemetry ended; battery can no longer be supervised")
            }
        }
    }
}

const NOT_SET: u8 = 0;

/// Cloneable handle to the process-wide shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    state: Arc<AtomicU8>,
}

impl ShutdownSignal {
    /// Create a new, unset signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal.
    ///
    /// Returns `true` only for the call that actually set it; later calls
    /// leave the original reason in place and return `false`.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        self.state
            .compare_exchange(NOT_SET, reason as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the signal has been set.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::Acquire) != NOT_SET
    }

    /// Reason recorded by the first trigger, if set.
    #[inline]
    pub fn reason(&self) -> Option<ShutdownReason> {
        ShutdownReason::from_raw(self.state.load(Ordering::Acquire))
    }
}

static_assertions::assert_impl_all!(ShutdownSignal: Send, Sync, Clone);
