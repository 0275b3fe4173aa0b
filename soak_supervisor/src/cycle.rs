//! Supervisor loop: tick the behavior until the shutdown signal is seen.
//!
//! Two states, `Running` (initial) and `Stopped` (terminal). Every iteration
//! runs one full tick and then checks the signal, so an in-flight tick
//! always completes and the worst-case stop latency is one tick. The signal
//! is checked cooperatively; nothing is cancelled mid-tick.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::behavior::BehaviorSelector;
use crate::safety::{ShutdownReason, ShutdownSignal};

/// Loop lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Ticking the behavior.
    Running,
    /// Shutdown observed; terminal.
    Stopped,
}

/// Summary returned when the loop stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopReport {
    /// Ticks executed.
    pub ticks: u64,
    /// Why the loop stopped.
    pub reason: Option<ShutdownReason>,
    /// Wall time spent in the loop.
    pub elapsed: Duration,
}

/// Drives the selected behavior until shutdown.
pub struct SupervisorLoop {
    behavior: BehaviorSelector,
    signal: ShutdownSignal,
    state: LoopState,
    pace: Option<Duration>,
}

impl SupervisorLoop {
    /// Create a loop in the `Running` state.
    ///
    /// The behavior is told to watch `signal` so a blocked tick can end.
    pub fn new(mut behavior: BehaviorSelector, signal: ShutdownSignal) -> Self {
        behavior.watch_shutdown(&signal);
        Self {
            behavior,
            signal,
            state: LoopState::Running,
            pace: None,
        }
    }

    /// Minimum period of one iteration.
    ///
    /// After a tick that finished early the loop sleeps for the remainder.
    /// Used for behaviors whose tick does not pause on its own.
    #[must_use]
    pub fn with_pace(mut self, period: Duration) -> Self {
        self.pace = Some(period);
        self
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// The behavior being driven.
    pub fn behavior(&self) -> &BehaviorSelector {
        &self.behavior
    }

    /// One iteration: tick, then check the signal.
    ///
    /// Returns the state after the iteration. Does nothing once `Stopped`.
    pub fn step(&mut self) -> LoopState {
        if self.state == LoopState::Stopped {
            return self.state;
        }

        let start = Instant::now();
        self.behavior.tick();

        if self.signal.is_set() {
            self.state = LoopState::Stopped;
            debug!("Shutdown observed after tick {}", self.behavior.ticks());
            return self.state;
        }

        if let Some(period) = self.pace {
            if let Some(remaining) = period.checked_sub(start.elapsed()) {
                thread::sleep(remaining);
            }
        }
        self.state
    }

    /// Run until `Stopped`.
    pub fn run(&mut self) -> LoopReport {
        info!("Entering {} test loop", self.behavior.kind());
        let start = Instant::now();

        while self.step() == LoopState::Running {}

        let report = LoopReport {
            ticks: self.behavior.ticks(),
            reason: self.signal.reason(),
            elapsed: start.elapsed(),
        };
        info!(
            "Test loop stopped after {} ticks in {:.1}s",
            report.ticks,
            report.elapsed.as_secs_f64()
        );
        report
    }
}
