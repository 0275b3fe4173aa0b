//! Arm manipulation cycle.
//!
//! Alternates the arm between the stow pose and the store-object motion,
//! driving the gripper in lock-step: `Stow → Close`, `Store → Open`.
//! Arm goals block the tick until they succeed (see
//! [`ArmActionClient::perform_until_success`]) or the run is shutting down;
//! gripper requests are fire-and-forget.

use std::sync::Arc;

use soak_common::actuator::{
    ActuatorError, ArmActionClient, ArmGoal, GripperClient, GripperCommand, RetryPolicy,
};
use tracing::{debug, error, warn};

use crate::safety::ShutdownSignal;

/// Phase executed by the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArmPhase {
    /// Stow the arm, then close the gripper.
    #[default]
    Stow,
    /// Store the object, then open the gripper.
    Store,
}

impl ArmPhase {
    /// The other phase.
    #[inline]
    pub const fn next(self) -> Self {
        match self {
            Self::Stow => Self::Store,
            Self::Store => Self::Stow,
        }
    }

    /// Arm goal and gripper request issued in this phase.
    #[inline]
    pub const fn commands(self) -> (ArmGoal, GripperCommand) {
        match self {
            Self::Stow => (ArmGoal::Stow, GripperCommand::Close),
            Self::Store => (ArmGoal::StoreObject, GripperCommand::Open),
        }
    }
}

/// Arm/gripper alternation state machine.
pub struct ArmCycle {
    arm: Arc<dyn ArmActionClient>,
    gripper: Arc<dyn GripperClient>,
    retry: RetryPolicy,
    phase: ArmPhase,
    completed: u64,
    shutdown: Option<ShutdownSignal>,
}

impl ArmCycle {
    /// Cycle starting in the `Stow` phase.
    pub fn new(
        arm: Arc<dyn ArmActionClient>,
        gripper: Arc<dyn GripperClient>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            arm,
            gripper,
            retry,
            phase: ArmPhase::default(),
            completed: 0,
            shutdown: None,
        }
    }

    /// Stop retrying a failing goal once `signal` is set.
    pub fn watch_shutdown(&mut self, signal: ShutdownSignal) {
        self.shutdown = Some(signal);
    }

    /// Run the current phase and flip to the other one.
    ///
    /// A goal abandoned because of shutdown ends the tick without touching
    /// the gripper or the phase.
    pub fn tick(&mut self) {
        let (goal, grip) = self.phase.commands();
        let shutdown = &self.shutdown;
        let cancelled = || shutdown.as_ref().is_some_and(ShutdownSignal::is_set);

        match self.arm.perform_until_success(goal, &self.retry, &cancelled) {
            Ok(attempts) => {
                self.completed += 1;
                debug!("Arm {} done ({} attempt(s))", goal, attempts);
            }
            Err(e @ ActuatorError::Cancelled { .. }) => {
                warn!("{e}");
                return;
            }
            Err(e) => error!("Arm {} abandoned: {}", goal, e),
        }

        if let Err(e) = self.gripper.command(grip) {
            warn!("Gripper {:?} request failed: {}", grip, e);
        }

        self.phase = self.phase.next();
    }

    /// Phase the next tick will execute.
    #[inline]
    pub fn phase(&self) -> ArmPhase {
        self.phase
    }

    /// Number of arm goals that reached success.
    #[inline]
    pub fn completed_goals(&self) -> u64 {
        self.completed
    }
}
