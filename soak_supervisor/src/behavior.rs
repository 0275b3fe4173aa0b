//! Behavior module root.
//!
//! The exercise behavior is chosen once at construction from a [`TestKind`]
//! and never changes for the life of the process. The set of behaviors is
//! closed: [`ExerciseBehavior`] is matched exhaustively on every tick.

pub mod arm;
pub mod drivetrain;

use std::sync::Arc;

use soak_common::actuator::{
    ArmActionClient, GripperClient, RetryPolicy, SafeStop, VelocitySink,
};
use soak_common::config::{ConfigError, TestKind};
use tracing::info;

use crate::safety::ShutdownSignal;

pub use arm::{ArmCycle, ArmPhase};
pub use drivetrain::{DriveChannel, DrivetrainSweep};

/// Actuator collaborators available to the behaviors.
///
/// Only the collaborators needed by the selected behavior must be present.
#[derive(Clone, Default)]
pub struct ActuatorSet {
    /// Drivetrain velocity command sink.
    pub drive: Option<Arc<dyn VelocitySink>>,
    /// Arm pose-goal action client.
    pub arm: Option<Arc<dyn ArmActionClient>>,
    /// Gripper service client.
    pub gripper: Option<Arc<dyn GripperClient>>,
    /// Retry policy for arm goals.
    pub retry: RetryPolicy,
}

impl ActuatorSet {
    /// Empty set (sufficient for the idle behavior).
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a drivetrain sink.
    #[must_use]
    pub fn with_drive(mut self, drive: Arc<dyn VelocitySink>) -> Self {
        self.drive = Some(drive);
        self
    }

    /// Attach arm and gripper clients.
    #[must_use]
    pub fn with_arm(
        mut self,
        arm: Arc<dyn ArmActionClient>,
        gripper: Arc<dyn GripperClient>,
    ) -> Self {
        self.arm = Some(arm);
        self.gripper = Some(gripper);
        self
    }

    /// Set the arm goal retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// The closed set of exercise behaviors.
pub enum ExerciseBehavior {
    /// No actuator activity.
    Idle,
    /// Drivetrain yaw-rate sweep.
    DrivetrainSweep(DrivetrainSweep),
    /// Arm and gripper alternation.
    ArmCycle(ArmCycle),
}

impl ExerciseBehavior {
    /// Kind this behavior was built for.
    pub const fn kind(&self) -> TestKind {
        match self {
            Self::Idle => TestKind::Idle,
            Self::DrivetrainSweep(_) => TestKind::Drivetrain,
            Self::ArmCycle(_) => TestKind::Arm,
        }
    }
}

/// Holds the selected behavior and dispatches ticks to it.
pub struct BehaviorSelector {
    behavior: ExerciseBehavior,
    ticks: u64,
}

impl BehaviorSelector {
    /// Build the behavior for `kind` from the given actuators.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if a collaborator required by
    /// the selected behavior is missing.
    pub fn new(kind: TestKind, actuators: ActuatorSet) -> Result<Self, ConfigError> {
        let behavior = match kind {
            TestKind::Idle => ExerciseBehavior::Idle,
            TestKind::Drivetrain => {
                let drive = actuators.drive.ok_or_else(|| missing(kind, "velocity sink"))?;
                ExerciseBehavior::DrivetrainSweep(DrivetrainSweep::new(drive))
            }
            TestKind::Arm => {
                let arm = actuators.arm.ok_or_else(|| missing(kind, "arm action client"))?;
                let gripper = actuators
                    .gripper
                    .ok_or_else(|| missing(kind, "gripper client"))?;
                ExerciseBehavior::ArmCycle(ArmCycle::new(arm, gripper, actuators.retry))
            }
        };
        info!("Selected {} behavior", kind);
        Ok(Self::with_behavior(behavior))
    }

    /// Build from the raw selector string (`idle`, `drivetrain` or `arm`).
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownTestKind` for any other selector, or the
    /// errors of [`BehaviorSelector::new`].
    pub fn from_selector(selector: &str, actuators: ActuatorSet) -> Result<Self, ConfigError> {
        Self::new(selector.parse()?, actuators)
    }

    /// Wrap an already constructed behavior.
    pub fn with_behavior(behavior: ExerciseBehavior) -> Self {
        Self { behavior, ticks: 0 }
    }

    /// Run one tick of the selected behavior.
    pub fn tick(&mut self) {
        match &mut self.behavior {
            ExerciseBehavior::Idle => {}
            ExerciseBehavior::DrivetrainSweep(sweep) => sweep.tick(),
            ExerciseBehavior::ArmCycle(cycle) => cycle.tick(),
        }
        self.ticks += 1;
    }

    /// Selected kind.
    pub fn kind(&self) -> TestKind {
        self.behavior.kind()
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Selected behavior.
    pub fn behavior(&self) -> &ExerciseBehavior {
        &self.behavior
    }

    /// Let the behavior give up blocking work once `signal` is set.
    ///
    /// Only the arm cycle blocks long enough to need it.
    pub fn watch_shutdown(&mut self, signal: &ShutdownSignal) {
        if let ExerciseBehavior::ArmCycle(cycle) = &mut self.behavior {
            cycle.watch_shutdown(signal.clone());
        }
    }

    /// Compensating action for shutdown, if the behavior defines one.
    ///
    /// Only the drivetrain sweep has one; the arm collaborators own their
    /// own resting state.
    pub fn safe_stop_action(&self) -> Option<Arc<dyn SafeStop>> {
        match &self.behavior {
            ExerciseBehavior::DrivetrainSweep(sweep) => Some(sweep.safe_stop_action()),
            ExerciseBehavior::Idle | ExerciseBehavior::ArmCycle(_) => None,
        }
    }
}

fn missing(kind: TestKind, what: &str) -> ConfigError {
    ConfigError::ValidationError(format!("{kind} test requires a {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimArm, SimDrive, SimGripper};

    fn full_set() -> ActuatorSet {
        ActuatorSet::new()
            .with_drive(Arc::new(SimDrive::new()))
            .with_arm(Arc::new(SimArm::new()), Arc::new(SimGripper::new()))
    }

    #[test]
    fn selects_each_kind() {
        for kind in [TestKind::Idle, TestKind::Drivetrain, TestKind::Arm] {
            let selector = BehaviorSelector::new(kind, full_set()).unwrap();
            assert_eq!(selector.kind(), kind);
        }
    }

    #[test]
    fn unknown_selector_is_configuration_error() {
        let result = BehaviorSelector::from_selector("hover", full_set());
        assert!(matches!(result, Err(ConfigError::UnknownTestKind(_))));
    }

    #[test]
    fn missing_collaborator_is_rejected() {
        let result = BehaviorSelector::new(TestKind::Drivetrain, ActuatorSet::new());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let arm_only = ActuatorSet {
            arm: Some(Arc::new(SimArm::new())),
            ..ActuatorSet::new()
        };
        let result = BehaviorSelector::new(TestKind::Arm, arm_only);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn idle_needs_nothing_and_does_nothing() {
        let mut selector = BehaviorSelector::from_selector("idle", ActuatorSet::new()).unwrap();
        selector.tick();
        selector.tick();
        assert_eq!(selector.ticks(), 2);
        assert!(selector.safe_stop_action().is_none());
    }

    #[test]
    fn only_drivetrain_has_safe_stop() {
        let drive = BehaviorSelector::new(TestKind::Drivetrain, full_set()).unwrap();
        let arm = BehaviorSelector::new(TestKind::Arm, full_set()).unwrap();
        assert!(drive.safe_stop_action().is_some());
        assert!(arm.safe_stop_action().is_none());
    }

    #[test]
    fn arm_tick_alternates_through_selector() {
        let sim_arm = Arc::new(SimArm::new());
        let sim_gripper = Arc::new(SimGripper::new());
        let set = ActuatorSet::new()
            .with_arm(sim_arm.clone(), sim_gripper.clone())
            .with_retry(RetryPolicy::unbounded(std::time::Duration::ZERO));
        let mut selector = BehaviorSelector::new(TestKind::Arm, set).unwrap();

        selector.tick();
        selector.tick();
        selector.tick();

        match selector.behavior() {
            ExerciseBehavior::ArmCycle(cycle) => assert_eq!(cycle.phase(), ArmPhase::Store),
            _ => panic!("expected arm cycle"),
        }
        assert_eq!(sim_arm.goals_sent(), 3);
        assert_eq!(sim_gripper.commands_sent(), 3);
    }
}
