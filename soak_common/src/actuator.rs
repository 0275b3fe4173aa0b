//! Actuator collaborator contracts and error types.
//!
//! This module defines:
//! - `VelocitySink` trait - Drivetrain velocity command channel
//! - `ArmActionClient` trait - Arm pose-goal action with blocking retry
//! - `GripperClient` trait - Binary open/close gripper request
//! - `SafeStop` trait - Compensating command issued on shutdown
//! - `ActuatorError` enum - Error types for actuator requests
//!
//! The harness only issues commands; closed-loop control of the drivetrain
//! and the arm is owned by the implementations behind these traits.

use std::fmt;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::DEFAULT_ARM_RETRY_DELAY_MS;

/// Error types for actuator requests.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActuatorError {
    /// The collaborator could not be reached.
    #[error("Actuator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator rejected or aborted the request.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// A bounded retry policy ran out of attempts.
    #[error("{goal} not achieved after {attempts} attempts")]
    RetriesExhausted {
        /// Goal that was being pursued.
        goal: ArmGoal,
        /// Number of attempts made.
        attempts: u32,
    },

    /// Retrying stopped because the run is shutting down.
    #[error("{goal} abandoned after {attempts} attempts: shutdown requested")]
    Cancelled {
        /// Goal that was being pursued.
        goal: ArmGoal,
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Three-component vector [m/s or rad/s].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vector3 {
    /// All-zero vector.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

/// Drivetrain velocity command (linear + angular).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityCommand {
    /// Linear velocity [m/s].
    pub linear: Vector3,
    /// Angular velocity [rad/s].
    pub angular: Vector3,
}

impl VelocityCommand {
    /// Command with every component zero.
    pub const fn zero() -> Self {
        Self {
            linear: Vector3::ZERO,
            angular: Vector3::ZERO,
        }
    }

    /// Pure rotation in place at `rate` rad/s about the vertical axis.
    pub const fn yaw_rate(rate: f64) -> Self {
        Self {
            linear: Vector3::ZERO,
            angular: Vector3 {
                x: 0.0,
                y: 0.0,
                z: rate,
            },
        }
    }

    /// Whether every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

/// Arm pose goals exercised by the arm cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmGoal {
    /// Fold the arm into its stowed travel pose.
    Stow,
    /// Place a held object into the storage bin.
    StoreObject,
}

impl fmt::Display for ArmGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stow => f.write_str("stow"),
            Self::StoreObject => f.write_str("store-object"),
        }
    }
}

/// Binary gripper request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GripperCommand {
    /// Open the jaws.
    Open,
    /// Close the jaws.
    Close,
}

/// How an arm goal is retried until it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts per goal; `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Pause between a failed attempt and the next one.
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// Retry forever with the given delay.
    pub const fn unbounded(retry_delay: Duration) -> Self {
        Self {
            max_attempts: None,
            retry_delay,
        }
    }

    /// Give up after `max_attempts` failures.
    pub const fn bounded(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            retry_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_millis(DEFAULT_ARM_RETRY_DELAY_MS))
    }
}

/// Drivetrain velocity command channel (fire-and-forget).
pub trait VelocitySink: Send + Sync {
    /// Publish one velocity command.
    fn publish(&self, command: VelocityCommand);
}

/// Arm pose-goal action client.
pub trait ArmActionClient: Send + Sync {
    /// Send one goal and wait for its result.
    ///
    /// # Errors
    /// Returns an `ActuatorError` if the goal was not achieved.
    fn send_goal(&self, goal: ArmGoal) -> Result<(), ActuatorError>;

    /// Send `goal` until it reports success.
    ///
    /// Blocks the caller. With an unbounded policy this only returns once the
    /// goal succeeded or `cancelled` reports `true` after a failed attempt
    /// (`ActuatorError::Cancelled`); a bounded policy also returns
    /// `ActuatorError::RetriesExhausted` after `max_attempts` failures.
    ///
    /// Returns the number of attempts used.
    fn perform_until_success(
        &self,
        goal: ArmGoal,
        policy: &RetryPolicy,
        cancelled: &dyn Fn() -> bool,
    ) -> Result<u32, ActuatorError> {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            match self.send_goal(goal) {
                Ok(()) => {
                    debug!("Arm goal {} succeeded after {} attempt(s)", goal, attempts);
                    return Ok(attempts);
                }
                Err(e) => {
                    warn!("Arm goal {} attempt {} failed: {}", goal, attempts, e);
                    if policy.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(ActuatorError::RetriesExhausted { goal, attempts });
                    }
                    if !policy.retry_delay.is_zero() {
                        thread::sleep(policy.retry_delay);
                    }
                    if cancelled() {
                        return Err(ActuatorError::Cancelled { goal, attempts });
                    }
                }
            }
        }
    }
}

/// Gripper service client (fire-and-forget from the harness' point of view).
pub trait GripperClient: Send + Sync {
    /// Request the gripper to open or close.
    ///
    /// # Errors
    /// Returns an `ActuatorError` if the request could not be delivered.
    fn command(&self, command: GripperCommand) -> Result<(), ActuatorError>;
}

/// Compensating action that returns an actuator to a resting state.
pub trait SafeStop: Send + Sync {
    /// Issue the safe-stop command.
    fn safe_stop(&self);
}

static_assertions::assert_obj_safe!(VelocitySink, ArmActionClient, GripperClient, SafeStop);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Arm client that fails a fixed number of times before succeeding.
    struct FlakyArm {
        failures_left: Mutex<u32>,
        calls: Mutex<Vec<ArmGoal>>,
    }

    impl FlakyArm {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: Mutex::new(failures),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ArmActionClient for FlakyArm {
        fn send_goal(&self, goal: ArmGoal) -> Result<(), ActuatorError> {
            self.calls.lock().unwrap().push(goal);
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                Err(ActuatorError::Rejected("planning failed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn never() -> bool {
        false
    }

    #[test]
    fn unbounded_retries_until_success() {
        let arm = FlakyArm::new(3);
        let policy = RetryPolicy::unbounded(Duration::ZERO);
        let attempts = arm.perform_until_success(ArmGoal::Stow, &policy, &never).unwrap();
        assert_eq!(attempts, 4);
        assert_eq!(arm.calls.lock().unwrap().len(), 4);
    }

    #[test]
    fn immediate_success_uses_one_attempt() {
        let arm = FlakyArm::new(0);
        let attempts = arm
            .perform_until_success(
                ArmGoal::StoreObject,
                &RetryPolicy::unbounded(Duration::ZERO),
                &never,
            )
            .unwrap();
        assert_eq!(attempts, 1);
    }

    #[test]
    fn bounded_policy_gives_up() {
        let arm = FlakyArm::new(10);
        let policy = RetryPolicy::bounded(3, Duration::ZERO);
        let result = arm.perform_until_success(ArmGoal::StoreObject, &policy, &never);
        assert_eq!(
            result,
            Err(ActuatorError::RetriesExhausted {
                goal: ArmGoal::StoreObject,
                attempts: 3
            })
        );
        assert_eq!(arm.calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn cancellation_ends_unbounded_retries() {
        let arm = FlakyArm::new(u32::MAX);
        let policy = RetryPolicy::unbounded(Duration::ZERO);
        let cancelled = || arm.calls.lock().unwrap().len() >= 5;
        let result = arm.perform_until_success(ArmGoal::Stow, &policy, &cancelled);
        assert_eq!(
            result,
            Err(ActuatorError::Cancelled {
                goal: ArmGoal::Stow,
                attempts: 5
            })
        );
    }

    #[test]
    fn success_is_not_cancelled() {
        let arm = FlakyArm::new(0);
        let policy = RetryPolicy::unbounded(Duration::ZERO);
        assert_eq!(arm.perform_until_success(ArmGoal::Stow, &policy, &|| true), Ok(1));
    }

    #[test]
    fn default_policy_is_unbounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.retry_delay, Duration::from_millis(DEFAULT_ARM_RETRY_DELAY_MS));
    }

    #[test]
    fn yaw_rate_only_sets_angular_z() {
        let cmd = VelocityCommand::yaw_rate(0.7);
        assert_eq!(cmd.linear, Vector3::ZERO);
        assert_eq!(cmd.angular.x, 0.0);
        assert_eq!(cmd.angular.y, 0.0);
        assert_eq!(cmd.angular.z, 0.7);
        assert!(!cmd.is_zero());
        assert!(VelocityCommand::zero().is_zero());
    }

    #[test]
    fn arm_goal_display() {
        assert_eq!(ArmGoal::Stow.to_string(), "stow");
        assert_eq!(ArmGoal::StoreObject.to_string(), "store-object");
    }
}
