//! Simulated actuator collaborators.
//!
//! Stand-ins for the drivetrain, arm and gripper used when the harness runs
//! without a robot attached, and by the tests. They log what they are asked
//! to do and keep counters for inspection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use soak_common::actuator::{
    ActuatorError, ArmActionClient, ArmGoal, GripperClient, GripperCommand, VelocityCommand,
    VelocitySink,
};
use tracing::debug;

/// Simulated drivetrain: records the last command.
#[derive(Debug, Default)]
pub struct SimDrive {
    last: Mutex<Option<VelocityCommand>>,
    published: AtomicU64,
}

impl SimDrive {
    /// Create a drivetrain that has received no command yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last command published, if any.
    pub fn last_command(&self) -> Option<VelocityCommand> {
        *self.last.lock()
    }

    /// Number of commands published.
    pub fn commands_sent(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl VelocitySink for SimDrive {
    fn publish(&self, command: VelocityCommand) {
        debug!(
            "cmd_vel linear=({}, {}, {}) angular=({}, {}, {:.3})",
            command.linear.x,
            command.linear.y,
            command.linear.z,
            command.angular.x,
            command.angular.y,
            command.angular.z
        );
        *self.last.lock() = Some(command);
        self.published.fetch_add(1, Ordering::Relaxed);
    }
}

/// Simulated arm: each goal takes `motion_time` and the first
/// `failures_per_goal` attempts of every goal are rejected.
#[derive(Debug, Default)]
pub struct SimArm {
    motion_time: Duration,
    failures_per_goal: u32,
    pending_failures: Mutex<Option<u32>>,
    sent: AtomicU64,
    succeeded: AtomicU64,
}

impl SimArm {
    /// Arm that succeeds instantly on the first attempt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how long each goal takes.
    #[must_use]
    pub fn with_motion_time(mut self, motion_time: Duration) -> Self {
        self.motion_time = motion_time;
        self
    }

    /// Reject the first `failures` attempts of every goal.
    #[must_use]
    pub fn with_failures_per_goal(mut self, failures: u32) -> Self {
        self.failures_per_goal = failures;
        self
    }

    /// Number of goal attempts received.
    pub fn goals_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Number of goals that succeeded.
    pub fn goals_succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }
}

impl ArmActionClient for SimArm {
    fn send_goal(&self, goal: ArmGoal) -> Result<(), ActuatorError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        if !self.motion_time.is_zero() {
            thread::sleep(self.motion_time);
        }

        let mut pending = self.pending_failures.lock();
        let left = pending.get_or_insert(self.failures_per_goal);
        if *left > 0 {
            *left -= 1;
            debug!("Simulated arm rejecting {} ({} more to go)", goal, left);
            return Err(ActuatorError::Rejected(format!("simulated {goal} failure")));
        }
        *pending = None;
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        debug!("Simulated arm reached {}", goal);
        Ok(())
    }
}

/// Simulated gripper: remembers the last request.
#[derive(Debug, Default)]
pub struct SimGripper {
    last: Mutex<Option<GripperCommand>>,
    sent: AtomicU64,
}

impl SimGripper {
    /// Gripper with no request yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last request, if any.
    pub fn last_command(&self) -> Option<GripperCommand> {
        *self.last.lock()
    }

    /// Number of requests received.
    pub fn commands_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl GripperClient for SimGripper {
    fn command(&self, command: GripperCommand) -> Result<(), ActuatorError> {
        debug!("Simulated gripper {:?}", command);
        *self.last.lock() = Some(command);
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soak_common::actuator::RetryPolicy;

    #[test]
    fn drive_keeps_last_command() {
        let drive = SimDrive::new();
        assert_eq!(drive.last_command(), None);
        drive.publish(VelocityCommand::yaw_rate(0.3));
        drive.publish(VelocityCommand::zero());
        assert_eq!(drive.commands_sent(), 2);
        assert!(drive.last_command().unwrap().is_zero());
    }

    #[test]
    fn arm_failures_reset_per_goal() {
        let arm = SimArm::new().with_failures_per_goal(2);
        let policy = RetryPolicy::unbounded(Duration::ZERO);

        assert_eq!(arm.perform_until_success(ArmGoal::Stow, &policy, &|| false).unwrap(), 3);
        assert_eq!(
            arm.perform_until_success(ArmGoal::StoreObject, &policy, &|| false).unwrap(),
            3
        );
        assert_eq!(arm.goals_sent(), 6);
        assert_eq!(arm.goals_succeeded(), 2);
    }

    #[test]
    fn gripper_keeps_last_command() {
        let gripper = SimGripper::new();
        gripper.command(GripperCommand::Close).unwrap();
        gripper.command(GripperCommand::Open).unwrap();
        assert_eq!(gripper.last_command(), Some(GripperCommand::Open));
        assert_eq!(gripper.commands_sent(), 2);
    }
}
