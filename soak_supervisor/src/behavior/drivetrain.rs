//! Drivetrain yaw-rate sweep.
//!
//! Every tick adds the step to the commanded yaw rate. Once the magnitude
//! exceeds [`SWEEP_LIMIT_RAD`] the step changes sign, so the rate swings
//! back and forth between roughly ±1.57 rad/s. The tick that crosses the
//! limit is not clamped; only the direction of later ticks changes, which
//! bounds the rate to `SWEEP_LIMIT_RAD + |step|`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use soak_common::actuator::{SafeStop, VelocityCommand, VelocitySink};
use soak_common::consts::{DEFAULT_SWEEP_STEP, DRIVE_TICK_PERIOD, SWEEP_LIMIT_RAD};
use tracing::{debug, info};

/// Velocity channel that can be latched into a halted state.
///
/// Once halted, further commands from the sweep are dropped, so the zero
/// command published by [`halt`](DriveChannel::halt) stays the last one
/// even if a tick is still in flight on the loop thread.
pub struct DriveChannel {
    sink: Arc<dyn VelocitySink>,
    halted: Mutex<bool>,
}

impl DriveChannel {
    /// Wrap a velocity sink.
    pub fn new(sink: Arc<dyn VelocitySink>) -> Self {
        Self {
            sink,
            halted: Mutex::new(false),
        }
    }

    /// Publish a command unless the channel is halted.
    ///
    /// Returns whether the command was published.
    pub fn publish(&self, command: VelocityCommand) -> bool {
        let halted = self.halted.lock();
        if *halted {
            return false;
        }
        self.sink.publish(command);
        true
    }

    /// Publish a single all-zero command and latch the channel.
    pub fn halt(&self) {
        let mut halted = self.halted.lock();
        *halted = true;
        self.sink.publish(VelocityCommand::zero());
    }

    /// Whether [`halt`](DriveChannel::halt) has been called.
    pub fn is_halted(&self) -> bool {
        *self.halted.lock()
    }
}

impl SafeStop for DriveChannel {
    fn safe_stop(&self) {
        info!("Drivetrain safe-stop: publishing zero velocity");
        self.halt();
    }
}

/// Yaw-rate sweep state machine.
pub struct DrivetrainSweep {
    channel: Arc<DriveChannel>,
    rate: f64,
    step: f64,
    pace: Duration,
}

impl DrivetrainSweep {
    /// Sweep starting at rest with the default step and 50 ms pacing.
    pub fn new(sink: Arc<dyn VelocitySink>) -> Self {
        Self::with_state(sink, 0.0, DEFAULT_SWEEP_STEP)
    }

    /// Sweep starting from an explicit rate and step.
    pub fn with_state(sink: Arc<dyn VelocitySink>, rate: f64, step: f64) -> Self {
        Self {
            channel: Arc::new(DriveChannel::new(sink)),
            rate,
            step,
            pace: DRIVE_TICK_PERIOD,
        }
    }

    /// Override the blocking pause at the end of each tick.
    #[must_use]
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Advance the sweep, publish the new rate and pause.
    pub fn tick(&mut self) {
        self.rate += self.step;
        if self.rate.abs() > SWEEP_LIMIT_RAD {
            self.step = -self.step;
            debug!("Sweep reversing at {:.3} rad/s", self.rate);
        }

        if !self.channel.publish(VelocityCommand::yaw_rate(self.rate)) {
            debug!("Drive channel halted, command dropped");
        }

        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
    }

    /// Commanded yaw rate [rad/s].
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Current signed increment [rad/s per tick].
    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Shared handle used by the safety supervisor to stop the drivetrain.
    pub fn safe_stop_action(&self) -> Arc<dyn SafeStop> {
        Arc::clone(&self.channel) as Arc<dyn SafeStop>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingSink {
        commands: StdMutex<Vec<VelocityCommand>>,
    }

    impl VelocitySink for RecordingSink {
        fn publish(&self, command: VelocityCommand) {
            self.commands.lock().unwrap().push(command);
        }
    }

    fn make_sweep(rate: f64, step: f64) -> (DrivetrainSweep, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let sweep = DrivetrainSweep::with_state(sink.clone(), rate, step).with_pace(Duration::ZERO);
        (sweep, sink)
    }

    #[test]
    fn overshoot_flips_step_without_clamping() {
        let (mut sweep, _) = make_sweep(1.5, 0.1);

        sweep.tick();
        assert!((sweep.rate() - 1.6).abs() < 1e-9);
        assert!((sweep.step() + 0.1).abs() < 1e-12);

        sweep.tick();
        assert!((sweep.rate() - 1.5).abs() < 1e-9);
        assert!((sweep.step() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn rate_stays_within_limit_plus_step() {
        for step in [0.1, 0.25, 0.7, -0.3] {
            let (mut sweep, _) = make_sweep(0.0, step);
            let bound = SWEEP_LIMIT_RAD + f64::abs(step) + 1e-9;
            for _ in 0..500 {
                let before = sweep.step();
                sweep.tick();
                assert!(sweep.rate().abs() <= bound, "rate {} beyond {}", sweep.rate(), bound);
                let flipped = sweep.step() != before;
                assert_eq!(flipped, sweep.rate().abs() > SWEEP_LIMIT_RAD);
            }
        }
    }

    #[test]
    fn sweep_visits_both_directions() {
        let (mut sweep, _) = make_sweep(0.0, 0.1);
        let (mut min, mut max) = (0.0_f64, 0.0_f64);
        for _ in 0..100 {
            sweep.tick();
            min = min.min(sweep.rate());
            max = max.max(sweep.rate());
        }
        assert!(max > SWEEP_LIMIT_RAD);
        assert!(min < -SWEEP_LIMIT_RAD);
    }

    #[test]
    fn tick_publishes_pure_yaw_command() {
        let (mut sweep, sink) = make_sweep(0.0, 0.1);
        sweep.tick();
        sweep.tick();
        let commands = sink.commands.lock().unwrap();
        assert_eq!(commands.len(), 2);
        for cmd in commands.iter() {
            assert_eq!(cmd.linear, soak_common::actuator::Vector3::ZERO);
            assert_eq!(cmd.angular.x, 0.0);
            assert_eq!(cmd.angular.y, 0.0);
        }
        assert!((commands[1].angular.z - 0.2).abs() < 1e-9);
    }

    #[test]
    fn safe_stop_publishes_zero_and_blocks_later_ticks() {
        let (mut sweep, sink) = make_sweep(0.0, 0.1);
        sweep.tick();
        assert!(!sweep.channel.is_halted());
        sweep.safe_stop_action().safe_stop();
        assert!(sweep.channel.is_halted());
        sweep.tick();
        sweep.tick();

        let commands = sink.commands.lock().unwrap();
        assert_eq!(commands.len(), 2);
        assert!(commands.last().unwrap().is_zero());
    }

    #[test]
    fn default_sweep_paces_ticks() {
        let sink = Arc::new(RecordingSink::default());
        let mut sweep = DrivetrainSweep::new(sink);
        let start = std::time::Instant::now();
        sweep.tick();
        assert!(start.elapsed() >= DRIVE_TICK_PERIOD);
        assert!((sweep.rate() - DEFAULT_SWEEP_STEP).abs() < 1e-12);
    }
}
