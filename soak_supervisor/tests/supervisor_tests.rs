//! End-to-end runs of the supervisor loop against the safety supervisor.
//!
//! Every run wires the same pieces as the binary: a behavior, a safety
//! supervisor with the behavior's safe-stop attached, a telemetry source on
//! the transport thread and the loop on the test thread.

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use soak_common::actuator::{RetryPolicy, VelocityCommand};
use soak_common::config::{OutputMode, TestKind};
use soak_common::consts::RECORD_HEADER;
use soak_common::telemetry::TelemetrySample;
use soak_supervisor::behavior::{ActuatorSet, BehaviorSelector, DrivetrainSweep, ExerciseBehavior};
use soak_supervisor::cycle::{LoopState, SupervisorLoop};
use soak_supervisor::record::read_records;
use soak_supervisor::safety::{SafetySupervisor, ShutdownReason, ShutdownSignal};
use soak_supervisor::sim::{SimArm, SimDrive, SimGripper};
use soak_supervisor::telemetry::{ReplaySource, SimulatedBattery, spawn_transport};
use tempfile::TempDir;

fn sample_at(secs: i64, battery: f64) -> TelemetrySample {
    let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
    TelemetrySample::new(ts, battery, 13.8, 5.0)
}

fn file_supervisor(dir: &TempDir, label: &str) -> SafetySupervisor {
    SafetySupervisor::with_output_dir(OutputMode::File, label, dir.path(), ShutdownSignal::new())
        .unwrap()
}

#[test]
fn idle_file_run_records_until_critical() {
    let dir = TempDir::new().unwrap();
    let supervisor = file_supervisor(&dir, "idle");
    let mut run = SupervisorLoop::new(
        BehaviorSelector::new(TestKind::Idle, ActuatorSet::new()).unwrap(),
        supervisor.signal().clone(),
    );

    supervisor.on_telemetry(&sample_at(0, 24.0));
    assert_eq!(run.step(), LoopState::Running);
    supervisor.on_telemetry(&sample_at(1, 21.6));
    assert!(!supervisor.signal().is_set());
    assert_eq!(run.step(), LoopState::Running);
    supervisor.on_telemetry(&sample_at(2, 21.0));
    assert!(supervisor.signal().is_set());
    assert_eq!(run.step(), LoopState::Stopped);

    let path = supervisor.record_path().unwrap();
    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], RECORD_HEADER);
    assert!(lines[3].ends_with(",21,13.8,5"));

    let replayed: Vec<f64> = read_records(&path)
        .unwrap()
        .iter()
        .map(|s| s.battery_voltage)
        .collect();
    assert_eq!(replayed, vec![24.0, 21.6, 21.0]);
}

#[test]
fn drivetrain_run_ends_with_zero_velocity() {
    let drive = Arc::new(SimDrive::new());
    let sweep = DrivetrainSweep::new(drive.clone()).with_pace(Duration::from_millis(1));
    let behavior = BehaviorSelector::with_behavior(ExerciseBehavior::DrivetrainSweep(sweep));
    let supervisor = Arc::new(
        SafetySupervisor::new(OutputMode::Screen, "drivetrain", ShutdownSignal::new())
            .unwrap()
            .with_safe_stop(behavior.safe_stop_action()),
    );

    let battery = Box::new(SimulatedBattery::new(22.0, 0.25));
    let transport = spawn_transport(battery, supervisor.clone(), Duration::from_millis(5)).unwrap();
    let report = SupervisorLoop::new(behavior, supervisor.signal().clone()).run();
    let delivered = transport.join().unwrap();

    assert_eq!(report.reason, Some(ShutdownReason::CriticalVoltage));
    assert!(report.ticks >= 1);
    // 22.0, 21.75 and 21.5 pass; 21.25 trips.
    assert_eq!(delivered, 4);
    assert_eq!(drive.last_command(), Some(VelocityCommand::zero()));
    assert!(drive.commands_sent() >= 2);
}

#[test]
fn operator_interrupt_stops_drivetrain_once() {
    let drive = Arc::new(SimDrive::new());
    let sweep = DrivetrainSweep::new(drive.clone()).with_pace(Duration::from_millis(1));
    let behavior = BehaviorSelector::with_behavior(ExerciseBehavior::DrivetrainSweep(sweep));
    let supervisor = Arc::new(
        SafetySupervisor::new(OutputMode::Screen, "drivetrain", ShutdownSignal::new())
            .unwrap()
            .with_safe_stop(behavior.safe_stop_action()),
    );

    let operator = supervisor.clone();
    let interrupt = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        operator.request_shutdown(ShutdownReason::OperatorInterrupt)
    });
    let report = SupervisorLoop::new(behavior, supervisor.signal().clone()).run();
    assert!(interrupt.join().unwrap());

    // A late critical sample must not re-run the safe-stop.
    let sent = drive.commands_sent();
    supervisor.on_telemetry(&sample_at(0, 19.0));
    assert_eq!(drive.commands_sent(), sent);

    assert_eq!(report.reason, Some(ShutdownReason::OperatorInterrupt));
    assert_eq!(drive.last_command(), Some(VelocityCommand::zero()));
}

#[test]
fn arm_run_replays_recorded_discharge() {
    let dir = TempDir::new().unwrap();
    let recording = {
        let recorder = file_supervisor(&dir, "bench");
        for (i, v) in [23.0, 22.5, 22.0, 21.2].into_iter().enumerate() {
            recorder.on_telemetry(&sample_at(i as i64, v));
        }
        recorder.record_path().unwrap()
    };

    let arm = Arc::new(SimArm::new().with_failures_per_goal(1));
    let gripper = Arc::new(SimGripper::new());
    let actuators = ActuatorSet::new()
        .with_arm(arm.clone(), gripper.clone())
        .with_retry(RetryPolicy::unbounded(Duration::ZERO));
    let behavior = BehaviorSelector::new(TestKind::Arm, actuators).unwrap();
    let supervisor = Arc::new(
        SafetySupervisor::new(OutputMode::Screen, "arm", ShutdownSignal::new()).unwrap(),
    );

    let replay = Box::new(ReplaySource::open(&recording).unwrap());
    let transport = spawn_transport(replay, supervisor.clone(), Duration::from_millis(5)).unwrap();
    let report = SupervisorLoop::new(behavior, supervisor.signal().clone()).run();

    assert_eq!(transport.join().unwrap(), 4);
    assert_eq!(report.reason, Some(ShutdownReason::CriticalVoltage));
    assert_eq!(supervisor.samples_seen(), 4);
    // Every tick retries once, then commands the gripper.
    assert_eq!(arm.goals_succeeded(), report.ticks);
    assert_eq!(arm.goals_sent(), 2 * report.ticks);
    assert_eq!(gripper.commands_sent(), report.ticks);
}

#[test]
fn operator_interrupt_ends_arm_run_with_failing_arm() {
    let arm = Arc::new(SimArm::new().with_failures_per_goal(u32::MAX));
    let gripper = Arc::new(SimGripper::new());
    let actuators = ActuatorSet::new()
        .with_arm(arm.clone(), gripper.clone())
        .with_retry(RetryPolicy::unbounded(Duration::from_millis(5)));
    let behavior = BehaviorSelector::new(TestKind::Arm, actuators).unwrap();
    let supervisor = Arc::new(
        SafetySupervisor::new(OutputMode::Screen, "arm", ShutdownSignal::new()).unwrap(),
    );

    let mut run = SupervisorLoop::new(behavior, supervisor.signal().clone());
    let runner = thread::spawn(move || run.run());
    thread::sleep(Duration::from_millis(50));
    assert!(supervisor.request_shutdown(ShutdownReason::OperatorInterrupt));
    let report = runner.join().unwrap();

    assert_eq!(report.reason, Some(ShutdownReason::OperatorInterrupt));
    assert_eq!(arm.goals_succeeded(), 0);
    assert_eq!(gripper.commands_sent(), 0);
}

#[test]
fn unknown_selector_fails_before_anything_runs() {
    let result = BehaviorSelector::from_selector("swim", ActuatorSet::new());
    assert!(result.is_err());
}
