//! # Soak Supervisor Library
//!
//! Endurance test loop for a ground robot: drives one exercise behavior tick
//! after tick while a safety supervisor watches battery telemetry and stops
//! the run once the battery falls below the critical voltage.
//!
//! ## Components
//!
//! 1. **BehaviorSelector** ([`behavior`]) - idle / drivetrain sweep / arm cycle
//! 2. **SafetySupervisor** ([`safety`]) - telemetry handler, record sink,
//!    one-shot shutdown with safe-stop
//! 3. **SupervisorLoop** ([`cycle`]) - `Running → Stopped` tick loop
//!
//! Supporting modules: [`record`] (CSV record file), [`telemetry`] (transport
//! thread, simulated and replayed sources) and [`sim`] (stand-in actuators).
//!
//! ```text
//!  telemetry thread                      loop thread
//!  ────────────────                      ───────────
//!  TelemetrySource ──► SafetySupervisor   SupervisorLoop ──► BehaviorSelector
//!                           │   │               ▲                 │
//!                     RecordSink │               │                 ▼
//!                                └─► ShutdownSignal ──┘        actuators
//! ```
//!
//! The [`ShutdownSignal`](safety::ShutdownSignal) is the only state shared
//! between the two execution contexts.

#![deny(missing_docs)]

pub mod behavior;
pub mod cycle;
pub mod record;
pub mod safety;
pub mod sim;
pub mod telemetry;

pub use crate::behavior::{ActuatorSet, BehaviorSelector};
pub use crate::cycle::{LoopReport, LoopState, SupervisorLoop};
pub use crate::safety::{SafetySupervisor, ShutdownReason, ShutdownSignal};
