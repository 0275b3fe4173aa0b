//! Soak Common Library
//!
//! Shared types, constants and configuration loading for the battery soak
//! harness crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Thresholds, pacing periods and record format constants
//! - [`config`] - TOML configuration loading and test selection
//! - [`telemetry`] - Power-state samples and the source contract
//! - [`actuator`] - Drivetrain, arm and gripper collaborator contracts
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use soak_common::prelude::*;
//!
//! let kind: TestKind = "drivetrain".parse().unwrap();
//! assert_eq!(kind, TestKind::Drivetrain);
//! ```

pub mod actuator;
pub mod config;
pub mod consts;
pub mod prelude;
pub mod telemetry;
