//! Configuration loading traits and types.
//!
//! Provides the TOML loader shared by the harness binaries, the test
//! selectors (`TestKind`, `OutputMode`) and the `HarnessConfig` file layout.
//! Configuration is read once at construction and never re-read at runtime.
//!
//! # Usage
//!
//! ```rust,no_run
//! use soak_common::config::{ConfigError, ConfigLoader, HarnessConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = HarnessConfig::load(Path::new("config/harness.toml"))?;
//!     let test = config.resolve()?;
//!     println!("Running {} test", test.kind);
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actuator::RetryPolicy;
use crate::consts::{DEFAULT_ARM_RETRY_DELAY_MS, DEFAULT_SAMPLE_PERIOD_MS};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Test selector is not one of `idle`, `drivetrain`, `arm`.
    #[error("Unknown test kind '{0}' (expected idle, drivetrain or arm)")]
    UnknownTestKind(String),

    /// Output selector is not one of `screen`, `file`.
    #[error("Unknown output mode '{0}' (expected screen or file)")]
    UnknownOutputMode(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Level name as parsed by `tracing::Level` and `EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across harness binaries.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "soak-bench-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for every `serde::de::DeserializeOwned` type.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Test selection ─────────────────────────────────────────────────

/// Exercise behavior selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestKind {
    /// Monitor the battery with no actuator load.
    Idle,
    /// Sweep the drivetrain yaw rate back and forth.
    Drivetrain,
    /// Alternate the arm between stow and store-object with the gripper.
    Arm,
}

impl TestKind {
    /// Selector string, also used as the default record label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Drivetrain => "drivetrain",
            Self::Arm => "arm",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "drivetrain" => Ok(Self::Drivetrain),
            "arm" => Ok(Self::Arm),
            _ => Err(ConfigError::UnknownTestKind(s.to_string())),
        }
    }
}

/// Where telemetry samples are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputMode {
    /// Log only.
    #[default]
    Screen,
    /// Log and append to a CSV record file.
    File,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Screen => f.write_str("screen"),
            Self::File => f.write_str("file"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "screen" => Ok(Self::Screen),
            "file" => Ok(Self::File),
            _ => Err(ConfigError::UnknownOutputMode(s.to_string())),
        }
    }
}

// ─── Harness config file ────────────────────────────────────────────

/// Top-level harness configuration file.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "soak-bench-01"
///
/// [test]
/// kind = "arm"
/// output = "file"
///
/// [arm]
/// max_attempts = 20
/// retry_delay_ms = 250
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Logging and instance identity.
    pub shared: SharedConfig,
    /// Test selection and record output.
    #[serde(default)]
    pub test: TestSection,
    /// Arm goal retry policy.
    #[serde(default)]
    pub arm: ArmSection,
    /// Simulated battery parameters.
    #[serde(default)]
    pub simulation: SimulationSection,
}

impl Default for HarnessConfig {
    /// Idle test on screen, used when no configuration file is given.
    fn default() -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::default(),
                service_name: "soak-supervisor".to_string(),
            },
            test: TestSection::default(),
            arm: ArmSection::default(),
            simulation: SimulationSection::default(),
        }
    }
}

/// `[test]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSection {
    /// `idle`, `drivetrain` or `arm`.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// `screen` or `file`.
    #[serde(default = "default_output")]
    pub output: String,
    /// Record file label; defaults to the test kind.
    #[serde(default)]
    pub label: Option<String>,
    /// Record directory; defaults to `~/battery_soak`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for TestSection {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            output: default_output(),
            label: None,
            output_dir: None,
        }
    }
}

fn default_kind() -> String {
    TestKind::Idle.as_str().to_string()
}

fn default_output() -> String {
    OutputMode::Screen.to_string()
}

/// `[arm]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArmSection {
    /// Attempts per goal before giving up; 0 retries forever.
    #[serde(default)]
    pub max_attempts: u32,
    /// Pause between attempts [ms].
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ArmSection {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl ArmSection {
    /// Retry policy described by this section.
    pub fn retry_policy(&self) -> RetryPolicy {
        let delay = Duration::from_millis(self.retry_delay_ms);
        match self.max_attempts {
            0 => RetryPolicy::unbounded(delay),
            n => RetryPolicy::bounded(n, delay),
        }
    }
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_ARM_RETRY_DELAY_MS
}

/// `[simulation]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    /// Battery voltage at the start of the run [V].
    #[serde(default = "default_start_voltage")]
    pub start_voltage: f64,
    /// Voltage lost per sample at unit load [V].
    #[serde(default = "default_drain_per_sample")]
    pub drain_per_sample: f64,
    /// Time between samples [ms].
    #[serde(default = "default_sample_period_ms")]
    pub sample_period_ms: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            start_voltage: default_start_voltage(),
            drain_per_sample: default_drain_per_sample(),
            sample_period_ms: default_sample_period_ms(),
        }
    }
}

fn default_start_voltage() -> f64 {
    25.2
}

fn default_drain_per_sample() -> f64 {
    0.01
}

fn default_sample_period_ms() -> u64 {
    DEFAULT_SAMPLE_PERIOD_MS
}

/// Validated test selection derived from a `HarnessConfig`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTest {
    /// Selected behavior.
    pub kind: TestKind,
    /// Selected output mode.
    pub output: OutputMode,
    /// Record label.
    pub label: String,
    /// Explicit record directory, if any.
    pub output_dir: Option<PathBuf>,
    /// Arm goal retry policy.
    pub retry: RetryPolicy,
}

impl HarnessConfig {
    /// Validate every section and resolve the test selection.
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownTestKind` / `UnknownOutputMode` for bad selectors
    /// - `ConfigError::ValidationError` for empty names, empty labels or
    ///   non-positive simulation parameters
    pub fn resolve(&self) -> Result<ResolvedTest, ConfigError> {
        self.shared.validate()?;

        let kind: TestKind = self.test.kind.parse()?;
        let output: OutputMode = self.test.output.parse()?;
        let label = match &self.test.label {
            Some(label) => validate_label(label)?,
            None => kind.as_str().to_string(),
        };

        let sim = &self.simulation;
        if !(sim.start_voltage.is_finite() && sim.start_voltage > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "simulation.start_voltage must be positive, got {}",
                sim.start_voltage
            )));
        }
        if !(sim.drain_per_sample.is_finite() && sim.drain_per_sample >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "simulation.drain_per_sample must be non-negative, got {}",
                sim.drain_per_sample
            )));
        }
        if sim.sample_period_ms == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.sample_period_ms must be > 0".to_string(),
            ));
        }

        Ok(ResolvedTest {
            kind,
            output,
            label,
            output_dir: self.test.output_dir.clone(),
            retry: self.arm.retry_policy(),
        })
    }
}

/// Check that a record label is usable as part of a file name.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` if the label is empty or contains
/// a path separator.
pub fn validate_label(label: &str) -> Result<String, ConfigError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(ConfigError::ValidationError(
            "record label cannot be empty".to_string(),
        ));
    }
    if label.contains(['/', '\\']) {
        return Err(ConfigError::ValidationError(format!(
            "record label '{label}' must not contain path separators"
        )));
    }
    Ok(label.to_string())
}
