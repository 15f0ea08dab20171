//! Configuration loading and validation.
//!
//! The node loads a single TOML file at boot. Counts per sensor kind, the
//! telemetry period and topic map, the control loop cadence, and the
//! outbound buffer depth all come from here; nothing is persisted back.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! log_level = "info"
//! node_name = "hand-01"
//!
//! [store]
//! imu_raw = 2
//! imu_fused = 2
//! potentiometer = 15
//! strain_gauge = 5
//! servo = 15
//!
//! [telemetry]
//! period_ms = 250
//! qos = 1
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::sensor::SensorKind;

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
}

/// Log level for application logging.
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

/// Common configuration fields shared across hand firmware builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedConfig {
    /// Logging verbosity level.
    pub log_level: LogLevel,

    /// Node instance identifier, embedded in topic prefixes.
    pub node_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            node_name: "hand-01".to_string(),
        }
    }
}

/// Per-kind instance counts for `StateStore::init`.
///
/// Counts are fixed for the process lifetime once `init` runs; calling
/// `init` again with a different layout is a destructive reset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLayout {
    /// Raw IMU slots.
    pub imu_raw: usize,
    /// Fused IMU estimate slots.
    pub imu_fused: usize,
    /// Joint potentiometer slots.
    pub potentiometer: usize,
    /// Fingertip strain-gauge slots.
    pub strain_gauge: usize,
    /// Servo status slots.
    pub servo: usize,
}

impl StoreLayout {
    /// Count for one kind.
    pub const fn count(&self, kind: SensorKind) -> usize {
        match kind {
            SensorKind::ImuRaw => self.imu_raw,
            SensorKind::ImuFused => self.imu_fused,
            SensorKind::Potentiometer => self.potentiometer,
            SensorKind::StrainGauge => self.strain_gauge,
            SensorKind::Servo => self.servo,
        }
    }

    /// Total slots across all kinds.
    pub const fn total(&self) -> usize {
        self.imu_raw + self.imu_fused + self.potentiometer + self.strain_gauge + self.servo
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        // One pot and one servo per joint, one gauge per fingertip.
        Self {
            imu_raw: 2,
            imu_fused: 2,
            potentiometer: 15,
            strain_gauge: 5,
            servo: 15,
        }
    }
}

/// Per-kind monitoring topic names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicMap {
    pub imu_raw: String,
    pub imu_fused: String,
    pub potentiometer: String,
    pub strain_gauge: String,
    pub servo: String,
}

impl TopicMap {
    /// Topic for one kind.
    pub fn for_kind(&self, kind: SensorKind) -> &str {
        match kind {
            SensorKind::ImuRaw => &self.imu_raw,
            SensorKind::ImuFused => &self.imu_fused,
            SensorKind::Potentiometer => &self.potentiometer,
            SensorKind::StrainGauge => &self.strain_gauge,
            SensorKind::Servo => &self.servo,
        }
    }
}

impl Default for TopicMap {
    fn default() -> Self {
        Self {
            imu_raw: "hand/monitoring/imu/raw".to_string(),
            imu_fused: "hand/monitoring/imu/fused".to_string(),
            potentiometer: "hand/monitoring/potentiometer".to_string(),
            strain_gauge: "hand/monitoring/strain_gauge".to_string(),
            servo: "hand/monitoring/servo".to_string(),
        }
    }
}

/// Telemetry publisher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Sweep period [ms].
    pub period_ms: u64,
    /// MQTT QoS level for monitoring messages (0..=2).
    pub qos: u8,
    /// Retain flag for monitoring messages.
    pub retain: bool,
    /// Backend-side store flag passed through to the publish capability.
    pub persist: bool,
    /// Per-kind topic names.
    pub topics: TopicMap,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            period_ms: 250,
            qos: 1,
            retain: false,
            persist: true,
            topics: TopicMap::default(),
        }
    }
}

/// Control loop settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Queue polling cadence [ms].
    pub period_ms: u64,
    /// Maximum commands dispatched per tick, so a burst cannot
    /// monopolize the tick budget.
    pub commands_per_tick: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            period_ms: 20,
            commands_per_tick: 8,
        }
    }
}

/// Link layer settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Outbound transport buffer depth (messages).
    pub outbound_depth: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { outbound_depth: 64 }
    }
}

/// Top-level node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub store: StoreLayout,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub link: LinkConfig,
}

impl HandConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `node_name` is empty
    /// - `telemetry.qos` is above 2
    /// - any period or the outbound depth is zero
    /// - any telemetry topic is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shared.node_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "node_name cannot be empty".to_string(),
            ));
        }
        if self.telemetry.qos > 2 {
            return Err(ConfigError::ValidationError(format!(
                "telemetry.qos must be 0..=2, got {}",
                self.telemetry.qos
            )));
        }
        if self.telemetry.period_ms == 0 {
            return Err(ConfigError::ValidationError(
                "telemetry.period_ms must be non-zero".to_string(),
            ));
        }
        if self.control.period_ms == 0 || self.control.commands_per_tick == 0 {
            return Err(ConfigError::ValidationError(
                "control.period_ms and control.commands_per_tick must be non-zero".to_string(),
            ));
        }
        if self.link.outbound_depth == 0 {
            return Err(ConfigError::ValidationError(
                "link.outbound_depth must be non-zero".to_string(),
            ));
        }
        for kind in SensorKind::ALL {
            if self.telemetry.topics.for_kind(kind).is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "telemetry topic for '{}' cannot be empty",
                    kind.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
/// - Semantic validation is a separate `validate()` call
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

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
