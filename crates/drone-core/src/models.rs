//! Core data models for the pilot client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One fully decoded telemetry reading.
///
/// Snapshots are plain values: a new one is produced on every decode and
/// nothing mutates a snapshot after it has been published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Horizontal position (distance flown forward).
    pub x: f64,
    /// Vertical position, used as the altitude by the policy.
    pub y: f64,
    /// Battery percentage in `[0, 100]`.
    pub battery: f64,
    /// Gyroscope reading. All zeros when the reported vector was malformed.
    pub gyroscope: [f64; 3],
    pub wind_speed: f64,
    pub dust_level: f64,
    pub sensor_tier: SensorTier,
}

impl TelemetrySnapshot {
    /// Altitude as seen by the policy.
    pub fn altitude(&self) -> f64 {
        self.y
    }
}

/// Coarse sensor-health classification reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorTier {
    /// Sensors healthy (`GREEN` on the wire)
    #[default]
    Nominal,
    /// Sensors impaired (`YELLOW` on the wire)
    Degraded,
    /// Sensors failing (`RED` on the wire)
    Critical,
}

impl SensorTier {
    /// Label used by the server in the telemetry string.
    pub fn wire_label(self) -> &'static str {
        match self {
            SensorTier::Nominal => "GREEN",
            SensorTier::Degraded => "YELLOW",
            SensorTier::Critical => "RED",
        }
    }
}

impl fmt::Display for SensorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorTier::Nominal => write!(f, "NOMINAL"),
            SensorTier::Degraded => write!(f, "DEGRADED"),
            SensorTier::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sensor tier label: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for SensorTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GREEN" | "NOMINAL" => Ok(SensorTier::Nominal),
            "YELLOW" | "DEGRADED" => Ok(SensorTier::Degraded),
            "RED" | "CRITICAL" => Ok(SensorTier::Critical),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}

/// Movement tag attached to every command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Movement {
    #[default]
    #[serde(rename = "fwd")]
    Forward,
}

/// Next command for the vehicle, produced by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub speed: u8,
    /// Signed altitude change.
    pub altitude: f64,
    pub movement: Movement,
}

impl Command {
    /// Command sent before any telemetry exists: full speed, climb towards
    /// the target altitude.
    pub fn initial() -> Self {
        Self {
            speed: 5,
            altitude: crate::rules::TARGET_ALTITUDE,
            movement: Movement::Forward,
        }
    }
}

/// Cumulative flight statistics, reported by the server on a crash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightMetrics {
    #[serde(default)]
    pub total_distance: f64,
    #[serde(default)]
    pub iterations: u64,
}
