//! Drone CLI - closed-loop pilot for the flight server.
//!
//! - pilot: control loop driver and the latest-snapshot cell
//! - status: headless status monitor reading that cell
//! - config: environment configuration for the `drone-pilot` binary

pub mod config;
pub mod pilot;
pub mod status;

pub use config::Config;
pub use pilot::{telemetry_feed, FlightReport, FlightState, Pilot, TelemetryView};
