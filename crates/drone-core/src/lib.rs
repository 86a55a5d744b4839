//! Drone Core - telemetry decoding and the control policy.
//!
//! Everything here is pure: no I/O, no shared state.

pub mod models;
pub mod policy;
pub mod rules;
pub mod telemetry;

pub use models::{Command, FlightMetrics, Movement, SensorTier, TelemetrySnapshot};
pub use policy::decide;
pub use rules::TARGET_ALTITUDE;
pub use telemetry::decode;
