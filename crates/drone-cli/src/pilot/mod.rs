//! Closed-loop flight control.
//!
//! Runs the policy against the session until the flight ends and publishes
//! every decoded snapshot for displays.

mod driver;
mod feed;

pub use driver::{FlightReport, FlightState, Pilot, SessionState};
pub use feed::{telemetry_feed, TelemetryFeed, TelemetryView};
