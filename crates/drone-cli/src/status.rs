//! Headless status monitor.
//!
//! Polls the latest snapshot at a fixed cadence and logs one line per tick.
//! Read-only: it never touches the session.

use crate::pilot::TelemetryView;
use drone_core::models::TelemetrySnapshot;
use std::fmt;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryLevel {
    Good,
    Low,
    Critical,
}

impl BatteryLevel {
    pub fn from_percent(battery: f64) -> Self {
        if battery > 50.0 {
            BatteryLevel::Good
        } else if battery > 20.0 {
            BatteryLevel::Low
        } else {
            BatteryLevel::Critical
        }
    }
}

impl fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatteryLevel::Good => write!(f, "good"),
            BatteryLevel::Low => write!(f, "low"),
            BatteryLevel::Critical => write!(f, "critical"),
        }
    }
}

/// One status line for a snapshot.
pub fn status_line(snapshot: &TelemetrySnapshot) -> String {
    format!(
        "battery {:.1}% ({}) | sensor {} | gyro x {:.2} | wind {:.2} | dust {:.2} | x {:.2} | altitude {:.2}",
        snapshot.battery,
        BatteryLevel::from_percent(snapshot.battery),
        snapshot.sensor_tier.wire_label(),
        snapshot.gyroscope[0],
        snapshot.wind_speed,
        snapshot.dust_level,
        snapshot.x,
        snapshot.altitude(),
    )
}

pub async fn run_status_monitor(
    view: TelemetryView,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::debug!("Status monitor shutting down");
                break;
            }
            _ = ticker.tick() => {
                match view.current() {
                    Some(snapshot) => tracing::info!("{}", status_line(&snapshot)),
                    None => tracing::debug!("Waiting for telemetry"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drone_core::models::SensorTier;

    #[test]
    fn battery_levels() {
        assert_eq!(BatteryLevel::from_percent(80.0), BatteryLevel::Good);
        assert_eq!(BatteryLevel::from_percent(50.0), BatteryLevel::Low);
        assert_eq!(BatteryLevel::from_percent(21.0), BatteryLevel::Low);
        assert_eq!(BatteryLevel::from_percent(20.0), BatteryLevel::Critical);
    }

    #[test]
    fn status_line_formats_fields() {
        let snapshot = TelemetrySnapshot {
            x: 12.0,
            y: 148.5,
            battery: 33.3,
            gyroscope: [0.25, 1.0, 2.0],
            wind_speed: 1.5,
            dust_level: 0.125,
            sensor_tier: SensorTier::Degraded,
        };
        let line = status_line(&snapshot);
        assert!(line.contains("battery 33.3% (low)"));
        assert!(line.contains("sensor YELLOW"));
        assert!(line.contains("gyro x 0.25"));
        assert!(line.contains("altitude 148.50"));
    }

    #[tokio::test]
    async fn monitor_stops_on_shutdown() {
        let (_feed, view) = crate::pilot::telemetry_feed();
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_status_monitor(view, Duration::from_millis(5), rx));
        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
