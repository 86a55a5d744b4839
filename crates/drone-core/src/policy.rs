//! Greedy control policy: picks the next command from the latest snapshot.
//!
//! The policy is stateless. Identical snapshots always produce identical
//! commands.

use crate::models::{Command, Movement, TelemetrySnapshot};
use crate::rules::{
    rules_for, AltitudeRule, TierRules, LOW_BATTERY_PERCENT, LOW_BATTERY_SPEED, TARGET_ALTITUDE,
};

/// Choose the next command for a snapshot.
pub fn decide(snapshot: &TelemetrySnapshot) -> Command {
    let rules = rules_for(snapshot.sensor_tier);
    let low_battery = snapshot.battery < LOW_BATTERY_PERCENT;

    let speed = if low_battery {
        LOW_BATTERY_SPEED
    } else {
        speed_for(rules, snapshot.battery)
    };

    Command {
        speed,
        altitude: altitude_delta(&rules.altitude, snapshot.altitude(), low_battery),
        movement: Movement::Forward,
    }
}

fn speed_for(rules: &TierRules, battery: f64) -> u8 {
    rules
        .speed_bands
        .iter()
        .find(|band| battery > band.battery_above)
        .map_or(rules.fallback_speed, |band| band.speed)
}

fn altitude_delta(rule: &AltitudeRule, altitude: f64, low_battery: bool) -> f64 {
    match *rule {
        AltitudeRule::Track {
            max_step,
            low_battery_max_step,
        } => {
            let step = if low_battery { low_battery_max_step } else { max_step };
            let error = TARGET_ALTITUDE - altitude;
            if altitude < TARGET_ALTITUDE {
                step.min(error)
            } else {
                (-step).max(error)
            }
        }
        AltitudeRule::Bands(bands) => bands
            .iter()
            .find(|band| band.when.contains(altitude))
            .map_or(0.0, |band| band.delta),
    }
}
