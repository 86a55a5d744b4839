//! Policy thresholds, expressed as per-tier tables.

use crate::models::SensorTier;

/// Altitude the policy steers towards in the nominal tier.
pub const TARGET_ALTITUDE: f64 = 150.0;

/// Below this battery percentage the conservation override kicks in.
pub const LOW_BATTERY_PERCENT: f64 = 20.0;

/// Speed forced by the conservation override.
pub const LOW_BATTERY_SPEED: u8 = 1;

/// How a tier adjusts altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AltitudeRule {
    /// Step towards [`TARGET_ALTITUDE`], at most `max_step` per command
    /// (`low_battery_max_step` while the conservation override is active).
    Track {
        max_step: f64,
        low_battery_max_step: f64,
    },
    /// Fixed deltas by altitude band. First matching band wins, no match
    /// holds altitude.
    Bands(&'static [AltitudeBand]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Above(f64),
    Below(f64),
}

impl Bound {
    pub fn contains(self, value: f64) -> bool {
        match self {
            Bound::Above(limit) => value > limit,
            Bound::Below(limit) => value < limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeBand {
    pub when: Bound,
    pub delta: f64,
}

/// Speed used while battery is strictly above `battery_above`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedBand {
    pub battery_above: f64,
    pub speed: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierRules {
    pub altitude: AltitudeRule,
    /// Checked in order, highest threshold first.
    pub speed_bands: &'static [SpeedBand],
    pub fallback_speed: u8,
}

pub static NOMINAL_RULES: TierRules = TierRules {
    altitude: AltitudeRule::Track {
        max_step: 5.0,
        low_battery_max_step: 3.0,
    },
    speed_bands: &[
        SpeedBand { battery_above: 70.0, speed: 5 },
        SpeedBand { battery_above: 40.0, speed: 3 },
    ],
    fallback_speed: 1,
};

pub static DEGRADED_RULES: TierRules = TierRules {
    altitude: AltitudeRule::Bands(&[
        AltitudeBand { when: Bound::Above(50.0), delta: -10.0 },
        AltitudeBand { when: Bound::Above(30.0), delta: -5.0 },
    ]),
    speed_bands: &[SpeedBand { battery_above: 60.0, speed: 3 }],
    fallback_speed: 1,
};

pub static CRITICAL_RULES: TierRules = TierRules {
    altitude: AltitudeRule::Bands(&[
        AltitudeBand { when: Bound::Above(2.5), delta: -0.1 },
        AltitudeBand { when: Bound::Below(1.5), delta: 0.2 },
    ]),
    speed_bands: &[SpeedBand { battery_above: 50.0, speed: 2 }],
    fallback_speed: 1,
};

/// Rule table for a sensor tier.
pub fn rules_for(tier: SensorTier) -> &'static TierRules {
    match tier {
        SensorTier::Nominal => &NOMINAL_RULES,
        SensorTier::Degraded => &DEGRADED_RULES,
        SensorTier::Critical => &CRITICAL_RULES,
    }
}
