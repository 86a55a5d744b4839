//! Decoder for the server's delimited telemetry string.
//!
//! Format: `X-{x}-Y-{y}-BAT-{bat}-GYR-[gx,gy,gz]-WIND-{wind}-DUST-{dust}-SENS-{status}`
//!
//! Decoding is best-effort and never fails: unknown keys are skipped, a
//! missing or unparsable field keeps its default, and the rest of the
//! snapshot is still filled in.

use crate::models::{SensorTier, TelemetrySnapshot};

const KEY_X: &str = "X";
const KEY_Y: &str = "Y";
const KEY_BATTERY: &str = "BAT";
const KEY_GYROSCOPE: &str = "GYR";
const KEY_WIND: &str = "WIND";
const KEY_DUST: &str = "DUST";
const KEY_SENSOR: &str = "SENS";

/// Decode a telemetry string into a snapshot.
pub fn decode(raw: &str) -> TelemetrySnapshot {
    let mut snapshot = TelemetrySnapshot::default();
    let mut tokens = Tokens::new(raw);

    while let Some(key) = tokens.next_key() {
        // An odd trailing key has no value and is dropped.
        let Some(value) = tokens.next_value() else {
            break;
        };
        apply_field(&mut snapshot, key.trim(), value.trim());
    }

    snapshot
}

fn apply_field(snapshot: &mut TelemetrySnapshot, key: &str, value: &str) {
    match key {
        KEY_X => snapshot.x = parse_number(value),
        KEY_Y => snapshot.y = parse_number(value),
        KEY_BATTERY => snapshot.battery = parse_number(value).clamp(0.0, 100.0),
        KEY_GYROSCOPE => snapshot.gyroscope = parse_gyroscope(value),
        KEY_WIND => snapshot.wind_speed = parse_number(value),
        KEY_DUST => snapshot.dust_level = parse_number(value),
        KEY_SENSOR => snapshot.sensor_tier = value.parse().unwrap_or_default(),
        _ => {}
    }
}

/// Non-finite values (`NaN`, `inf`) count as unparsable.
fn parse_number(value: &str) -> f64 {
    value
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .unwrap_or(0.0)
}

/// Parse a bracketed `[gx,gy,gz]` triple. One bad component, or a count
/// other than three, voids the whole vector.
fn parse_gyroscope(value: &str) -> [f64; 3] {
    let inner = value.trim_matches(|c| c == '[' || c == ']');
    let components: Result<Vec<f64>, _> = inner
        .split(',')
        .map(str::trim)
        .filter(|component| !component.is_empty())
        .map(str::parse::<f64>)
        .collect();

    match components.as_deref() {
        Ok(&[gx, gy, gz]) if [gx, gy, gz].iter().all(|v| v.is_finite()) => [gx, gy, gz],
        _ => [0.0; 3],
    }
}

/// Walks the raw string as alternating key and value tokens.
///
/// `-` is both the delimiter and the sign of negative numbers. A value slot
/// that starts with `-` followed by something that can begin a number keeps
/// it as its sign. Any other leading `-` means the value is empty. A
/// bracketed value extends to its closing `]`.
struct Tokens<'a> {
    rest: Option<&'a str>,
}

impl<'a> Tokens<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            rest: if raw.is_empty() { None } else { Some(raw) },
        }
    }

    fn next_key(&mut self) -> Option<&'a str> {
        self.take_until_separator()
    }

    fn next_value(&mut self) -> Option<&'a str> {
        let rest = self.rest?;

        if rest.starts_with('[') {
            if let Some(end) = rest.find(']') {
                let after = &rest[end + 1..];
                self.rest = match after.strip_prefix('-') {
                    Some(remaining) => Some(remaining),
                    None if after.is_empty() => None,
                    None => Some(after),
                };
                return Some(&rest[..=end]);
            }
        }

        if let Some(unsigned) = rest.strip_prefix('-') {
            if !unsigned.starts_with(starts_number) {
                self.rest = Some(unsigned);
                return Some("");
            }
            return match unsigned.find('-') {
                Some(idx) => {
                    self.rest = Some(&unsigned[idx + 1..]);
                    Some(&rest[..idx + 1])
                }
                None => {
                    self.rest = None;
                    Some(rest)
                }
            };
        }

        self.take_until_separator()
    }

    fn take_until_separator(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        match rest.find('-') {
            Some(idx) => {
                self.rest = Some(&rest[idx + 1..]);
                Some(&rest[..idx])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}

fn starts_number(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | 'i' | 'I' | 'n' | 'N')
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "X-10.5-Y-3.2-BAT-87-GYR-[0.1,0.0,-0.2]-WIND-2.0-DUST-0.5-SENS-GREEN";

    #[test]
    fn test_decode_full_string() {
        let snapshot = decode(FULL);
        assert_eq!(snapshot.x, 10.5);
        assert_eq!(snapshot.y, 3.2);
        assert_eq!(snapshot.battery, 87.0);
        assert_eq!(snapshot.gyroscope, [0.1, 0.0, -0.2]);
        assert_eq!(snapshot.wind_speed, 2.0);
        assert_eq!(snapshot.dust_level, 0.5);
        assert_eq!(snapshot.sensor_tier, SensorTier::Nominal);
    }

    #[test]
    fn test_missing_battery_defaults_to_zero() {
        let snapshot = decode("X-1-Y-2-SENS-RED");
        assert_eq!(snapshot.battery, 0.0);
        assert_eq!(snapshot.sensor_tier, SensorTier::Critical);
    }

    #[test]
    fn test_missing_sensor_defaults_to_nominal() {
        let snapshot = decode("X-1-Y-2-BAT-50");
        assert_eq!(snapshot.sensor_tier, SensorTier::Nominal);
        assert_eq!(snapshot.battery, 50.0);
    }

    #[test]
    fn test_bad_gyroscope_component_voids_vector() {
        let snapshot = decode("GYR-[0.1,bad,0.2]-BAT-40");
        assert_eq!(snapshot.gyroscope, [0.0, 0.0, 0.0]);
        assert_eq!(snapshot.battery, 40.0);
    }

    #[test]
    fn test_short_gyroscope_voids_vector() {
        assert_eq!(decode("GYR-[0.1,0.2]").gyroscope, [0.0; 3]);
        assert_eq!(decode("GYR-[0.1,0.2,0.3,0.4]").gyroscope, [0.0; 3]);
    }

    #[test]
    fn test_unknown_keys_are_skipped() {
        let snapshot = decode("TEMP-30-X-4-FOO-bar-Y-8");
        assert_eq!(snapshot.x, 4.0);
        assert_eq!(snapshot.y, 8.0);
    }

    #[test]
    fn test_odd_trailing_token_is_ignored() {
        let snapshot = decode("X-4-Y-8-BAT");
        assert_eq!(snapshot.x, 4.0);
        assert_eq!(snapshot.y, 8.0);
        assert_eq!(snapshot.battery, 0.0);
    }

    #[test]
    fn test_negative_values() {
        let snapshot = decode("X--4.5-Y-10-WIND--1");
        assert_eq!(snapshot.x, -4.5);
        assert_eq!(snapshot.y, 10.0);
        assert_eq!(snapshot.wind_speed, -1.0);
    }

    #[test]
    fn test_unparsable_field_falls_back_alone() {
        let snapshot = decode("X-abc-Y-12-SENS-PURPLE");
        assert_eq!(snapshot.x, 0.0);
        assert_eq!(snapshot.y, 12.0);
        assert_eq!(snapshot.sensor_tier, SensorTier::Nominal);
    }

    #[test]
    fn test_empty_value_does_not_swallow_next_key() {
        let snapshot = decode("X--Y-5-BAT-50");
        assert_eq!(snapshot.x, 0.0);
        assert_eq!(snapshot.y, 5.0);
        assert_eq!(snapshot.battery, 50.0);

        let snapshot = decode("X-1-Y--BAT-50-SENS-YELLOW");
        assert_eq!(snapshot.x, 1.0);
        assert_eq!(snapshot.y, 0.0);
        assert_eq!(snapshot.battery, 50.0);
        assert_eq!(snapshot.sensor_tier, SensorTier::Degraded);
    }

    #[test]
    fn test_non_finite_values_fall_back() {
        let snapshot = decode("X-inf-Y--inf-BAT-NaN-WIND-1e400-DUST-nan-GYR-[1,NaN,2]");
        assert_eq!(snapshot.x, 0.0);
        assert_eq!(snapshot.y, 0.0);
        assert_eq!(snapshot.battery, 0.0);
        assert_eq!(snapshot.wind_speed, 0.0);
        assert_eq!(snapshot.dust_level, 0.0);
        assert_eq!(snapshot.gyroscope, [0.0; 3]);
    }

    #[test]
    fn test_battery_is_clamped() {
        assert_eq!(decode("BAT-140").battery, 100.0);
        assert_eq!(decode("BAT--3").battery, 0.0);
    }

    #[test]
    fn test_decode_is_total() {
        let inputs = [
            "",
            "-",
            "--",
            "---",
            "X",
            "X-",
            "GYR-[",
            "GYR-]",
            "GYR-[1,2,3",
            "[[[-]]]",
            "SENS--",
            "é-ü-ñ-漢字",
            "X-1e400-Y-NaN",
            ",,,,-[,]-",
        ];
        for input in inputs {
            let _ = decode(input);
        }
        assert_eq!(decode(""), TelemetrySnapshot::default());
    }
}
