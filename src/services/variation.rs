//! Short-term weather variation analysis.
//!
//! Detects significant hour-to-hour shifts over the lookback window and
//! condenses them into a bounded instability score (0-3) that the risk
//! evaluator can fold into its score.

use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::sample_std_dev;
use crate::services::conditions::WeatherSeries;

/// Description used when no variation rule triggers.
pub const STABLE_CONDITIONS: &str = "stable conditions";

/// Consecutive-hour temperature change (°C) considered a swing.
const TEMP_SWING_C: f64 = 5.0;

/// Hourly precipitation (mm) above which an hour counts as rainy.
const RAIN_HOUR_MM: f64 = 0.5;

/// Rain/dry alternations above which the weather counts as unsettled.
const RAIN_ALTERNATIONS: usize = 4;

/// Consecutive-hour humidity change (percentage points) considered a swing.
const HUMIDITY_SWING_PCT: f64 = 20.0;

/// Consecutive-hour wind speed change considered a swing.
const WIND_SWING: f64 = 10.0;

/// Upper bound of the instability score.
const MAX_WEATHER_SCORE: u8 = 3;

/// Result of analyzing an hourly series for short-term instability.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WeatherVariation {
    /// Standard deviation of temperature over the window
    pub temp_variation: f64,
    /// Standard deviation of relative humidity over the window
    pub humidity_variation: f64,
    /// Standard deviation of wind speed over the window
    pub wind_variation: f64,
    /// Hours with precipitation above 0.5 mm
    pub rain_episodes: usize,
    /// Instability score, 0-3
    pub weather_score: u8,
    /// Number of variation rules that triggered
    pub weather_changes: usize,
    /// Labels of the triggered rules, or "stable conditions"
    pub weather_description: String,
}

/// True when any pair of consecutive present readings differs by more than `limit`.
///
/// A pair with a missing reading never counts.
fn has_swing(values: &[Option<f64>], limit: f64) -> bool {
    values.windows(2).any(|w| match (w[0], w[1]) {
        (Some(a), Some(b)) => (b - a).abs() > limit,
        _ => false,
    })
}

fn is_rainy(v: &Option<f64>) -> bool {
    matches!(v, Some(mm) if *mm > RAIN_HOUR_MM)
}

/// Number of rain→dry or dry→rain transitions between consecutive hours.
fn rain_alternations(precipitation: &[Option<f64>]) -> usize {
    precipitation
        .windows(2)
        .filter(|w| is_rainy(&w[0]) != is_rainy(&w[1]))
        .count()
}

/// Analyze an hourly series for significant short-term changes.
///
/// Each rule contributes at most one change, independent of the others:
/// temperature swing, rain/dry alternation, humidity swing, wind swing.
pub fn analyze_variation(series: &WeatherSeries) -> WeatherVariation {
    let rules: [(bool, &str); 4] = [
        (
            has_swing(series.temperature_c(), TEMP_SWING_C),
            "significant temperature variation",
        ),
        (
            rain_alternations(series.precipitation_mm()) > RAIN_ALTERNATIONS,
            "rain/dry alternation",
        ),
        (
            has_swing(series.humidity_pct(), HUMIDITY_SWING_PCT),
            "significant humidity variation",
        ),
        (
            has_swing(series.wind_speed(), WIND_SWING),
            "significant wind variation",
        ),
    ];

    let triggered: Vec<&str> = rules
        .iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, label)| *label)
        .collect();

    let weather_changes = triggered.len();
    let weather_description = if triggered.is_empty() {
        STABLE_CONDITIONS.to_string()
    } else {
        triggered.join(", ")
    };

    WeatherVariation {
        temp_variation: sample_std_dev(series.temperature_c()),
        humidity_variation: sample_std_dev(series.humidity_pct()),
        wind_variation: sample_std_dev(series.wind_speed()),
        rain_episodes: series.precipitation_mm().iter().filter(|v| is_rainy(v)).count(),
        weather_score: (weather_changes as u8).min(MAX_WEATHER_SCORE),
        weather_changes,
        weather_description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conditions::tests::series;
    use crate::services::conditions::HourlyArrays;

    fn flat(n: usize, v: f64) -> Vec<f64> {
        vec![v; n]
    }

    #[test]
    fn test_flat_series_is_stable() {
        let s = series(&flat(24, 20.0), &flat(24, 60.0), &flat(24, 5.0), &flat(24, 0.0));
        let v = analyze_variation(&s);
        assert_eq!(v.weather_score, 0);
        assert_eq!(v.weather_changes, 0);
        assert_eq!(v.weather_description, STABLE_CONDITIONS);
        assert_eq!(v.temp_variation, 0.0);
        assert_eq!(v.rain_episodes, 0);
    }

    #[test]
    fn test_single_temperature_jump() {
        let mut temp = flat(24, 20.0);
        for t in temp.iter_mut().skip(12) {
            *t = 26.0;
        }
        let s = series(&temp, &flat(24, 60.0), &flat(24, 5.0), &flat(24, 0.0));
        let v = analyze_variation(&s);
        assert!(v.weather_score >= 1);
        assert!(v.weather_description.contains("temperature"));
        assert_ne!(v.weather_description, STABLE_CONDITIONS);
        assert!(v.temp_variation > 0.0);
    }

    #[test]
    fn test_temperature_jump_of_exactly_five_does_not_trigger() {
        let s = series(&[20.0, 25.0], &[60.0, 60.0], &[5.0, 5.0], &[0.0, 0.0]);
        assert_eq!(analyze_variation(&s).weather_changes, 0);
    }

    #[test]
    fn test_negative_swings_count() {
        let s = series(&[30.0, 20.0], &[90.0, 60.0], &[25.0, 5.0], &[0.0, 0.0]);
        let v = analyze_variation(&s);
        assert_eq!(v.weather_changes, 3);
        assert_eq!(
            v.weather_description,
            "significant temperature variation, significant humidity variation, significant wind variation"
        );
    }

    #[test]
    fn test_rain_alternation_needs_more_than_four_changes() {
        // 4 transitions: dry rain dry rain dry
        let four = series(&flat(5, 20.0), &flat(5, 60.0), &flat(5, 5.0), &[0.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(analyze_variation(&four).weather_changes, 0);
        assert_eq!(analyze_variation(&four).rain_episodes, 2);

        // 5 transitions
        let five = series(
            &flat(6, 20.0),
            &flat(6, 60.0),
            &flat(6, 5.0),
            &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        );
        let v = analyze_variation(&five);
        assert_eq!(v.weather_changes, 1);
        assert_eq!(v.weather_description, "rain/dry alternation");
    }

    #[test]
    fn test_light_rain_is_dry() {
        // 0.5 mm is not above the rain threshold
        let s = series(
            &flat(6, 20.0),
            &flat(6, 60.0),
            &flat(6, 5.0),
            &[0.0, 0.5, 0.0, 0.5, 0.0, 0.5],
        );
        let v = analyze_variation(&s);
        assert_eq!(v.rain_episodes, 0);
        assert_eq!(v.weather_changes, 0);
    }

    #[test]
    fn test_score_is_capped_at_three() {
        let s = series(
            &[10.0, 20.0, 10.0, 20.0, 10.0, 20.0],
            &[40.0, 70.0, 40.0, 70.0, 40.0, 70.0],
            &[0.0, 15.0, 0.0, 15.0, 0.0, 15.0],
            &[0.0, 2.0, 0.0, 2.0, 0.0, 2.0],
        );
        let v = analyze_variation(&s);
        assert_eq!(v.weather_changes, 4);
        assert_eq!(v.weather_score, 3);
    }

    #[test]
    fn test_missing_hour_breaks_the_pair() {
        let raw = HourlyArrays {
            temperature_c: vec![Some(10.0), None, Some(20.0)],
            humidity_pct: vec![Some(60.0); 3],
            wind_speed: vec![Some(5.0); 3],
            ..Default::default()
        };
        let s = WeatherSeries::try_from(raw).unwrap();
        let v = analyze_variation(&s);
        assert_eq!(v.weather_changes, 0);
        assert_eq!(v.rain_episodes, 0);
    }
}
