//! Shared numeric helpers for hourly weather readings.
//!
//! Hourly arrays from the weather provider may contain `null` entries, so
//! every statistic here works over `Option<f64>` slices and ignores missing
//! hours:
//!
//! - `mean_present` / `sum_present`: column aggregates used for condition summaries
//! - `sample_std_dev`: dispersion used by the variation analyzer (n - 1 denominator)
//! - `round_1dp` / `round_dp`: decimal rounding for values shown to users

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Iterate over the readings that are present and finite.
pub(crate) fn present(values: &[Option<f64>]) -> impl Iterator<Item = f64> + '_ {
    values.iter().filter_map(|v| *v).filter(|v| v.is_finite())
}

/// Mean of the present readings, or `None` when there are none.
pub(crate) fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = present(values).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Sum of the present readings. An all-missing column sums to 0.
pub(crate) fn sum_present(values: &[Option<f64>]) -> f64 {
    present(values).sum()
}

/// Sample standard deviation of the present readings.
///
/// Returns 0.0 when fewer than two readings are present.
pub(crate) fn sample_std_dev(values: &[Option<f64>]) -> f64 {
    let readings: Vec<f64> = present(values).collect();
    if readings.len() < 2 {
        return 0.0;
    }
    let n = readings.len() as f64;
    let mean = readings.iter().sum::<f64>() / n;
    let var = readings.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

/// Round an f64 to one decimal place.
///
/// Rounds the exact binary value, so 24.95 (stored as 24.9499...) becomes
/// 24.9. Non-finite inputs are returned unchanged.
pub(crate) fn round_1dp(v: f64) -> f64 {
    round_dp(v, 1)
}

/// Round an f64 to `places` decimal places, the same way as `round_1dp`.
pub(crate) fn round_dp(v: f64, places: usize) -> f64 {
    if !v.is_finite() {
        tracing::warn!("round_dp received non-finite value {}, leaving as is", v);
        return v;
    }
    Decimal::from_str_exact(&format!("{:.*}", places, v))
        .ok()
        .and_then(|d| d.to_f64())
        .unwrap_or(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_present_skips_missing() {
        let values = [Some(20.0), None, Some(22.0)];
        assert_eq!(mean_present(&values), Some(21.0));
    }

    #[test]
    fn test_mean_present_all_missing() {
        assert_eq!(mean_present(&[None, None]), None);
        assert_eq!(mean_present(&[]), None);
    }

    #[test]
    fn test_mean_present_ignores_nan() {
        let values = [Some(f64::NAN), Some(4.0)];
        assert_eq!(mean_present(&values), Some(4.0));
    }

    #[test]
    fn test_sum_present() {
        assert_eq!(sum_present(&[Some(0.5), None, Some(1.5)]), 2.0);
        assert_eq!(sum_present(&[None]), 0.0);
    }

    #[test]
    fn test_sample_std_dev_known_values() {
        // 2, 4, 4, 4, 5, 5, 7, 9: sample variance = 32 / 7
        let values: Vec<Option<f64>> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .iter()
            .map(|v| Some(*v))
            .collect();
        let expected = (32.0f64 / 7.0).sqrt();
        assert!((sample_std_dev(&values) - expected).abs() < 1e-10);
    }

    #[test]
    fn test_sample_std_dev_single_value() {
        assert_eq!(sample_std_dev(&[Some(3.0)]), 0.0);
        assert_eq!(sample_std_dev(&[Some(3.0), None]), 0.0);
    }

    #[test]
    fn test_round_1dp() {
        assert_eq!(round_1dp(22.46), 22.5);
        assert_eq!(round_1dp(-4.74), -4.7);
        assert_eq!(round_1dp(10.0), 10.0);
    }

    #[test]
    fn test_round_1dp_uses_binary_value_at_ties() {
        assert_eq!(round_1dp(22.95), 22.9);
        assert_eq!(round_1dp(24.95), 24.9);
        assert_eq!(round_1dp(0.15), 0.1);
    }

    #[test]
    fn test_round_dp_three_places() {
        assert_eq!(round_dp(0.31249, 3), 0.312);
        assert_eq!(round_dp(0.3, 3), 0.3);
    }

    #[test]
    fn test_round_1dp_non_finite() {
        assert!(round_1dp(f64::NAN).is_nan());
        assert_eq!(round_1dp(f64::INFINITY), f64::INFINITY);
    }
}
