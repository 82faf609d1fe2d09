//! Lab sample aggregation.
//!
//! Groups per-sample cyanobacteria counts for one reservoir by sampling date
//! and derives a lab-based risk flag from the toxic cell density. These
//! flags are the ground truth the weather-based flags are compared against.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::services::risk::RiskFlag;

/// A single lab sample row.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSample {
    pub date: NaiveDate,
    pub reservoir_id: String,
    /// Cell density, cells/ml
    pub density: f64,
    pub toxin_present: bool,
}

/// Toxic density thresholds used to derive a lab flag.
///
/// The two calibrations were tuned independently and are not
/// interchangeable; callers pick one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LabCalibration {
    /// moderate above 50 cells/ml, high above 100 cells/ml
    Screening,
    /// moderate above 1000 cells/ml, high above 2000 cells/ml
    Backtest,
}

impl LabCalibration {
    /// `(moderate, high)` toxic density thresholds, cells/ml.
    pub fn thresholds(self) -> (f64, f64) {
        match self {
            LabCalibration::Screening => (50.0, 100.0),
            LabCalibration::Backtest => (1000.0, 2000.0),
        }
    }

    /// Flag for a toxic density. Both thresholds are strict.
    pub fn flag_for(self, toxic_density: f64) -> RiskFlag {
        let (moderate, high) = self.thresholds();
        if toxic_density > high {
            RiskFlag::High
        } else if toxic_density > moderate {
            RiskFlag::Moderate
        } else {
            RiskFlag::Low
        }
    }
}

/// Per-day totals for one reservoir.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyToxinSummary {
    pub date: NaiveDate,
    /// Sum of all sample densities on that date
    pub total_density: f64,
    /// Sum of densities of samples with toxin present
    pub toxic_density: f64,
    pub lab_flag: RiskFlag,
}

/// Group samples by date and compute daily densities and lab flags.
///
/// The output is sorted by ascending date. Samples are expected to belong
/// to a single reservoir (see `samples_for_reservoir`) and to carry finite,
/// non-negative densities, as `parse_lab_samples` guarantees; under that
/// precondition `toxic_density <= total_density` holds for every day.
pub fn aggregate_observations(
    samples: &[ObservationSample],
    calibration: LabCalibration,
) -> Vec<DailyToxinSummary> {
    let mut by_date: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for sample in samples {
        let entry = by_date.entry(sample.date).or_insert((0.0, 0.0));
        entry.0 += sample.density;
        if sample.toxin_present {
            entry.1 += sample.density;
        }
    }

    by_date
        .into_iter()
        .map(|(date, (total_density, toxic_density))| DailyToxinSummary {
            date,
            total_density,
            toxic_density,
            lab_flag: calibration.flag_for(toxic_density),
        })
        .collect()
}

/// Keep only the samples of one reservoir.
pub fn samples_for_reservoir(samples: Vec<ObservationSample>, reservoir_id: &str) -> Vec<ObservationSample> {
    samples
        .into_iter()
        .filter(|s| s.reservoir_id == reservoir_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2012, 7, d).unwrap()
    }

    fn sample(d: u32, density: f64, toxin_present: bool) -> ObservationSample {
        ObservationSample {
            date: day(d),
            reservoir_id: "BHR".to_string(),
            density,
            toxin_present,
        }
    }

    #[test]
    fn test_single_toxic_sample_screening_is_moderate() {
        let out = aggregate_observations(&[sample(3, 60.0, true)], LabCalibration::Screening);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].toxic_density, 60.0);
        assert_eq!(out[0].lab_flag, RiskFlag::Moderate);
    }

    #[test]
    fn test_groups_by_date_and_sums() {
        let samples = vec![
            sample(5, 40.0, true),
            sample(5, 30.0, false),
            sample(5, 80.0, true),
            sample(2, 10.0, false),
        ];
        let out = aggregate_observations(&samples, LabCalibration::Screening);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].date, day(2));
        assert_eq!(out[0].total_density, 10.0);
        assert_eq!(out[0].toxic_density, 0.0);
        assert_eq!(out[0].lab_flag, RiskFlag::Low);
        assert_eq!(out[1].date, day(5));
        assert_eq!(out[1].total_density, 150.0);
        assert_eq!(out[1].toxic_density, 120.0);
        assert_eq!(out[1].lab_flag, RiskFlag::High);
    }

    #[test]
    fn test_output_sorted_and_idempotent() {
        let samples = vec![
            sample(20, 5.0, true),
            sample(1, 500.0, true),
            sample(11, 70.0, false),
            sample(1, 3.0, false),
        ];
        let first = aggregate_observations(&samples, LabCalibration::Screening);
        let second = aggregate_observations(&samples, LabCalibration::Screening);
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_toxic_never_exceeds_total() {
        let samples = vec![
            sample(1, 12.0, true),
            sample(1, 7.0, false),
            sample(2, 0.0, true),
            sample(3, 1500.0, true),
        ];
        for s in aggregate_observations(&samples, LabCalibration::Backtest) {
            assert!(s.toxic_density <= s.total_density);
        }
    }

    #[test]
    fn test_calibrations_differ() {
        assert_eq!(LabCalibration::Screening.flag_for(150.0), RiskFlag::High);
        assert_eq!(LabCalibration::Backtest.flag_for(150.0), RiskFlag::Low);
        assert_eq!(LabCalibration::Backtest.flag_for(1500.0), RiskFlag::Moderate);
        assert_eq!(LabCalibration::Backtest.flag_for(2000.5), RiskFlag::High);
    }

    #[test]
    fn test_thresholds_are_strict() {
        assert_eq!(LabCalibration::Screening.flag_for(50.0), RiskFlag::Low);
        assert_eq!(LabCalibration::Screening.flag_for(100.0), RiskFlag::Moderate);
        assert_eq!(LabCalibration::Backtest.flag_for(2000.0), RiskFlag::Moderate);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_observations(&[], LabCalibration::Screening).is_empty());
    }

    #[test]
    fn test_samples_for_reservoir() {
        let mut other = sample(1, 5.0, true);
        other.reservoir_id = "BRR".to_string();
        let kept = samples_for_reservoir(vec![sample(1, 1.0, false), other], "BHR");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].reservoir_id, "BHR");
    }
}
