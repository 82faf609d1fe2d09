//! Backtesting weather-derived flags against lab-derived flags.
//!
//! `compare` cross-tabulates the two flag streams per date. `run_backtest`
//! drives the whole pipeline for one reservoir: aggregate lab samples,
//! fetch and evaluate the weather window before each sampling date, then
//! compare.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::conditions::Rounding;
use crate::services::open_meteo::OpenMeteoClient;
use crate::services::prediction::{assess_series, LakeSite};
use crate::services::risk::{RiskConfig, RiskFlag};
use crate::services::toxin::{
    aggregate_observations, samples_for_reservoir, DailyToxinSummary, LabCalibration,
    ObservationSample,
};

/// Maximum number of weather windows fetched at once during a backtest.
const BACKTEST_CONCURRENCY: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BacktestError {
    #[error("flag series differ in length: {lab} lab vs {weather} weather")]
    LengthMismatch { lab: usize, weather: usize },
    #[error("dates differ at position {index}: lab {lab}, weather {weather}")]
    DateMismatch {
        index: usize,
        lab: NaiveDate,
        weather: NaiveDate,
    },
}

/// A flag attached to the date it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DatedFlag {
    pub date: NaiveDate,
    pub flag: RiskFlag,
}

/// Counts of (lab flag, weather flag) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionMatrix {
    /// Indexed `[lab][weather]`.
    counts: [[u32; 3]; 3],
}

impl TransitionMatrix {
    pub fn record(&mut self, lab: RiskFlag, weather: RiskFlag) {
        self.counts[lab.index()][weather.index()] += 1;
    }

    pub fn count(&self, lab: RiskFlag, weather: RiskFlag) -> u32 {
        self.counts[lab.index()][weather.index()]
    }

    /// Dates where both sources agree on `flag`.
    pub fn agreement(&self, flag: RiskFlag) -> u32 {
        self.count(flag, flag)
    }

    pub fn total_agreement(&self) -> u32 {
        RiskFlag::ALL.iter().map(|f| self.agreement(*f)).sum()
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().flatten().sum()
    }

    pub fn summary(&self) -> TransitionSummary {
        use RiskFlag::{High, Low, Moderate};
        TransitionSummary {
            low: self.agreement(Low),
            moderate: self.agreement(Moderate),
            high: self.agreement(High),
            high_as_moderate: self.count(High, Moderate),
            high_as_low: self.count(High, Low),
            low_as_high: self.count(Low, High),
            low_as_moderate: self.count(Low, Moderate),
            moderate_as_high: self.count(Moderate, High),
            moderate_as_low: self.count(Moderate, Low),
            agreement: self.total_agreement(),
            total: self.total(),
        }
    }
}

/// Named totals of a transition matrix.
///
/// `x_as_y` counts dates where the lab said `x` and the weather said `y`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransitionSummary {
    /// Both sources low
    pub low: u32,
    /// Both sources moderate
    pub moderate: u32,
    /// Both sources high
    pub high: u32,
    pub high_as_moderate: u32,
    pub high_as_low: u32,
    pub low_as_high: u32,
    pub low_as_moderate: u32,
    pub moderate_as_high: u32,
    pub moderate_as_low: u32,
    /// Sum of the three agreement counts
    pub agreement: u32,
    pub total: u32,
}

/// Cross-tabulate lab flags against weather flags for the same dates.
///
/// Both slices must list the same dates in the same order.
pub fn compare(lab: &[DatedFlag], weather: &[DatedFlag]) -> Result<TransitionMatrix, BacktestError> {
    if lab.len() != weather.len() {
        return Err(BacktestError::LengthMismatch {
            lab: lab.len(),
            weather: weather.len(),
        });
    }

    let mut matrix = TransitionMatrix::default();
    for (index, (l, w)) in lab.iter().zip(weather).enumerate() {
        if l.date != w.date {
            return Err(BacktestError::DateMismatch {
                index,
                lab: l.date,
                weather: w.date,
            });
        }
        matrix.record(l.flag, w.flag);
    }
    Ok(matrix)
}

// ---------------------------------------------------------------------------
// Backtest runner
// ---------------------------------------------------------------------------

/// The reservoir being backtested and the lake it is evaluated as.
#[derive(Debug, Clone)]
pub struct BacktestSite {
    pub reservoir_id: String,
    pub lake: LakeSite,
}

/// One sampled date with both flags.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BacktestRow {
    pub date: NaiveDate,
    pub total_density: f64,
    pub toxic_density: f64,
    pub lab_flag: RiskFlag,
    pub weather_flag: RiskFlag,
    pub weather_message: String,
}

/// Result of backtesting one reservoir.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BacktestReport {
    pub reservoir_id: String,
    pub calibration: LabCalibration,
    pub transitions: TransitionSummary,
    /// Per-date detail, ascending by date
    pub rows: Vec<BacktestRow>,
}

async fn weather_flag_for(
    client: &OpenMeteoClient,
    site: &BacktestSite,
    day: &DailyToxinSummary,
    config: &RiskConfig,
    today: NaiveDate,
) -> Result<BacktestRow, AppError> {
    let series = client
        .fetch_for_date(site.lake.latitude, site.lake.longitude, day.date, today)
        .await?;
    let assessment = assess_series(&series, &site.lake, config, Rounding::None)?;

    Ok(BacktestRow {
        date: day.date,
        total_density: day.total_density,
        toxic_density: day.toxic_density,
        lab_flag: day.lab_flag,
        weather_flag: assessment.flag,
        weather_message: assessment.message,
    })
}

/// Backtest weather-derived flags against lab samples for one reservoir.
///
/// Weather windows are fetched concurrently; the rows are re-sorted by date
/// before comparison. The first failing date aborts the run.
pub async fn run_backtest(
    client: &OpenMeteoClient,
    site: &BacktestSite,
    samples: &[ObservationSample],
    calibration: LabCalibration,
    config: &RiskConfig,
    today: NaiveDate,
) -> Result<BacktestReport, AppError> {
    let samples = samples_for_reservoir(samples.to_vec(), &site.reservoir_id);
    let days = aggregate_observations(&samples, calibration);
    tracing::info!(
        "Backtesting reservoir {} over {} sampled dates",
        site.reservoir_id,
        days.len()
    );

    let fetches: Vec<_> = days
        .iter()
        .map(|day| weather_flag_for(client, site, day, config, today))
        .collect();
    let results: Vec<Result<BacktestRow, AppError>> = stream::iter(fetches)
        .buffer_unordered(BACKTEST_CONCURRENCY)
        .collect()
        .await;

    let mut rows = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    rows.sort_by_key(|r| r.date);

    let lab: Vec<DatedFlag> = rows
        .iter()
        .map(|r| DatedFlag {
            date: r.date,
            flag: r.lab_flag,
        })
        .collect();
    let weather: Vec<DatedFlag> = rows
        .iter()
        .map(|r| DatedFlag {
            date: r.date,
            flag: r.weather_flag,
        })
        .collect();
    let matrix = compare(&lab, &weather)?;

    tracing::info!(
        "Reservoir {}: {}/{} dates agree",
        site.reservoir_id,
        matrix.total_agreement(),
        matrix.total()
    );

    Ok(BacktestReport {
        reservoir_id: site.reservoir_id.clone(),
        calibration,
        transitions: matrix.summary(),
        rows,
    })
}
