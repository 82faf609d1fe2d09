//! Lab sample loader.
//!
//! Reads the CSV export of the cyanotoxin lab spreadsheet and keeps the rows
//! for one reservoir. Expected header (extra columns are ignored):
//!
//! ```text
//! date,reservoir,density_cells/ml,toxin
//! 2012-07-15,BHR,1520.5,1
//! ```
//!
//! `toxin` is `1` when toxin was detected and `0` otherwise. Dates may carry
//! a time suffix (`2012-07-15 00:00:00`), which is dropped.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::path::Path;
use thiserror::Error;

use crate::services::toxin::ObservationSample;

const COL_DATE: &str = "date";
const COL_RESERVOIR: &str = "reservoir";
const COL_DENSITY: &str = "density_cells/ml";
const COL_TOXIN: &str = "toxin";

/// Errors that can occur while loading lab samples.
#[derive(Debug, Error)]
pub enum LabDataError {
    #[error("IO error reading lab data: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing column: {0}")]
    MissingColumn(&'static str),
    #[error("Invalid value in row {row} for '{column}': {value}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Column positions resolved from the header row.
struct Columns {
    date: usize,
    reservoir: usize,
    density: usize,
    toxin: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, LabDataError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or(LabDataError::MissingColumn(name))
        };
        Ok(Self {
            date: find(COL_DATE)?,
            reservoir: find(COL_RESERVOIR)?,
            density: find(COL_DENSITY)?,
            toxin: find(COL_TOXIN)?,
        })
    }
}

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or("").trim()
}

fn parse_date(raw: &str, row: usize) -> Result<NaiveDate, LabDataError> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| LabDataError::InvalidValue {
        row,
        column: COL_DATE,
        value: raw.to_string(),
    })
}

fn parse_toxin(raw: &str, row: usize) -> Result<bool, LabDataError> {
    match raw.parse::<f64>() {
        Ok(v) if v == 1.0 => Ok(true),
        Ok(v) if v == 0.0 => Ok(false),
        _ => Err(LabDataError::InvalidValue {
            row,
            column: COL_TOXIN,
            value: raw.to_string(),
        }),
    }
}

/// Parse lab samples from CSV text, keeping rows of `reservoir_id` only.
///
/// Densities must be finite and non-negative. Rows for other reservoirs are
/// skipped without being validated.
pub fn parse_lab_samples(csv_data: &str, reservoir_id: &str) -> Result<Vec<ObservationSample>, LabDataError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let columns = Columns::from_headers(rdr.headers()?)?;

    let mut samples = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1
        let row = i + 2;

        if field(&record, columns.reservoir) != reservoir_id {
            continue;
        }

        let density_raw = field(&record, columns.density);
        let density = match density_raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                return Err(LabDataError::InvalidValue {
                    row,
                    column: COL_DENSITY,
                    value: density_raw.to_string(),
                })
            }
        };

        samples.push(ObservationSample {
            date: parse_date(field(&record, columns.date), row)?,
            reservoir_id: reservoir_id.to_string(),
            density,
            toxin_present: parse_toxin(field(&record, columns.toxin), row)?,
        });
    }

    tracing::info!(
        "Loaded {} lab samples for reservoir {}",
        samples.len(),
        reservoir_id
    );
    Ok(samples)
}

/// Read a lab sample CSV file and keep the rows of `reservoir_id`.
pub async fn load_lab_samples(
    path: &Path,
    reservoir_id: &str,
) -> Result<Vec<ObservationSample>, LabDataError> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_lab_samples(&content, reservoir_id)
}
