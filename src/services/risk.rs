//! Bloom risk evaluation.
//!
//! Converts averaged weather and soil conditions into a three-level risk
//! flag. Thresholds depend on the lake's catchment type and, when the
//! stratified rule set is selected, on its thermal stratification.
//!
//! All rule-set variants go through the single `evaluate` function; the
//! differences are expressed by `RiskConfig`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

use crate::services::conditions::ConditionSummary;
use crate::services::variation::STABLE_CONDITIONS;

/// Configuration errors raised by the evaluator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RiskError {
    #[error("unknown lake type '{0}' (expected forest, agriculture or urban)")]
    UnknownLakeType(String),
    #[error("unknown stratification '{0}' (expected strong, weak or none)")]
    UnknownStratification(String),
    #[error("unknown risk flag '{0}'")]
    UnknownFlag(String),
    #[error("unknown risk model '{0}' (expected baseline, stratified or instability)")]
    UnknownModel(String),
    #[error("the stratified rule set requires a stratification")]
    MissingStratification,
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Three-level bloom risk flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskFlag {
    Low,
    Moderate,
    High,
}

impl RiskFlag {
    pub const ALL: [RiskFlag; 3] = [RiskFlag::Low, RiskFlag::Moderate, RiskFlag::High];

    /// Fixed explanatory message for the flag.
    pub fn message(self) -> &'static str {
        match self {
            RiskFlag::Low => "Low risk",
            RiskFlag::Moderate => "Favourable conditions - monitoring recommended",
            RiskFlag::High => "Highly favourable conditions - bloom likely",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            RiskFlag::Low => 0,
            RiskFlag::Moderate => 1,
            RiskFlag::High => 2,
        }
    }
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskFlag::Low => write!(f, "low"),
            RiskFlag::Moderate => write!(f, "moderate"),
            RiskFlag::High => write!(f, "high"),
        }
    }
}

impl FromStr for RiskFlag {
    type Err = RiskError;

    /// Accepts the domain names and the legacy traffic-light literals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "vert" | "green" => Ok(RiskFlag::Low),
            "moderate" | "orange" => Ok(RiskFlag::Moderate),
            "high" | "rouge" | "red" => Ok(RiskFlag::High),
            _ => Err(RiskError::UnknownFlag(s.to_string())),
        }
    }
}

/// Land use of the lake's catchment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LakeType {
    Forest,
    Agriculture,
    Urban,
}

impl FromStr for LakeType {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forest" => Ok(LakeType::Forest),
            "agriculture" => Ok(LakeType::Agriculture),
            "urban" => Ok(LakeType::Urban),
            _ => Err(RiskError::UnknownLakeType(s.to_string())),
        }
    }
}

/// Thermal stratification of the water column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stratification {
    Strong,
    Weak,
    None,
}

impl FromStr for Stratification {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strong" => Ok(Stratification::Strong),
            "weak" => Ok(Stratification::Weak),
            "none" => Ok(Stratification::None),
            _ => Err(RiskError::UnknownStratification(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Threshold tables
// ---------------------------------------------------------------------------

/// A base/high threshold pair.
///
/// For wind the risk rises as the value falls, so `high < base`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub base: f64,
    pub high: f64,
}

const fn band(base: f64, high: f64) -> Band {
    Band { base, high }
}

/// Humidity band used when stratification is not taken into account.
const FIXED_HUMIDITY: Band = band(65.0, 75.0);

/// Wind band used when stratification is not taken into account.
const FIXED_WIND: Band = band(10.0, 7.0);

/// Soil temperature band, common to all lake types.
const SOIL_TEMPERATURE: Band = band(24.0, 26.0);

impl LakeType {
    pub fn temperature_band(self) -> Band {
        match self {
            LakeType::Forest => band(23.0, 25.0),
            LakeType::Agriculture => band(24.0, 26.0),
            LakeType::Urban => band(25.0, 27.0),
        }
    }
}

impl Stratification {
    pub fn humidity_band(self) -> Band {
        match self {
            Stratification::Strong => band(70.0, 80.0),
            Stratification::Weak => band(65.0, 75.0),
            Stratification::None => band(60.0, 70.0),
        }
    }

    pub fn wind_band(self) -> Band {
        match self {
            Stratification::Strong => band(8.0, 5.0),
            Stratification::Weak => band(10.0, 7.0),
            Stratification::None => band(12.0, 9.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Selects the rule-set variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskConfig {
    /// Use stratification-dependent humidity and wind bands.
    pub stratified: bool,
    /// Fold the weather instability score into the risk score.
    pub instability_aware: bool,
}

impl RiskConfig {
    /// Fixed humidity/wind bands, no instability term.
    pub const BASELINE: RiskConfig = RiskConfig {
        stratified: false,
        instability_aware: false,
    };

    /// Stratification-dependent humidity/wind bands.
    pub const STRATIFIED: RiskConfig = RiskConfig {
        stratified: true,
        instability_aware: false,
    };

    /// Fixed bands plus the weather instability term.
    pub const INSTABILITY: RiskConfig = RiskConfig {
        stratified: false,
        instability_aware: true,
    };

    /// Score cut-offs `(low, moderate)` for the flag mapping.
    fn cutoffs(&self) -> (f64, f64) {
        if self.instability_aware {
            (1.5, 2.5)
        } else {
            (1.0, 2.0)
        }
    }

    fn humidity_wind_bands(
        &self,
        stratification: Option<Stratification>,
    ) -> Result<(Band, Band), RiskError> {
        if !self.stratified {
            return Ok((FIXED_HUMIDITY, FIXED_WIND));
        }
        let s = stratification.ok_or(RiskError::MissingStratification)?;
        Ok((s.humidity_band(), s.wind_band()))
    }
}

impl FromStr for RiskConfig {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(RiskConfig::BASELINE),
            "stratified" => Ok(RiskConfig::STRATIFIED),
            "instability" => Ok(RiskConfig::INSTABILITY),
            _ => Err(RiskError::UnknownModel(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Running totals threaded through the rule fold.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Score {
    risk_score: f64,
    high_risk: u32,
}

impl Score {
    fn add(self, hit: bool, high: bool) -> Self {
        if !hit {
            return self;
        }
        Score {
            risk_score: self.risk_score + 1.0,
            high_risk: self.high_risk + u32::from(high),
        }
    }
}

/// One scoring rule: whether the base threshold is met, and the high one.
type Rule = (bool, bool);

/// Value at or above the band (temperature: inclusive).
fn at_least(v: f64, b: Band) -> Rule {
    (v >= b.base, v >= b.high)
}

/// Value strictly above the band (humidity, soil).
fn above(v: f64, b: Band) -> Rule {
    (v > b.base, v > b.high)
}

/// Value strictly below the band (wind).
fn below(v: f64, b: Band) -> Rule {
    (v < b.base, v < b.high)
}

/// Subset of the conditions echoed back with an assessment.
///
/// Soil readings take part in scoring but are not echoed.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EchoedConditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_description: Option<String>,
    pub wind: f64,
    pub temp: f64,
    pub humidity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precip: Option<f64>,
}

impl From<&ConditionSummary> for EchoedConditions {
    fn from(c: &ConditionSummary) -> Self {
        Self {
            weather_description: c.weather_description.clone(),
            wind: c.wind,
            temp: c.temp,
            humidity: c.humidity,
            precip: c.precip,
        }
    }
}

/// Outcome of a risk evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RiskAssessment {
    pub flag: RiskFlag,
    pub message: String,
    /// Accumulated score (fractional when the instability term applies)
    pub risk_score: f64,
    /// Number of rules that also crossed their high threshold
    pub high_risk: u32,
    pub conditions: EchoedConditions,
}

/// Evaluate bloom risk for averaged conditions.
///
/// Temperature triggers at or above its thresholds; humidity and soil
/// temperature strictly above; wind strictly below. Soil temperature only
/// contributes when present. With `instability_aware`, half the weather
/// score is added and a score of 2 or more counts as a high-risk signal.
pub fn evaluate(
    conditions: &ConditionSummary,
    lake_type: LakeType,
    stratification: Option<Stratification>,
    config: &RiskConfig,
) -> Result<RiskAssessment, RiskError> {
    let (humidity_band, wind_band) = config.humidity_wind_bands(stratification)?;

    let mut rules: Vec<Rule> = vec![
        at_least(conditions.temp, lake_type.temperature_band()),
        above(conditions.humidity, humidity_band),
        below(conditions.wind, wind_band),
    ];
    if let Some(soil_temp) = conditions.soil_temp {
        rules.push(above(soil_temp, SOIL_TEMPERATURE));
    }

    let mut score = rules
        .into_iter()
        .fold(Score::default(), |acc, (hit, high)| acc.add(hit, high));

    let mut suffix = String::new();
    if config.instability_aware {
        if let Some(weather_score) = conditions.weather_score {
            score.risk_score += f64::from(weather_score) * 0.5;
            if weather_score >= 2 {
                score.high_risk += 1;
            }
        }
        if let Some(desc) = conditions
            .weather_description
            .as_deref()
            .filter(|d| *d != STABLE_CONDITIONS)
        {
            suffix = format!(" - weather instability: {}", desc);
        }
    }

    let (low_cutoff, moderate_cutoff) = config.cutoffs();
    let flag = if score.risk_score <= low_cutoff {
        RiskFlag::Low
    } else if score.risk_score <= moderate_cutoff || score.high_risk == 0 {
        RiskFlag::Moderate
    } else {
        RiskFlag::High
    };

    tracing::debug!(
        "evaluated {:?} lake: score={} high={} flag={}",
        lake_type,
        score.risk_score,
        score.high_risk,
        flag
    );

    Ok(RiskAssessment {
        flag,
        message: format!("{}{}", flag.message(), suffix),
        risk_score: score.risk_score,
        high_risk: score.high_risk,
        conditions: EchoedConditions::from(conditions),
    })
}
