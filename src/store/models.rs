use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::services::prediction::LakeSite;
use crate::services::risk::{LakeType, Stratification};

/// A monitored lake registered by an owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LakeProfile {
    /// Unique lake identifier
    pub id: Uuid,
    /// Lake name, unique per owner
    pub name: String,
    /// Latitude (WGS84)
    pub latitude: f64,
    /// Longitude (WGS84)
    pub longitude: f64,
    /// Catchment land use: "forest", "agriculture" or "urban"
    pub lake_type: LakeType,
    /// Thermal stratification, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stratification: Option<Stratification>,
    pub created_at: DateTime<Utc>,
}

impl LakeProfile {
    pub fn site(&self) -> LakeSite {
        LakeSite {
            latitude: self.latitude,
            longitude: self.longitude,
            lake_type: self.lake_type,
            stratification: self.stratification,
        }
    }
}

/// Request body for registering a lake.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLake {
    /// Lake name (e.g. "Lac de Vassivière")
    pub name: String,
    /// Latitude (WGS84), -90..=90
    pub latitude: f64,
    /// Longitude (WGS84), -180..=180
    pub longitude: f64,
    /// Catchment land use: "forest", "agriculture" or "urban"
    pub lake_type: LakeType,
    /// Thermal stratification: "strong", "weak" or "none"
    #[serde(default)]
    pub stratification: Option<Stratification>,
}
