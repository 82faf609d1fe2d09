//! Lake registry.
//!
//! Keeps each owner's lakes in memory and persists the whole map as a JSON
//! snapshot after every change:
//!
//! ```json
//! { "alice": [ { "id": "...", "name": "Buckhorn", "latitude": 37.34, ... } ] }
//! ```

pub mod models;

use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use models::{LakeProfile, NewLake};

/// Lake store shared between request handlers.
pub type SharedLakeStore = Arc<RwLock<LakeStore>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lake '{name}' already exists for owner '{owner}'")]
    DuplicateLake { owner: String, name: String },
    #[error("IO error on lake file: {0}")]
    Io(#[from] std::io::Error),
    #[error("lake file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct LakeStore {
    path: PathBuf,
    lakes: BTreeMap<String, Vec<LakeProfile>>,
}

impl LakeStore {
    /// Load the snapshot at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let lakes = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Lake file {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            lakes,
        })
    }

    pub fn shared(self) -> SharedLakeStore {
        Arc::new(RwLock::new(self))
    }

    /// Register a lake for `owner` and persist the snapshot.
    ///
    /// If the snapshot cannot be written the lake is not kept in memory either.
    pub async fn add_lake(&mut self, owner: &str, lake: NewLake) -> Result<LakeProfile, StoreError> {
        let owned = self.lakes.entry(owner.to_string()).or_default();
        if owned.iter().any(|l| l.name == lake.name) {
            return Err(StoreError::DuplicateLake {
                owner: owner.to_string(),
                name: lake.name,
            });
        }

        let profile = LakeProfile {
            id: Uuid::new_v4(),
            name: lake.name,
            latitude: lake.latitude,
            longitude: lake.longitude,
            lake_type: lake.lake_type,
            stratification: lake.stratification,
            created_at: Utc::now(),
        };
        owned.push(profile.clone());

        if let Err(e) = self.save().await {
            if let Some(owned) = self.lakes.get_mut(owner) {
                owned.retain(|l| l.id != profile.id);
            }
            return Err(e);
        }

        tracing::info!("Registered lake '{}' for owner '{}'", profile.name, owner);
        Ok(profile)
    }

    /// Lakes of `owner`, in registration order.
    pub fn lakes_for(&self, owner: &str) -> &[LakeProfile] {
        self.lakes.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, owner: &str, name: &str) -> Option<&LakeProfile> {
        self.lakes_for(owner).iter().find(|l| l.name == name)
    }

    /// Total number of registered lakes across owners.
    pub fn len(&self) -> usize {
        self.lakes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lakes.values().all(Vec::is_empty)
    }

    async fn save(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_string_pretty(&self.lakes)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
