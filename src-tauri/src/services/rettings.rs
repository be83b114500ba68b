//! Rettings service

use crate::database::{Retting, RettingSource};
use crate::error::Result;
use crate::services::synchronizer::Synchronizer;

/// Service for managing rettings
#[derive(Clone)]
pub struct RettingService {
    sync: Synchronizer,
}

impl RettingService {
    pub fn new(sync: Synchronizer) -> Self {
        Self { sync }
    }

    /// All rettings, oldest first
    pub async fn get_rettings(&self) -> Result<Vec<Retting>> {
        self.sync.read().await
    }

    /// Store a retting from any producer
    pub async fn save_retting(&self, source: RettingSource) -> Result<Retting> {
        let retting = Retting::create(source);
        tracing::debug!("Saving retting {}", retting.id);

        let saved = retting.clone();
        self.sync
            .mutate(move |records: &mut Vec<Retting>| {
                records.push(retting);
                Some(())
            })
            .await?;

        Ok(saved)
    }

    /// Remove a retting. Returns false when the id is unknown.
    pub async fn delete_retting(&self, id: &str) -> Result<bool> {
        tracing::info!("Deleting retting: {}", id);

        let removed = self
            .sync
            .mutate(|records: &mut Vec<Retting>| {
                let index = records.iter().position(|r| r.id == id)?;
                records.remove(index);
                Some(())
            })
            .await?;

        Ok(removed.is_some())
    }

    /// Replace all rettings with an uploaded file's contents
    pub async fn import_rettings(&self, json: &str) -> Result<usize> {
        self.sync.import_collection::<Retting>(json).await
    }
}
