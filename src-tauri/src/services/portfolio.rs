//! Portfolio service
//!
//! Portfolio items live in the local store only. Changes are still
//! serialized per collection and announced, so open galleries refresh.

use crate::database::{NewPortfolioItem, PortfolioCategory, PortfolioItem, PortfolioUpdate};
use crate::error::Result;
use crate::services::synchronizer::Synchronizer;

/// Service for managing portfolio items
#[derive(Clone)]
pub struct PortfolioService {
    sync: Synchronizer,
}

impl PortfolioService {
    pub fn new(sync: Synchronizer) -> Self {
        Self { sync }
    }

    /// All portfolio items in display order
    pub async fn get_portfolio_items(&self) -> Result<Vec<PortfolioItem>> {
        self.sync.read().await
    }

    /// Items of one category, in display order
    pub async fn get_portfolio_by_category(
        &self,
        category: PortfolioCategory,
    ) -> Result<Vec<PortfolioItem>> {
        let items = self.get_portfolio_items().await?;
        Ok(items
            .into_iter()
            .filter(|item| item.category == category)
            .collect())
    }

    /// Add a new item. Media is validated before anything is stored.
    pub async fn save_portfolio_item(&self, req: NewPortfolioItem) -> Result<PortfolioItem> {
        let item = PortfolioItem::create(req)?;
        tracing::info!("Saving portfolio item {}: {}", item.id, item.title);

        let saved = item.clone();
        self.sync
            .mutate(move |records: &mut Vec<PortfolioItem>| {
                records.push(item);
                Some(())
            })
            .await?;

        Ok(saved)
    }

    /// Edit an item in place, keeping its position, id and creation time.
    ///
    /// Returns `Ok(None)` for an unknown id. An invalid edit is rejected and
    /// leaves the stored item unchanged.
    pub async fn update_portfolio_item(
        &self,
        id: &str,
        update: PortfolioUpdate,
    ) -> Result<Option<PortfolioItem>> {
        tracing::debug!("Updating portfolio item: {}", id);

        let mut rejected = None;
        let updated = self
            .sync
            .mutate(|records: &mut Vec<PortfolioItem>| {
                let item = records.iter_mut().find(|item| item.id == id)?;
                match item.updated(update) {
                    Ok(updated) => {
                        *item = updated.clone();
                        Some(updated)
                    }
                    Err(e) => {
                        rejected = Some(e);
                        None
                    }
                }
            })
            .await?;

        if let Some(e) = rejected {
            return Err(e);
        }
        Ok(updated)
    }

    /// Remove an item. Returns false when the id is unknown.
    pub async fn delete_portfolio_item(&self, id: &str) -> Result<bool> {
        tracing::info!("Deleting portfolio item: {}", id);

        let removed = self
            .sync
            .mutate(|records: &mut Vec<PortfolioItem>| {
                let index = records.iter().position(|item| item.id == id)?;
                records.remove(index);
                Some(())
            })
            .await?;

        Ok(removed.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{initialize_database, CollectionStore, MediaType};
    use crate::error::AppError;
    use crate::services::synchronizer::PersistOutcome;
    use crate::storage::{DownloadOnly, DownloadSink};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_service() -> (PortfolioService, TempDir) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_database(&pool).await.unwrap();

        let temp = TempDir::new().unwrap();
        let sync = Synchronizer::new(
            CollectionStore::new(pool),
            Arc::new(DownloadOnly),
            DownloadSink::new(temp.path().join("downloads")),
        );
        (PortfolioService::new(sync), temp)
    }

    fn new_item(title: &str, category: PortfolioCategory) -> NewPortfolioItem {
        NewPortfolioItem {
            title: title.to_string(),
            category,
            tags: vec!["HD".to_string()],
            caption: "Soft glam".to_string(),
            media_type: MediaType::Image,
            media_url: "data:image/png;base64,aGVsbG8=".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_and_filter_by_category() {
        let (service, temp) = create_test_service().await;
        let mut events = service.sync.subscribe();

        service
            .save_portfolio_item(new_item("Bride", PortfolioCategory::Bridal))
            .await
            .unwrap();
        service
            .save_portfolio_item(new_item("Party", PortfolioCategory::Party))
            .await
            .unwrap();

        let bridal = service
            .get_portfolio_by_category(PortfolioCategory::Bridal)
            .await
            .unwrap();
        assert_eq!(bridal.len(), 1);
        assert_eq!(bridal[0].title, "Bride");

        let event = events.recv().await.unwrap();
        assert_eq!(event.outcome, PersistOutcome::StoreOnly);
        assert!(!temp.path().join("downloads").exists());
    }

    #[tokio::test]
    async fn test_rejects_mismatched_media() {
        let (service, _temp) = create_test_service().await;
        let mut req = new_item("Clip", PortfolioCategory::Party);
        req.media_type = MediaType::Video;

        let result = service.save_portfolio_item(req).await;

        assert!(matches!(result, Err(AppError::InvalidRecord(_))));
        assert!(service.get_portfolio_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (service, _temp) = create_test_service().await;
        let item = service
            .save_portfolio_item(new_item("Bride", PortfolioCategory::Bridal))
            .await
            .unwrap();

        let updated = service
            .update_portfolio_item(
                &item.id,
                PortfolioUpdate {
                    caption: Some("Airbrush".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.caption, "Airbrush");
        assert_eq!(updated.id, item.id);

        let bad = service
            .update_portfolio_item(
                &item.id,
                PortfolioUpdate {
                    media_url: Some(String::new()),
                    ..Default::default()
                },
            )
            .await;
        assert!(bad.is_err());
        assert_eq!(service.get_portfolio_items().await.unwrap()[0].caption, "Airbrush");

        let missing = service
            .update_portfolio_item("port_missing", PortfolioUpdate::default())
            .await
            .unwrap();
        assert!(missing.is_none());

        assert!(service.delete_portfolio_item(&item.id).await.unwrap());
        assert!(service.get_portfolio_items().await.unwrap().is_empty());
    }
}
