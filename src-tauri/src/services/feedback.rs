//! Feedback service
//!
//! Customer feedback plus the admin's replies. Saving feedback also saves
//! one derived retting record.

use crate::database::{Feedback, NewFeedback, Retting};
use crate::error::Result;
use crate::services::synchronizer::Synchronizer;
use chrono::Utc;

/// Service for managing feedback
#[derive(Clone)]
pub struct FeedbackService {
    sync: Synchronizer,
}

impl FeedbackService {
    pub fn new(sync: Synchronizer) -> Self {
        Self { sync }
    }

    /// All feedback in submission order
    pub async fn get_feedbacks(&self) -> Result<Vec<Feedback>> {
        self.sync.read().await
    }

    /// Store new feedback, then its retting. The rating is checked first so
    /// an out-of-range value stores nothing.
    pub async fn save_feedback(&self, req: NewFeedback) -> Result<Feedback> {
        let feedback = Feedback::create(req)?;
        let retting = Retting::from_feedback(&feedback);
        tracing::info!(
            "Saving feedback {} ({} stars) with retting {}",
            feedback.id,
            feedback.rating,
            retting.id
        );

        let saved = feedback.clone();
        self.sync
            .mutate(move |records: &mut Vec<Feedback>| {
                records.push(feedback);
                Some(())
            })
            .await?;

        self.sync
            .mutate(move |records: &mut Vec<Retting>| {
                records.push(retting);
                Some(())
            })
            .await?;

        Ok(saved)
    }

    /// Attach the admin's reply, stamped with the current time
    pub async fn add_feedback_reply(&self, id: &str, reply: String) -> Result<bool> {
        self.set_reply(id, reply).await
    }

    /// Replace the admin's reply and its date
    pub async fn update_feedback_reply(&self, id: &str, reply: String) -> Result<bool> {
        self.set_reply(id, reply).await
    }

    /// Clear the reply and its date
    pub async fn delete_feedback_reply(&self, id: &str) -> Result<bool> {
        self.modify(id, |feedback| {
            feedback.admin_reply = None;
            feedback.admin_reply_date = None;
        })
        .await
    }

    /// Remove feedback. Its retting stays, matching the public ratings page.
    pub async fn delete_feedback(&self, id: &str) -> Result<bool> {
        tracing::info!("Deleting feedback: {}", id);

        let removed = self
            .sync
            .mutate(|records: &mut Vec<Feedback>| {
                let index = records.iter().position(|f| f.id == id)?;
                records.remove(index);
                Some(())
            })
            .await?;

        Ok(removed.is_some())
    }

    /// Replace all feedback with an uploaded file's contents
    pub async fn import_feedbacks(&self, json: &str) -> Result<usize> {
        self.sync.import_collection::<Feedback>(json).await
    }

    /// Mean star rating, `None` when there is no feedback yet
    pub async fn average_rating(&self) -> Result<Option<f64>> {
        let feedbacks = self.get_feedbacks().await?;
        if feedbacks.is_empty() {
            return Ok(None);
        }

        let total: u32 = feedbacks.iter().map(|f| u32::from(f.rating.value())).sum();
        Ok(Some(f64::from(total) / feedbacks.len() as f64))
    }

    async fn set_reply(&self, id: &str, reply: String) -> Result<bool> {
        self.modify(id, |feedback| {
            feedback.admin_reply = Some(reply);
            feedback.admin_reply_date = Some(Utc::now());
        })
        .await
    }

    async fn modify<F>(&self, id: &str, change: F) -> Result<bool>
    where
        F: FnOnce(&mut Feedback),
    {
        let found = self
            .sync
            .mutate(|records: &mut Vec<Feedback>| {
                let feedback = records.iter_mut().find(|f| f.id == id)?;
                change(feedback);
                Some(())
            })
            .await?;

        if found.is_none() {
            tracing::warn!("Feedback not found: {}", id);
        }
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{initialize_database, CollectionStore, RettingSource};
    use crate::error::AppError;
    use crate::storage::{DownloadOnly, DownloadSink};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_service() -> (FeedbackService, TempDir) {
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
            DownloadSink::new(temp.path().to_path_buf()),
        );
        (FeedbackService::new(sync), temp)
    }

    fn new_feedback(name: &str, rating: u8) -> NewFeedback {
        NewFeedback {
            name: name.to_string(),
            rating,
            service_type: "Party".to_string(),
            message: "Lovely work".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_feedback_derives_one_retting() {
        let (service, _temp) = create_test_service().await;

        let saved = service.save_feedback(new_feedback("Riya", 5)).await.unwrap();

        let rettings: Vec<Retting> = service.sync.read().await.unwrap();
        assert_eq!(rettings.len(), 1);
        assert_eq!(rettings[0].created_at, saved.created_at);
        let RettingSource::Feedback(copy) = &rettings[0].source;
        assert_eq!(copy.name, "Riya");
        assert_eq!(copy.rating, saved.rating);
    }

    #[tokio::test]
    async fn test_invalid_rating_stores_nothing() {
        let (service, _temp) = create_test_service().await;

        let result = service.save_feedback(new_feedback("Riya", 0)).await;

        assert!(matches!(result, Err(AppError::InvalidRecord(_))));
        assert!(service.get_feedbacks().await.unwrap().is_empty());
        let rettings: Vec<Retting> = service.sync.read().await.unwrap();
        assert!(rettings.is_empty());
    }

    #[tokio::test]
    async fn test_reply_lifecycle() {
        let (service, _temp) = create_test_service().await;
        let saved = service.save_feedback(new_feedback("Riya", 4)).await.unwrap();

        assert!(service
            .add_feedback_reply(&saved.id, "Thank you!".to_string())
            .await
            .unwrap());
        assert!(service
            .update_feedback_reply(&saved.id, "Thanks so much!".to_string())
            .await
            .unwrap());
        let feedback = &service.get_feedbacks().await.unwrap()[0];
        assert_eq!(feedback.admin_reply.as_deref(), Some("Thanks so much!"));

        assert!(service.delete_feedback_reply(&saved.id).await.unwrap());
        assert!(!service.delete_feedback_reply("fb_missing").await.unwrap());
        let feedback = &service.get_feedbacks().await.unwrap()[0];
        assert!(feedback.admin_reply.is_none());
    }

    #[tokio::test]
    async fn test_average_rating() {
        let (service, _temp) = create_test_service().await;
        assert_eq!(service.average_rating().await.unwrap(), None);

        service.save_feedback(new_feedback("A", 5)).await.unwrap();
        service.save_feedback(new_feedback("B", 4)).await.unwrap();

        assert_eq!(service.average_rating().await.unwrap(), Some(4.5));
    }

    #[tokio::test]
    async fn test_delete_feedback_keeps_retting() {
        let (service, _temp) = create_test_service().await;
        let saved = service.save_feedback(new_feedback("A", 3)).await.unwrap();

        assert!(service.delete_feedback(&saved.id).await.unwrap());
        assert!(!service.delete_feedback(&saved.id).await.unwrap());

        assert!(service.get_feedbacks().await.unwrap().is_empty());
        let rettings: Vec<Retting> = service.sync.read().await.unwrap();
        assert_eq!(rettings.len(), 1);
    }
}
