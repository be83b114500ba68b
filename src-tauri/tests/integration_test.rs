//! Integration tests for the Aura data layer
//!
//! These tests verify end-to-end functionality including:
//! - Snapshot seeding and forward merging on a file-backed store
//! - Write-through to external files and the download fallback
//! - Service invariants across restarts

use auradata::database::{
    Collection, CollectionStore, Enquiry, EnquiryStatus, Feedback, NewEnquiry, NewFeedback,
    Retting,
};
use auradata::error::AppError;
use auradata::services::{EnquiryService, FeedbackService, PersistOutcome, Synchronizer};
use auradata::storage::targets::PickFuture;
use auradata::storage::{DownloadOnly, DownloadSink, LoadMode, SnapshotLoader, TargetPicker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Picker that always answers with the same file
struct FixedPicker(PathBuf);

impl TargetPicker for FixedPicker {
    fn pick<'a>(&'a self, _collection: Collection, _suggested_name: &'a str) -> PickFuture<'a> {
        let path = self.0.clone();
        Box::pin(async move { Ok(Some(path)) })
    }
}

/// Helper to open a file-backed store inside `dir`
async fn open_store(dir: &Path) -> CollectionStore {
    CollectionStore::open(&dir.join("aura.sqlite")).await.unwrap()
}

fn synchronizer(store: CollectionStore, picker: Arc<dyn TargetPicker>, dir: &Path) -> Synchronizer {
    Synchronizer::new(store, picker, DownloadSink::new(dir.join("downloads")))
}

fn new_enquiry(name: &str) -> NewEnquiry {
    NewEnquiry {
        name: name.to_string(),
        phone: "9000000000".to_string(),
        email: "client@example.com".to_string(),
        occasion_type: "Engagement".to_string(),
        event_date: "2025-12-12".to_string(),
        location: "Jaipur".to_string(),
        budget_range: None,
        message: Some("Evening event".to_string()),
    }
}

fn enquiry_json(id: &str, name: &str) -> String {
    format!(
        r#"{{"id":"{}","name":"{}","phone":"555","email":"a@example.com",
        "occasionType":"Party","eventDate":"2025-08-01","location":"Goa",
        "status":"PENDING","createdAt":"2025-06-01T09:00:00.000Z"}}"#,
        id, name
    )
}

fn downloads_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir.join("downloads")) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_snapshot_seed_then_merge_across_restarts() {
    let temp = TempDir::new().unwrap();
    let snapshots = temp.path().join("data");
    std::fs::create_dir_all(&snapshots).unwrap();
    std::fs::write(
        snapshots.join("Enquiry.json"),
        format!("[{}]", enquiry_json("e1", "Meera")),
    )
    .unwrap();

    // First run seeds the store
    {
        let store = open_store(temp.path()).await;
        let report = SnapshotLoader::new(store.clone(), snapshots.clone())
            .load()
            .await
            .unwrap();
        assert_eq!(report.mode, LoadMode::FirstRun);

        let enquiries: Vec<Enquiry> = store.read_collection().await.unwrap();
        assert_eq!(enquiries.len(), 1);
        assert_eq!(enquiries[0].id, "e1");
    }

    // The snapshot changes; the store keeps its own values and gains e2
    std::fs::write(
        snapshots.join("Enquiry.json"),
        format!("[{}, {}]", enquiry_json("e1", "stale"), enquiry_json("e2", "Asha")),
    )
    .unwrap();

    let store = open_store(temp.path()).await;
    let loader = SnapshotLoader::new(store.clone(), snapshots);
    let report = loader.load().await.unwrap();
    assert_eq!(report.mode, LoadMode::Merge);
    assert_eq!(report.added(Collection::Enquiries), 1);

    let enquiries: Vec<Enquiry> = store.read_collection().await.unwrap();
    let names: Vec<(&str, &str)> = enquiries
        .iter()
        .map(|e| (e.id.as_str(), e.name.as_str()))
        .collect();
    assert_eq!(names, vec![("e1", "Meera"), ("e2", "Asha")]);

    // Loading again changes nothing
    let again = loader.load().await.unwrap();
    assert_eq!(again.added(Collection::Enquiries), 0);
    let unchanged: Vec<Enquiry> = store.read_collection().await.unwrap();
    assert_eq!(unchanged, enquiries);
}

#[tokio::test]
async fn test_save_without_target_downloads_pending_enquiry() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path()).await;
    let sync = synchronizer(store, Arc::new(DownloadOnly), temp.path());
    let service = EnquiryService::new(sync.clone());
    let mut events = sync.subscribe();

    let saved = service.save_enquiry(new_enquiry("Nisha")).await.unwrap();

    let stored = service.get_enquiries().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, saved.id);
    assert_eq!(stored[0].status, EnquiryStatus::Pending);

    let event = events.recv().await.unwrap();
    let PersistOutcome::Downloaded(path) = event.outcome else {
        panic!("expected a download");
    };
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("Enquiry_"));
    assert!(name.ends_with(".json"));

    let downloaded: Vec<Enquiry> = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(downloaded, stored);
}

#[tokio::test]
async fn test_status_update_on_unknown_id_is_noop() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path()).await;
    let service = EnquiryService::new(synchronizer(store, Arc::new(DownloadOnly), temp.path()));
    service.save_enquiry(new_enquiry("Nisha")).await.unwrap();
    let before = service.get_enquiries().await.unwrap();
    let downloads_before = downloads_in(temp.path()).len();

    let changed = service
        .update_enquiry_status("enq_does_not_exist", EnquiryStatus::Contacted)
        .await
        .unwrap();

    assert!(!changed);
    assert_eq!(service.get_enquiries().await.unwrap(), before);
    assert_eq!(downloads_in(temp.path()).len(), downloads_before);
}

#[tokio::test]
async fn test_failed_target_write_falls_back_to_download() {
    let temp = TempDir::new().unwrap();
    let target_dir = temp.path().join("shared");
    std::fs::create_dir_all(&target_dir).unwrap();
    let target = target_dir.join("Enquiry.json");

    let store = open_store(temp.path()).await;
    let sync = synchronizer(store, Arc::new(FixedPicker(target.clone())), temp.path());
    let service = EnquiryService::new(sync.clone());

    sync.register_external_target(Collection::Enquiries).await.unwrap();
    let first = service.save_enquiry(new_enquiry("A")).await.unwrap();
    let written: Vec<Enquiry> = serde_json::from_slice(&std::fs::read(&target).unwrap()).unwrap();
    assert_eq!(written.len(), 1);
    assert!(downloads_in(temp.path()).is_empty());

    // The target goes away; the next write fails and is downloaded instead
    std::fs::remove_dir_all(&target_dir).unwrap();
    service
        .update_enquiry_status(&first.id, EnquiryStatus::Contacted)
        .await
        .unwrap();

    assert!(!sync.is_target_registered(Collection::Enquiries).await);
    assert_eq!(downloads_in(temp.path()).len(), 1);

    // Without a handle every further mutation downloads
    service.save_enquiry(new_enquiry("B")).await.unwrap();
    assert_eq!(downloads_in(temp.path()).len(), 2);
    assert_eq!(service.get_enquiries().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_saves_are_not_lost() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path()).await;
    let service = EnquiryService::new(synchronizer(store, Arc::new(DownloadOnly), temp.path()));

    let mut handles = Vec::new();
    for i in 0..10 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.save_enquiry(new_enquiry(&format!("Guest {}", i))).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = service.get_enquiries().await.unwrap();
    assert_eq!(stored.len(), 10);
}

#[tokio::test]
async fn test_mutations_replay_in_issue_order() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path()).await;
    let service = EnquiryService::new(synchronizer(store, Arc::new(DownloadOnly), temp.path()));

    let a = service.save_enquiry(new_enquiry("A")).await.unwrap();
    let b = service.save_enquiry(new_enquiry("B")).await.unwrap();
    service
        .update_enquiry_status(&a.id, EnquiryStatus::Contacted)
        .await
        .unwrap();
    service
        .add_enquiry_reply(&b.id, "First".to_string())
        .await
        .unwrap();
    service
        .update_enquiry_reply(&b.id, "Second".to_string())
        .await
        .unwrap();
    service.delete_enquiry(&a.id).await.unwrap();

    let stored = service.get_enquiries().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, b.id);
    assert_eq!(stored[0].status, EnquiryStatus::Pending);
    assert_eq!(stored[0].admin_reply.as_deref(), Some("Second"));
}

#[tokio::test]
async fn test_feedback_invariants_survive_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let store = open_store(temp.path()).await;
        let service = FeedbackService::new(synchronizer(store, Arc::new(DownloadOnly), temp.path()));

        for rating in [5, 4, 3] {
            service
                .save_feedback(NewFeedback {
                    name: format!("Client {}", rating),
                    rating,
                    service_type: "Bridal".to_string(),
                    message: "Thank you".to_string(),
                })
                .await
                .unwrap();
        }
        let rejected = service
            .save_feedback(NewFeedback {
                name: "Too generous".to_string(),
                rating: 6,
                service_type: "Bridal".to_string(),
                message: "!".to_string(),
            })
            .await;
        assert!(matches!(rejected, Err(AppError::InvalidRecord(_))));
    }

    let store = open_store(temp.path()).await;
    let feedbacks: Vec<Feedback> = store.read_collection().await.unwrap();
    let rettings: Vec<Retting> = store.read_collection().await.unwrap();

    assert_eq!(feedbacks.len(), 3);
    assert_eq!(rettings.len(), feedbacks.len());
    assert!(feedbacks
        .iter()
        .all(|f| (1..=5).contains(&f.rating.value())));
    for (feedback, retting) in feedbacks.iter().zip(&rettings) {
        assert_eq!(retting.rating(), feedback.rating);
        assert_eq!(retting.created_at, feedback.created_at);
    }
}

#[tokio::test]
async fn test_duplicate_ids_are_collapsed_on_persist() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path()).await;
    let sync = synchronizer(store, Arc::new(DownloadOnly), temp.path());

    let first: Enquiry = serde_json::from_str(&enquiry_json("dup", "First")).unwrap();
    let other: Enquiry = serde_json::from_str(&enquiry_json("other", "Other")).unwrap();
    let last: Enquiry = serde_json::from_str(&enquiry_json("dup", "Last")).unwrap();

    sync.persist(&[first, other, last]).await.unwrap();

    let stored: Vec<Enquiry> = sync.read().await.unwrap();
    let names: Vec<(&str, &str)> = stored
        .iter()
        .map(|e| (e.id.as_str(), e.name.as_str()))
        .collect();
    assert_eq!(names, vec![("dup", "Last"), ("other", "Other")]);
}
