//! Write-through synchronizer
//!
//! Every mutation is applied under the collection lock, written to the
//! local store, then pushed to the collection's external file. Without a
//! registered file, or when writing it fails, the JSON is downloaded
//! instead. Each successful persist is announced on a broadcast channel.

use crate::config;
use crate::database::store::collapse_duplicates;
use crate::database::{Collection, CollectionStore, Enquiry, Feedback, PortfolioItem, Record, Retting};
use crate::error::{AppError, Result};
use crate::storage::downloads::{bundle_stem, collection_stem};
use crate::storage::snapshot::decode_records;
use crate::storage::{DownloadSink, TargetHandle, TargetPicker, TargetStatus};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Where a persisted collection ended up besides the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "camelCase")]
pub enum PersistOutcome {
    WrittenToTarget(PathBuf),
    Downloaded(PathBuf),
    /// Neither the target nor the download could be written
    DownloadFailed,
    /// Collection has no file side (portfolio, imports)
    StoreOnly,
}

/// Published after every successful persist
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionChanged {
    pub collection: Collection,
    pub count: usize,
    pub outcome: PersistOutcome,
}

struct Inner {
    store: CollectionStore,
    picker: Arc<dyn TargetPicker>,
    downloads: DownloadSink,
    targets: Mutex<HashMap<Collection, TargetHandle>>,
    events: broadcast::Sender<CollectionChanged>,
}

/// Shared handle; clones operate on the same targets and locks
#[derive(Clone)]
pub struct Synchronizer {
    inner: Arc<Inner>,
}

impl Synchronizer {
    pub fn new(store: CollectionStore, picker: Arc<dyn TargetPicker>, downloads: DownloadSink) -> Self {
        let (events, _) = broadcast::channel(config::CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store,
                picker,
                downloads,
                targets: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    /// Underlying local store
    pub fn store(&self) -> &CollectionStore {
        &self.inner.store
    }

    /// Where fallback and explicit downloads land
    pub fn downloads(&self) -> &DownloadSink {
        &self.inner.downloads
    }

    /// Change notifications for views that display collections
    pub fn subscribe(&self) -> broadcast::Receiver<CollectionChanged> {
        self.inner.events.subscribe()
    }

    // ===== External targets =====

    /// Let the operator choose the file a collection is written to.
    ///
    /// A handle registered earlier in the session is returned as is.
    pub async fn register_external_target(&self, collection: Collection) -> Result<TargetHandle> {
        if !collection.supports_external_target() {
            return Err(AppError::CapabilityUnavailable(format!(
                "{} is kept in the local store only",
                collection.label()
            )));
        }

        if let Some(handle) = self.inner.targets.lock().await.get(&collection) {
            return Ok(handle.clone());
        }

        let expected = collection.file_name();
        let path = self
            .inner
            .picker
            .pick(collection, &expected)
            .await?
            .ok_or(AppError::TargetSelectionCancelled)?;

        let handle = TargetHandle::new(collection, path);
        if handle.file_name() != expected {
            tracing::warn!(
                "Selected file {:?} does not match expected {}; using it anyway",
                handle.path,
                expected
            );
        }

        self.inner
            .targets
            .lock()
            .await
            .insert(collection, handle.clone());

        tracing::info!("External target for {} set to {:?}", collection, handle.path);
        Ok(handle)
    }

    /// Whether changes to `collection` currently go to an external file
    pub async fn is_target_registered(&self, collection: Collection) -> bool {
        self.inner.targets.lock().await.contains_key(&collection)
    }

    /// Forget a collection's target; later changes are downloaded
    pub async fn clear_target(&self, collection: Collection) -> bool {
        self.inner.targets.lock().await.remove(&collection).is_some()
    }

    /// Enabled/disabled indicator for every collection
    pub async fn target_statuses(&self) -> Vec<TargetStatus> {
        let targets = self.inner.targets.lock().await;
        Collection::ALL
            .iter()
            .map(|collection| {
                let handle = targets.get(collection);
                TargetStatus {
                    collection: *collection,
                    supported: collection.supports_external_target(),
                    enabled: handle.is_some(),
                    path: handle.map(|h| h.path.display().to_string()),
                }
            })
            .collect()
    }

    // ===== Reads and mutations =====

    /// Current contents of one collection
    pub async fn read<R: Record>(&self) -> Result<Vec<R>> {
        self.inner.store.read_collection().await
    }

    /// Write a whole collection to every durable target
    pub async fn persist<R: Record>(&self, records: &[R]) -> Result<PersistOutcome> {
        let _guard = self.inner.store.lock(R::COLLECTION).await;
        self.persist_locked(records).await
    }

    /// Read, change and persist one collection as a single step.
    ///
    /// `apply` returns `None` when it changed nothing (for example an
    /// unknown id); the collection is then left alone and nothing is
    /// published.
    pub async fn mutate<R, T, F>(&self, apply: F) -> Result<Option<T>>
    where
        R: Record,
        F: FnOnce(&mut Vec<R>) -> Option<T>,
    {
        let collection = R::COLLECTION;
        let _guard = self.inner.store.lock(collection).await;

        let mut records: Vec<R> = self.inner.store.read_collection().await?;
        let Some(value) = apply(&mut records) else {
            tracing::debug!("No change to {}", collection);
            return Ok(None);
        };

        self.persist_locked(&records).await?;
        Ok(Some(value))
    }

    /// Replace a collection from uploaded JSON. A document that is not an
    /// array empties the collection.
    pub async fn import_collection<R: Record>(&self, json: &str) -> Result<usize> {
        let collection = R::COLLECTION;
        let document: Value = serde_json::from_str(json)?;
        let records: Vec<R> = match document {
            Value::Array(items) => decode_records(items, collection.label()),
            _ => {
                tracing::warn!("Imported {} data is not a list; clearing collection", collection);
                Vec::new()
            }
        };

        let _guard = self.inner.store.lock(collection).await;
        let count = self.inner.store.overwrite_collection(&records).await?;
        self.publish(collection, count, PersistOutcome::StoreOnly);

        tracing::info!("Imported {} records into {}", count, collection);
        Ok(count)
    }

    // ===== Downloads =====

    /// Download one collection's current JSON
    pub async fn download_collection(&self, collection: Collection) -> Result<PathBuf> {
        let contents = self.collection_json(collection).await?;
        self.inner
            .downloads
            .deliver(&collection_stem(collection), &contents)
            .await
    }

    /// Download enquiries, feedback and rettings as one dated bundle
    pub async fn download_all(&self) -> Result<PathBuf> {
        let bundle = serde_json::json!({
            "Enquiry": self.read::<Enquiry>().await?,
            "Feedback": self.read::<Feedback>().await?,
            "Rettings": self.read::<Retting>().await?,
            "exportedAt": Utc::now(),
        });
        let contents = serde_json::to_vec_pretty(&bundle)?;
        self.inner.downloads.deliver(&bundle_stem(), &contents).await
    }

    /// Push every file-backed collection to its target (or a download)
    pub async fn sync_all_to_targets(&self) -> Result<Vec<(Collection, PersistOutcome)>> {
        let mut outcomes = Vec::new();
        for collection in Collection::ALL {
            if !collection.supports_external_target() {
                continue;
            }
            let _guard = self.inner.store.lock(collection).await;
            let contents = self.collection_json(collection).await?;
            let outcome = self.write_out(collection, contents).await;
            outcomes.push((collection, outcome));
        }
        Ok(outcomes)
    }

    // ===== Internals =====

    /// Caller holds the collection lock
    async fn persist_locked<R: Record>(&self, records: &[R]) -> Result<PersistOutcome> {
        let collection = R::COLLECTION;
        let records = collapse_duplicates(records);
        let count = self.inner.store.replace_collection(&records).await?;

        let outcome = if collection.supports_external_target() {
            let contents = serde_json::to_vec_pretty(&records)?;
            self.write_out(collection, contents).await
        } else {
            PersistOutcome::StoreOnly
        };

        self.publish(collection, count, outcome.clone());
        Ok(outcome)
    }

    /// Registered target first, download as fallback. Never fails.
    async fn write_out(&self, collection: Collection, contents: Vec<u8>) -> PersistOutcome {
        let handle = self.inner.targets.lock().await.get(&collection).cloned();

        match handle {
            Some(handle) => match handle.write(&contents).await {
                Ok(()) => return PersistOutcome::WrittenToTarget(handle.path),
                Err(e) => {
                    tracing::error!("{}; dropping target and downloading instead", e);
                    self.invalidate(&handle).await;
                }
            },
            None => {
                tracing::warn!(
                    "No file registered for {}; enable file writing in the admin dashboard. Downloading instead",
                    collection
                );
            }
        }

        match self
            .inner
            .downloads
            .deliver(&collection_stem(collection), &contents)
            .await
        {
            Ok(path) => PersistOutcome::Downloaded(path),
            Err(e) => {
                tracing::error!("Error downloading {}: {}", collection.file_name(), e);
                PersistOutcome::DownloadFailed
            }
        }
    }

    /// Drop a broken handle unless the operator re-registered meanwhile
    async fn invalidate(&self, broken: &TargetHandle) {
        let mut targets = self.inner.targets.lock().await;
        let same = targets
            .get(&broken.collection)
            .map(|current| current.path == broken.path && current.registered_at == broken.registered_at)
            .unwrap_or(false);
        if same {
            targets.remove(&broken.collection);
        }
    }

    async fn collection_json(&self, collection: Collection) -> Result<Vec<u8>> {
        let contents = match collection {
            Collection::Enquiries => serde_json::to_vec_pretty(&self.read::<Enquiry>().await?)?,
            Collection::Feedbacks => serde_json::to_vec_pretty(&self.read::<Feedback>().await?)?,
            Collection::Rettings => serde_json::to_vec_pretty(&self.read::<Retting>().await?)?,
            Collection::Portfolio => serde_json::to_vec_pretty(&self.read::<PortfolioItem>().await?)?,
        };
        Ok(contents)
    }

    fn publish(&self, collection: Collection, count: usize, outcome: PersistOutcome) {
        // No subscribers is fine
        let _ = self.inner.events.send(CollectionChanged {
            collection,
            count,
            outcome,
        });
    }
}

/// Inline status line shown next to the "enable file writing" button
pub fn registration_message(collection: Collection, result: &Result<TargetHandle>) -> String {
    match result {
        Ok(handle) => format!(
            "File access granted for {}. Data will now be saved directly to {}",
            collection.file_name(),
            handle.path.display()
        ),
        Err(AppError::TargetSelectionCancelled) => "File selection was cancelled.".to_string(),
        Err(AppError::CapabilityUnavailable(reason)) => reason.clone(),
        Err(e) => format!("Error: {}", e),
    }
}
