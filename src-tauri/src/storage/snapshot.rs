//! Baseline snapshot loading
//!
//! The site ships one JSON array per collection. On first run they seed
//! the store; afterwards the store is authoritative and snapshots are only
//! merged forward: records with unknown ids are appended, known ids are
//! never overwritten. Each collection loads independently.

use crate::database::store::collapse_duplicates;
use crate::database::{Collection, CollectionStore, Enquiry, Feedback, PortfolioItem, Record, Retting};
use crate::error::{AppError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadMode {
    /// Every collection was empty; snapshots seed the store
    FirstRun,
    /// Store already had data; snapshots only backfill missing ids
    Merge,
}

/// Outcome for one collection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionLoad {
    pub collection: Collection,
    pub in_snapshot: usize,
    pub added: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub mode: LoadMode,
    pub collections: Vec<CollectionLoad>,
}

impl LoadReport {
    pub fn get(&self, collection: Collection) -> Option<&CollectionLoad> {
        self.collections.iter().find(|c| c.collection == collection)
    }

    pub fn added(&self, collection: Collection) -> usize {
        self.get(collection).map(|c| c.added).unwrap_or(0)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CollectionLoad> {
        self.collections.iter().filter(|c| c.error.is_some())
    }
}

/// Seeds and backfills the store from a snapshot directory
#[derive(Clone)]
pub struct SnapshotLoader {
    store: CollectionStore,
    dir: PathBuf,
}

impl SnapshotLoader {
    pub fn new(store: CollectionStore, dir: PathBuf) -> Self {
        Self { store, dir }
    }

    /// Load every collection. Per-collection failures end up in the report.
    pub async fn load(&self) -> Result<LoadReport> {
        let mut mode = LoadMode::FirstRun;
        for collection in Collection::ALL {
            if self.store.count(collection).await? > 0 {
                mode = LoadMode::Merge;
                break;
            }
        }

        tracing::info!("Loading snapshots from {:?} ({:?})", self.dir, mode);

        let collections = vec![
            self.load_collection::<Enquiry>(mode).await,
            self.load_collection::<Feedback>(mode).await,
            self.load_collection::<Retting>(mode).await,
            self.load_collection::<PortfolioItem>(mode).await,
        ];

        let report = LoadReport { mode, collections };
        for load in &report.collections {
            tracing::info!(
                "Snapshot {}: {} in file, {} added",
                load.collection,
                load.in_snapshot,
                load.added
            );
        }

        Ok(report)
    }

    async fn load_collection<R: Record>(&self, mode: LoadMode) -> CollectionLoad {
        let collection = R::COLLECTION;
        match self.try_load::<R>(mode).await {
            Ok((in_snapshot, added)) => CollectionLoad {
                collection,
                in_snapshot,
                added,
                error: None,
            },
            Err(e) => {
                tracing::warn!("Snapshot for {} not loaded: {}", collection, e);
                CollectionLoad {
                    collection,
                    in_snapshot: 0,
                    added: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_load<R: Record>(&self, mode: LoadMode) -> Result<(usize, usize)> {
        let snapshot = self.fetch::<R>().await?;
        let in_snapshot = snapshot.len();
        if snapshot.is_empty() {
            return Ok((0, 0));
        }

        let _guard = self.store.lock(R::COLLECTION).await;
        let existing: Vec<R> = self.store.read_collection().await?;

        if mode == LoadMode::FirstRun && existing.is_empty() {
            let stored = self.store.replace_collection(&snapshot).await?;
            return Ok((in_snapshot, stored));
        }

        // Ids held by rows this build cannot read are still taken
        let stored_ids = self.store.ids(R::COLLECTION).await?;
        let snapshot: Vec<R> = snapshot
            .into_iter()
            .filter(|record| !stored_ids.contains(record.id()))
            .collect();

        let (merged, added) = merge_forward(existing, snapshot);
        if added > 0 {
            self.store.replace_collection(&merged).await?;
        }
        Ok((in_snapshot, added))
    }

    /// Read and parse one collection's snapshot. A missing file is empty.
    ///
    /// Duplicate ids inside the file collapse to their last occurrence,
    /// the same rule the store applies, whichever mode is loading.
    pub async fn fetch<R: Record>(&self) -> Result<Vec<R>> {
        let file = R::COLLECTION.file_name();
        let path = self.dir.join(&file);

        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No snapshot at {:?}", path);
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AppError::SnapshotFetch {
                    file,
                    reason: e.to_string(),
                })
            }
        };

        let records: Vec<R> = parse_snapshot(&text, &file)?;
        Ok(collapse_duplicates(&records))
    }
}

/// Parse a snapshot document.
///
/// Blank text or a non-array document yields an empty list. Elements
/// that do not decode are skipped so one bad record cannot hide the rest.
pub fn parse_snapshot<R: Record>(text: &str, file: &str) -> Result<Vec<R>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document: Value = serde_json::from_str(text).map_err(|e| AppError::SnapshotFetch {
        file: file.to_string(),
        reason: e.to_string(),
    })?;

    let Value::Array(items) = document else {
        tracing::warn!("Snapshot {} is not a JSON array, ignoring it", file);
        return Ok(Vec::new());
    };

    Ok(decode_records(items, file))
}

/// Decode array elements one by one, skipping the ones that do not fit `R`
pub fn decode_records<R: Record>(items: Vec<Value>, source: &str) -> Vec<R> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<R>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping record {} in {}: {}", index, source, e);
                None
            }
        })
        .collect()
}

/// Append snapshot records whose ids are not present yet.
///
/// Existing records keep their values and order. Returns the merged list
/// and how many records were appended.
pub fn merge_forward<R: Record>(existing: Vec<R>, snapshot: Vec<R>) -> (Vec<R>, usize) {
    let mut known: HashSet<String> = existing.iter().map(|r| r.id().to_string()).collect();
    let mut merged = existing;
    let before = merged.len();

    for record in snapshot {
        if known.insert(record.id().to_string()) {
            merged.push(record);
        }
    }

    let added = merged.len() - before;
    (merged, added)
}
