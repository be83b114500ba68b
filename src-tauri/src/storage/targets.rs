//! External file targets
//!
//! An operator may pick one writable JSON file per collection. The
//! synchronizer overwrites it with the full collection after every
//! mutation. Picking goes through a [`TargetPicker`] chosen when the
//! synchronizer is built: the desktop shell uses a native dialog, every
//! other runtime gets [`DownloadOnly`].

use crate::database::Collection;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub type PickFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<PathBuf>>> + Send + 'a>>;

/// Asks the operator for a file to keep a collection in.
///
/// `Ok(None)` means the operator cancelled. Implementations without any
/// file access return [`AppError::CapabilityUnavailable`].
pub trait TargetPicker: Send + Sync {
    fn pick<'a>(&'a self, collection: Collection, suggested_name: &'a str) -> PickFuture<'a>;
}

/// Picker for runtimes without file access; changes are always downloaded
pub struct DownloadOnly;

impl TargetPicker for DownloadOnly {
    fn pick<'a>(&'a self, _collection: Collection, _suggested_name: &'a str) -> PickFuture<'a> {
        Box::pin(async {
            Err(AppError::CapabilityUnavailable(
                "direct file writing is not supported here; changes are downloaded instead"
                    .to_string(),
            ))
        })
    }
}

/// A registered external file for one collection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetHandle {
    pub collection: Collection,
    pub path: PathBuf,
    pub registered_at: DateTime<Utc>,
}

impl TargetHandle {
    pub fn new(collection: Collection, path: PathBuf) -> Self {
        Self {
            collection,
            path,
            registered_at: Utc::now(),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Replace the target's contents.
    ///
    /// Writes a sibling temp file and renames it over the target, so a
    /// failed write leaves the previous contents in place.
    pub async fn write(&self, contents: &[u8]) -> Result<()> {
        let temp_path = temp_path_for(&self.path);

        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(contents).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &self.path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(AppError::WriteFailure {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            });
        }

        tracing::debug!("Wrote {} bytes to {}", contents.len(), self.path.display());
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "target".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Enabled/disabled indicator for the admin dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetStatus {
    pub collection: Collection,
    pub supported: bool,
    pub enabled: bool,
    pub path: Option<String>,
}
