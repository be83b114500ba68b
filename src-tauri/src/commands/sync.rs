//! File sync commands
//!
//! External target registration, explicit downloads and the dashboard's
//! "sync files" action.

use crate::app::AppState;
use crate::database::Collection;
use crate::error::Result;
use crate::services::{registration_message, PersistOutcome};
use crate::storage::TargetStatus;
use serde::Serialize;
use tauri::State;

/// Result of an "enable file writing" click
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRegistration {
    pub collection: Collection,
    pub enabled: bool,
    pub message: String,
}

/// Ask the operator for a collection's file. Failures are reported in the
/// message rather than as an error; the collection keeps downloading.
#[tauri::command]
pub async fn register_external_target(
    state: State<'_, AppState>,
    collection: Collection,
) -> Result<TargetRegistration> {
    let result = state.sync.register_external_target(collection).await;
    let message = registration_message(collection, &result);
    if let Err(e) = &result {
        tracing::warn!("File access for {} not granted: {}", collection, e);
    }

    Ok(TargetRegistration {
        collection,
        enabled: result.is_ok(),
        message,
    })
}

#[tauri::command]
pub async fn get_target_statuses(state: State<'_, AppState>) -> Result<Vec<TargetStatus>> {
    Ok(state.sync.target_statuses().await)
}

#[tauri::command]
pub async fn clear_external_target(state: State<'_, AppState>, collection: Collection) -> Result<bool> {
    Ok(state.sync.clear_target(collection).await)
}

#[tauri::command]
pub async fn download_collection(state: State<'_, AppState>, collection: Collection) -> Result<String> {
    let path = state.sync.download_collection(collection).await?;
    Ok(path.to_string_lossy().to_string())
}

#[tauri::command]
pub async fn download_all_data(state: State<'_, AppState>) -> Result<String> {
    let path = state.sync.download_all().await?;
    Ok(path.to_string_lossy().to_string())
}

/// Per-collection result of a full sync
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub collection: Collection,
    pub outcome: PersistOutcome,
}

#[tauri::command]
pub async fn sync_all_files(state: State<'_, AppState>) -> Result<Vec<SyncResult>> {
    tracing::info!("Syncing all collections to their files");

    let outcomes = state.sync.sync_all_to_targets().await?;
    Ok(outcomes
        .into_iter()
        .map(|(collection, outcome)| SyncResult { collection, outcome })
        .collect())
}
