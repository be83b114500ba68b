//! Tauri commands exposed to the frontend
//!
//! This module organizes commands into logical submodules:
//! - `enquiries`: Enquiry CRUD and replies
//! - `feedback`: Feedback, replies and rettings
//! - `portfolio`: Portfolio CRUD
//! - `sync`: External files, downloads and full sync

pub mod enquiries;
pub mod feedback;
pub mod portfolio;
pub mod sync;

use crate::app::AppState;
use crate::error::Result;
use crate::storage::LoadReport;
use tauri::State;

// Re-export all commands for convenient registration
pub use enquiries::*;
pub use feedback::*;
pub use portfolio::*;
pub use sync::*;

// ===== General Commands =====

/// Get application information
#[tauri::command]
pub async fn get_app_info(state: State<'_, AppState>) -> Result<AppInfo> {
    Ok(AppInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        app_data_dir: state.paths.data_dir.to_string_lossy().to_string(),
        downloads_dir: state.sync.downloads().dir().to_string_lossy().to_string(),
        schema_version: state.sync.store().schema_version().await?,
        snapshot_load: (*state.load_report).clone(),
    })
}

/// Application information structure
#[derive(serde::Serialize)]
pub struct AppInfo {
    pub version: String,
    pub app_data_dir: String,
    pub downloads_dir: String,
    pub schema_version: i32,
    pub snapshot_load: LoadReport,
}
