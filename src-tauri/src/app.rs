//! Application state and initialization
//!
//! Opens the store, merges the bundled snapshots and builds the services
//! the commands use. Change notifications are forwarded to the webviews.

use crate::commands;
use crate::config::{self, DataPaths};
use crate::database::{Collection, CollectionStore};
use crate::error::{AppError, Result};
use crate::services::{
    CollectionChanged, EnquiryService, FeedbackService, PortfolioService, RettingService,
    Synchronizer,
};
use crate::storage::targets::PickFuture;
use crate::storage::{DownloadSink, LoadReport, SnapshotLoader, TargetPicker};
use std::sync::Arc;
use tauri::{App, AppHandle, Emitter, Manager};
use tauri_plugin_dialog::DialogExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub paths: DataPaths,
    pub sync: Synchronizer,
    pub enquiries: EnquiryService,
    pub feedback: FeedbackService,
    pub rettings: RettingService,
    pub portfolio: PortfolioService,
    pub load_report: Arc<LoadReport>,
}

impl AppState {
    pub fn new(paths: DataPaths, sync: Synchronizer, load_report: LoadReport) -> Self {
        Self {
            paths,
            enquiries: EnquiryService::new(sync.clone()),
            feedback: FeedbackService::new(sync.clone()),
            rettings: RettingService::new(sync.clone()),
            portfolio: PortfolioService::new(sync.clone()),
            sync,
            load_report: Arc::new(load_report),
        }
    }
}

/// Native save dialog used to choose a collection's external file
pub struct DialogPicker {
    app: AppHandle,
}

impl DialogPicker {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl TargetPicker for DialogPicker {
    fn pick<'a>(&'a self, collection: Collection, suggested_name: &'a str) -> PickFuture<'a> {
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();

            self.app
                .dialog()
                .file()
                .set_title(format!("Choose the {} file", collection.label()))
                .add_filter("JSON files", &["json"])
                .set_file_name(suggested_name)
                .save_file(move |path| {
                    let _ = tx.send(path);
                });

            // A dropped sender means the dialog went away without an answer
            let Ok(Some(path)) = rx.await else {
                return Ok(None);
            };

            path.into_path()
                .map(Some)
                .map_err(|e| AppError::Generic(format!("Unusable file selection: {}", e)))
        })
    }
}

/// Application setup - called once on startup
pub fn setup(app: &mut App) -> Result<()> {
    tracing::info!("Initializing application");

    let app_data_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| AppError::Generic(format!("Failed to get app data dir: {}", e)))?;

    let mut paths = DataPaths::new(app_data_dir);
    match app.path().resource_dir() {
        Ok(resources) => paths = paths.with_snapshots(&resources.join(config::SNAPSHOT_DIR_NAME)),
        Err(e) => tracing::warn!("No resource dir, reading snapshots from app data: {}", e),
    }
    if let Ok(downloads) = app.path().download_dir() {
        paths = paths.with_downloads(&downloads);
    }

    tracing::info!("App data directory: {:?}", paths.data_dir);
    std::fs::create_dir_all(&paths.data_dir)?;

    let (store, load_report) = tauri::async_runtime::block_on(async {
        let store = CollectionStore::open(&paths.database).await?;
        let report = SnapshotLoader::new(store.clone(), paths.snapshots.clone())
            .load()
            .await?;
        Ok::<_, AppError>((store, report))
    })?;

    for failure in load_report.failures() {
        tracing::warn!(
            "Snapshot for {} skipped: {}",
            failure.collection,
            failure.error.as_deref().unwrap_or_default()
        );
    }

    let picker = Arc::new(DialogPicker::new(app.handle().clone()));
    let sync = Synchronizer::new(store, picker, DownloadSink::new(paths.downloads.clone()));

    forward_changes(app.handle().clone(), &sync);
    app.manage(AppState::new(paths, sync, load_report));

    tracing::info!("Application initialized successfully");

    Ok(())
}

/// Re-emit collection changes as webview events
fn forward_changes(handle: AppHandle, sync: &Synchronizer) {
    let mut changes = sync.subscribe();

    tauri::async_runtime::spawn(async move {
        loop {
            let change: CollectionChanged = match changes.recv().await {
                Ok(change) => change,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Change forwarder lagged, {} notifications dropped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if let Err(e) = handle.emit(config::EVENT_COLLECTION_UPDATED, &change) {
                tracing::error!("Failed to emit collection event: {}", e);
            }
            if change.collection == Collection::Portfolio {
                if let Err(e) = handle.emit(config::EVENT_PORTFOLIO_UPDATED, &change) {
                    tracing::error!("Failed to emit portfolio event: {}", e);
                }
            }
        }
    });
}

/// Build and run the admin shell
pub fn run() -> Result<()> {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            tracing::info!("Running app setup");
            setup(app)?;
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_app_info,
            commands::register_external_target,
            commands::get_target_statuses,
            commands::clear_external_target,
            commands::download_collection,
            commands::download_all_data,
            commands::sync_all_files,
            commands::get_enquiries,
            commands::save_enquiry,
            commands::update_enquiry_status,
            commands::add_enquiry_reply,
            commands::update_enquiry_reply,
            commands::delete_enquiry_reply,
            commands::delete_enquiry,
            commands::import_enquiries,
            commands::get_feedbacks,
            commands::save_feedback,
            commands::add_feedback_reply,
            commands::update_feedback_reply,
            commands::delete_feedback_reply,
            commands::delete_feedback,
            commands::import_feedbacks,
            commands::get_average_rating,
            commands::get_rettings,
            commands::save_retting,
            commands::delete_retting,
            commands::import_rettings,
            commands::get_portfolio_items,
            commands::get_portfolio_by_category,
            commands::save_portfolio_item,
            commands::update_portfolio_item,
            commands::delete_portfolio_item,
        ])
        .run(tauri::generate_context!())?;

    Ok(())
}
