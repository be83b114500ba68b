//! Error types for the Aura data layer
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to the frontend.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "desktop")]
    #[error("Tauri error: {0}")]
    Tauri(#[from] tauri::Error),

    /// The local database could not be opened or created.
    #[error("Local storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A collection table does not exist yet (migration not applied).
    #[error("Collection not available yet: {0}")]
    CollectionMissing(String),

    #[error("File selection was cancelled")]
    TargetSelectionCancelled,

    #[error("File access is not available: {0}")]
    CapabilityUnavailable(String),

    #[error("Failed to write {path}: {reason}")]
    WriteFailure { path: String, reason: String },

    #[error("Failed to load snapshot {file}: {reason}")]
    SnapshotFetch { file: String, reason: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
