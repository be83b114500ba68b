//! Application configuration constants
//!
//! Central location for file names, id prefixes, validation boundaries
//! and the directory layout used by the data layer.

use std::path::{Path, PathBuf};

// ===== Local Store =====

/// SQLite database file inside the app data directory
pub const DATABASE_FILE: &str = "aura.sqlite";

/// Latest schema version. Version 2 added the portfolio collection.
pub const SCHEMA_VERSION: i32 = 2;

/// Connections in the application pool (migrations always use one)
pub const POOL_MAX_CONNECTIONS: u32 = 5;

/// How long SQLite waits on a locked database before giving up
pub const BUSY_TIMEOUT_SECS: u64 = 5;

// ===== Record Ids =====

pub const ENQUIRY_ID_PREFIX: &str = "enq";
pub const FEEDBACK_ID_PREFIX: &str = "fb";
pub const RETTING_ID_PREFIX: &str = "ret";
pub const PORTFOLIO_ID_PREFIX: &str = "port";

/// Length of the random base-36 suffix appended to generated ids
pub const ID_SUFFIX_LEN: usize = 9;

// ===== Validation =====

/// Lowest accepted feedback rating
pub const MIN_RATING: u8 = 1;

/// Highest accepted feedback rating
pub const MAX_RATING: u8 = 5;

// ===== Files =====

/// Subdirectory of the app data (or resource) directory holding snapshots
pub const SNAPSHOT_DIR_NAME: &str = "data";

/// Subdirectory used for fallback downloads when no OS download dir is known
pub const DOWNLOADS_DIR_NAME: &str = "downloads";

/// Capacity of the change notification channel. Slow subscribers lag
/// rather than block writers.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

// ===== Frontend Events =====

/// Emitted after every successful persist of any collection
pub const EVENT_COLLECTION_UPDATED: &str = "collection-updated";

/// Emitted additionally after portfolio changes (public portfolio pages)
pub const EVENT_PORTFOLIO_UPDATED: &str = "portfolio-updated";

// ===== Logging =====

/// Filter used when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "auradata=debug,info";

/// Directory layout of the data layer
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub database: PathBuf,
    pub snapshots: PathBuf,
    pub downloads: PathBuf,
}

impl DataPaths {
    /// Layout rooted at `data_dir`, with snapshots and downloads inside it
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            database: data_dir.join(DATABASE_FILE),
            snapshots: data_dir.join(SNAPSHOT_DIR_NAME),
            downloads: data_dir.join(DOWNLOADS_DIR_NAME),
            data_dir,
        }
    }

    /// Read bundled snapshots from somewhere else (e.g. the resource dir)
    pub fn with_snapshots(mut self, dir: &Path) -> Self {
        self.snapshots = dir.to_path_buf();
        self
    }

    /// Send fallback downloads to the user's download directory
    pub fn with_downloads(mut self, dir: &Path) -> Self {
        self.downloads = dir.to_path_buf();
        self
    }
}
