//! Storage module
//!
//! File-side persistence around the local store: bundled snapshots,
//! operator-chosen external targets and fallback downloads.

pub mod downloads;
pub mod snapshot;
pub mod targets;

pub use downloads::DownloadSink;
pub use snapshot::{LoadMode, LoadReport, SnapshotLoader};
pub use targets::{DownloadOnly, TargetHandle, TargetPicker, TargetStatus};
