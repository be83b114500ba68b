//! Aura data layer
//!
//! Local write-through storage for the studio site's enquiries, feedback,
//! rettings and portfolio. The Tauri admin shell is behind the `desktop`
//! feature; everything else builds and tests without a webview.

#[cfg(feature = "desktop")]
pub mod app;
#[cfg(feature = "desktop")]
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod services;
pub mod storage;
