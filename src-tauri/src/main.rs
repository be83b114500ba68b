// Aura Studio admin - desktop shell for the local data layer
// Entry point

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    auradata::logging::init();

    tracing::info!("Starting Aura Studio admin");

    if let Err(e) = auradata::app::run() {
        tracing::error!("Error while running tauri application: {}", e);
        std::process::exit(1);
    }
}
