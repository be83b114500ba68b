//! Enquiry commands

use crate::app::AppState;
use crate::database::{Enquiry, EnquiryStatus, NewEnquiry};
use crate::error::Result;
use tauri::State;

#[tauri::command]
pub async fn get_enquiries(state: State<'_, AppState>) -> Result<Vec<Enquiry>> {
    state.enquiries.get_enquiries().await
}

/// Submit a new enquiry from the booking form
#[tauri::command]
pub async fn save_enquiry(state: State<'_, AppState>, enquiry: NewEnquiry) -> Result<Enquiry> {
    state.enquiries.save_enquiry(enquiry).await
}

#[tauri::command]
pub async fn update_enquiry_status(
    state: State<'_, AppState>,
    id: String,
    status: EnquiryStatus,
) -> Result<bool> {
    state.enquiries.update_enquiry_status(&id, status).await
}

#[tauri::command]
pub async fn add_enquiry_reply(state: State<'_, AppState>, id: String, reply: String) -> Result<bool> {
    state.enquiries.add_enquiry_reply(&id, reply).await
}

#[tauri::command]
pub async fn update_enquiry_reply(
    state: State<'_, AppState>,
    id: String,
    reply: String,
) -> Result<bool> {
    state.enquiries.update_enquiry_reply(&id, reply).await
}

#[tauri::command]
pub async fn delete_enquiry_reply(state: State<'_, AppState>, id: String) -> Result<bool> {
    state.enquiries.delete_enquiry_reply(&id).await
}

#[tauri::command]
pub async fn delete_enquiry(state: State<'_, AppState>, id: String) -> Result<bool> {
    state.enquiries.delete_enquiry(&id).await
}

/// Replace all enquiries with an uploaded JSON file's contents
#[tauri::command]
pub async fn import_enquiries(state: State<'_, AppState>, json: String) -> Result<usize> {
    state.enquiries.import_enquiries(&json).await
}
