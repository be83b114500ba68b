//! Feedback and retting commands

use crate::app::AppState;
use crate::database::{Feedback, NewFeedback, Retting, RettingSource};
use crate::error::Result;
use tauri::State;

#[tauri::command]
pub async fn get_feedbacks(state: State<'_, AppState>) -> Result<Vec<Feedback>> {
    state.feedback.get_feedbacks().await
}

/// Save feedback and its derived retting
#[tauri::command]
pub async fn save_feedback(state: State<'_, AppState>, feedback: NewFeedback) -> Result<Feedback> {
    state.feedback.save_feedback(feedback).await
}

#[tauri::command]
pub async fn add_feedback_reply(
    state: State<'_, AppState>,
    id: String,
    reply: String,
) -> Result<bool> {
    state.feedback.add_feedback_reply(&id, reply).await
}

#[tauri::command]
pub async fn update_feedback_reply(
    state: State<'_, AppState>,
    id: String,
    reply: String,
) -> Result<bool> {
    state.feedback.update_feedback_reply(&id, reply).await
}

#[tauri::command]
pub async fn delete_feedback_reply(state: State<'_, AppState>, id: String) -> Result<bool> {
    state.feedback.delete_feedback_reply(&id).await
}

#[tauri::command]
pub async fn delete_feedback(state: State<'_, AppState>, id: String) -> Result<bool> {
    state.feedback.delete_feedback(&id).await
}

#[tauri::command]
pub async fn import_feedbacks(state: State<'_, AppState>, json: String) -> Result<usize> {
    state.feedback.import_feedbacks(&json).await
}

/// Mean rating for the testimonials section
#[tauri::command]
pub async fn get_average_rating(state: State<'_, AppState>) -> Result<Option<f64>> {
    state.feedback.average_rating().await
}

#[tauri::command]
pub async fn get_rettings(state: State<'_, AppState>) -> Result<Vec<Retting>> {
    state.rettings.get_rettings().await
}

/// Save a retting that did not come from the feedback form
#[tauri::command]
pub async fn save_retting(state: State<'_, AppState>, source: RettingSource) -> Result<Retting> {
    state.rettings.save_retting(source).await
}

#[tauri::command]
pub async fn delete_retting(state: State<'_, AppState>, id: String) -> Result<bool> {
    state.rettings.delete_retting(&id).await
}

#[tauri::command]
pub async fn import_rettings(state: State<'_, AppState>, json: String) -> Result<usize> {
    state.rettings.import_rettings(&json).await
}
