//! Portfolio commands

use crate::app::AppState;
use crate::database::{NewPortfolioItem, PortfolioCategory, PortfolioItem, PortfolioUpdate};
use crate::error::Result;
use tauri::State;

#[tauri::command]
pub async fn get_portfolio_items(state: State<'_, AppState>) -> Result<Vec<PortfolioItem>> {
    state.portfolio.get_portfolio_items().await
}

#[tauri::command]
pub async fn get_portfolio_by_category(
    state: State<'_, AppState>,
    category: PortfolioCategory,
) -> Result<Vec<PortfolioItem>> {
    state.portfolio.get_portfolio_by_category(category).await
}

#[tauri::command]
pub async fn save_portfolio_item(
    state: State<'_, AppState>,
    item: NewPortfolioItem,
) -> Result<PortfolioItem> {
    state.portfolio.save_portfolio_item(item).await
}

/// Edit an item; `null` when the id is unknown
#[tauri::command]
pub async fn update_portfolio_item(
    state: State<'_, AppState>,
    id: String,
    update: PortfolioUpdate,
) -> Result<Option<PortfolioItem>> {
    state.portfolio.update_portfolio_item(&id, update).await
}

#[tauri::command]
pub async fn delete_portfolio_item(state: State<'_, AppState>, id: String) -> Result<bool> {
    state.portfolio.delete_portfolio_item(&id).await
}
