//! Expense category handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};

use super::read_json;
use crate::{current_user, AppError, AppState, SuccessResponse};
use cuotas_core::models::{Category, CategoryUpdate, NewCategory};

/// GET /categoria - List visible categories (own plus global)
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<Category>>, AppError> {
    let user = current_user(&request)?;

    let categories = state.db.list_categories(user.id)?;

    state.db.log_audit(
        Some(user.id),
        "list",
        Some("category"),
        None,
        Some(&format!("count={}", categories.len())),
    )?;

    Ok(Json(categories))
}

/// POST /categoria - Create a category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Category>, AppError> {
    let user = current_user(&request)?;
    let new_category: NewCategory = read_json(request).await?;

    let category = state.db.create_category(user.id, &new_category)?;

    state.db.log_audit(
        Some(user.id),
        "create",
        Some("category"),
        Some(category.id),
        Some(&format!("name={}", category.name)),
    )?;

    Ok(Json(category))
}

/// GET /categoria/:id - Get a single category
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Category>, AppError> {
    let user = current_user(&request)?;

    let category = state.db.get_category(user.id, id)?;

    state
        .db
        .log_audit(Some(user.id), "get", Some("category"), Some(id), None)?;

    Ok(Json(category))
}

/// PATCH /categoria/:id - Update one of the caller's categories
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Category>, AppError> {
    let user = current_user(&request)?;
    let update: CategoryUpdate = read_json(request).await?;

    let category = state.db.update_category(user.id, id, &update)?;

    state
        .db
        .log_audit(Some(user.id), "update", Some("category"), Some(id), None)?;

    Ok(Json(category))
}

/// DELETE /categoria/:id - Soft delete one of the caller's categories
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = current_user(&request)?;

    state.db.delete_category(user.id, id)?;

    state
        .db
        .log_audit(Some(user.id), "delete", Some("category"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /categoria/:id/restaurar - Restore a soft-deleted category
pub async fn restore_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Category>, AppError> {
    let user = current_user(&request)?;

    let category = state.db.restore_category(user.id, id)?;

    state
        .db
        .log_audit(Some(user.id), "restore", Some("category"), Some(id), None)?;

    Ok(Json(category))
}
