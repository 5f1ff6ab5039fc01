//! Bank handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};

use super::read_json;
use crate::{current_user, AppError, AppState, SuccessResponse};
use cuotas_core::models::{Bank, BankUpdate, NewBank};

/// GET /banco - List the caller's banks plus the shared ones
pub async fn list_banks(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<Bank>>, AppError> {
    let user = current_user(&request)?;

    let banks = state.db.list_banks(user.id)?;

    state.db.log_audit(
        Some(user.id),
        "list",
        Some("bank"),
        None,
        Some(&format!("count={}", banks.len())),
    )?;

    Ok(Json(banks))
}

/// POST /banco - Create a bank
pub async fn create_bank(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Bank>, AppError> {
    let user = current_user(&request)?;
    let new_bank: NewBank = read_json(request).await?;

    let bank = state.db.create_bank(user.id, &new_bank)?;

    state.db.log_audit(
        Some(user.id),
        "create",
        Some("bank"),
        Some(bank.id),
        Some(&format!("name={}", bank.name)),
    )?;

    Ok(Json(bank))
}

/// GET /banco/:id - Get a single bank
pub async fn get_bank(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Bank>, AppError> {
    let user = current_user(&request)?;

    let bank = state.db.get_bank(user.id, id)?;

    state
        .db
        .log_audit(Some(user.id), "get", Some("bank"), Some(id), None)?;

    Ok(Json(bank))
}

/// PUT /banco/:id - Update one of the caller's banks
pub async fn update_bank(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Bank>, AppError> {
    let user = current_user(&request)?;
    let update: BankUpdate = read_json(request).await?;

    let bank = state.db.update_bank(user.id, id, &update)?;

    state
        .db
        .log_audit(Some(user.id), "update", Some("bank"), Some(id), None)?;

    Ok(Json(bank))
}

/// DELETE /banco/:id - Delete one of the caller's banks
pub async fn delete_bank(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = current_user(&request)?;

    state.db.delete_bank(user.id, id)?;

    state
        .db
        .log_audit(Some(user.id), "delete", Some("bank"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
