//! Debit card handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};

use super::read_json;
use crate::{current_user, AppError, AppState, SuccessResponse};
use cuotas_core::models::{DebitCard, DebitCardUpdate, NewDebitCard};

/// GET /tarjetas-debito - List the caller's debit cards
pub async fn list_debit_cards(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<DebitCard>>, AppError> {
    let user = current_user(&request)?;

    let cards = state.db.list_debit_cards(user.id)?;

    state.db.log_audit(
        Some(user.id),
        "list",
        Some("debit_card"),
        None,
        Some(&format!("count={}", cards.len())),
    )?;

    Ok(Json(cards))
}

/// POST /tarjetas-debito - Register a debit card
pub async fn create_debit_card(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<DebitCard>, AppError> {
    let user = current_user(&request)?;
    let new_card: NewDebitCard = read_json(request).await?;

    let card = state.db.create_debit_card(user.id, &new_card)?;

    state.db.log_audit(
        Some(user.id),
        "create",
        Some("debit_card"),
        Some(card.id),
        Some(&format!("name={}, last_four={}", card.name, card.last_four)),
    )?;

    Ok(Json(card))
}

/// GET /tarjetas-debito/:id - Get a single debit card
pub async fn get_debit_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<DebitCard>, AppError> {
    let user = current_user(&request)?;

    let card = state.db.get_debit_card(user.id, id)?;

    state
        .db
        .log_audit(Some(user.id), "get", Some("debit_card"), Some(id), None)?;

    Ok(Json(card))
}

/// PUT /tarjetas-debito/:id - Update a debit card
pub async fn update_debit_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<DebitCard>, AppError> {
    let user = current_user(&request)?;
    let update: DebitCardUpdate = read_json(request).await?;

    let card = state.db.update_debit_card(user.id, id, &update)?;

    state
        .db
        .log_audit(Some(user.id), "update", Some("debit_card"), Some(id), None)?;

    Ok(Json(card))
}

/// DELETE /tarjetas-debito/:id - Soft delete a debit card
pub async fn delete_debit_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = current_user(&request)?;

    state.db.delete_debit_card(user.id, id)?;

    state
        .db
        .log_audit(Some(user.id), "delete", Some("debit_card"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
