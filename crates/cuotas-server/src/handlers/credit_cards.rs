//! Credit card handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Json,
};
use serde::Deserialize;

use super::{read_json, today};
use crate::{current_user, AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT};
use cuotas_core::models::{CreditCard, CreditCardDetail, CreditCardUpdate, Expense, NewCreditCard};

/// Query parameters for card movements
#[derive(Debug, Deserialize)]
pub struct MovementsQuery {
    #[serde(default = "default_movements_limit")]
    pub limit: u32,
}

fn default_movements_limit() -> u32 {
    20
}

/// GET /tarjetas-credito - List the caller's credit cards
pub async fn list_credit_cards(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<CreditCard>>, AppError> {
    let user = current_user(&request)?;

    let cards = state.db.list_credit_cards(user.id)?;

    state.db.log_audit(
        Some(user.id),
        "list",
        Some("credit_card"),
        None,
        Some(&format!("count={}", cards.len())),
    )?;

    Ok(Json(cards))
}

/// POST /tarjetas-credito - Register a credit card
pub async fn create_credit_card(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<CreditCard>, AppError> {
    let user = current_user(&request)?;
    let new_card: NewCreditCard = read_json(request).await?;

    let card = state.db.create_credit_card(user.id, &new_card)?;

    // Only the trailing digits ever reach the log
    state.db.log_audit(
        Some(user.id),
        "create",
        Some("credit_card"),
        Some(card.id),
        Some(&format!("name={}, last_four={}", card.name, card.last_four)),
    )?;

    Ok(Json(card))
}

/// GET /tarjetas-credito/:id - Get a single credit card
pub async fn get_credit_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<CreditCard>, AppError> {
    let user = current_user(&request)?;

    let card = state.db.get_credit_card(user.id, id)?;

    state
        .db
        .log_audit(Some(user.id), "get", Some("credit_card"), Some(id), None)?;

    Ok(Json(card))
}

/// PUT /tarjetas-credito/:id - Update a credit card
pub async fn update_credit_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<CreditCard>, AppError> {
    let user = current_user(&request)?;
    let update: CreditCardUpdate = read_json(request).await?;

    let card = state.db.update_credit_card(user.id, id, &update)?;

    state
        .db
        .log_audit(Some(user.id), "update", Some("credit_card"), Some(id), None)?;

    Ok(Json(card))
}

/// DELETE /tarjetas-credito/:id - Soft delete a credit card
pub async fn delete_credit_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = current_user(&request)?;

    state.db.delete_credit_card(user.id, id)?;

    state
        .db
        .log_audit(Some(user.id), "delete", Some("credit_card"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /tarjetas-credito/:id/detalle - Limit usage for one card
pub async fn credit_card_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<CreditCardDetail>, AppError> {
    let user = current_user(&request)?;

    let detail = state.db.credit_card_detail(user.id, id, today())?;

    state
        .db
        .log_audit(Some(user.id), "report", Some("card_detail"), Some(id), None)?;

    Ok(Json(detail))
}

/// GET /tarjetas-credito/resumen - Limit usage for every card
pub async fn credit_card_overview(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<CreditCardDetail>>, AppError> {
    let user = current_user(&request)?;

    let details = state.db.credit_card_overview(user.id, today())?;

    state.db.log_audit(
        Some(user.id),
        "report",
        Some("card_overview"),
        None,
        Some(&format!("cards={}", details.len())),
    )?;

    Ok(Json(details))
}

/// GET /tarjetas-credito/:id/movimientos - Most recent expenses on a card
pub async fn credit_card_movements(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<MovementsQuery>,
    request: Request,
) -> Result<Json<Vec<Expense>>, AppError> {
    let user = current_user(&request)?;
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);

    // Ownership check first so a foreign card is a 404, not an empty list
    state.db.get_credit_card(user.id, id)?;
    let expenses = state
        .db
        .list_recent_card_expenses(user.id, id, limit, today())?;

    state.db.log_audit(
        Some(user.id),
        "list",
        Some("card_movements"),
        Some(id),
        Some(&format!("count={}", expenses.len())),
    )?;

    Ok(Json(expenses))
}
