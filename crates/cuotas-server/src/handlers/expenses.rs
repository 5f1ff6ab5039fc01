//! Expense handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::{page_params, read_json, today};
use crate::{current_user, AppError, AppState, SuccessResponse};
use cuotas_core::models::{
    CardExpenseFilter, CardInstallmentRow, DashboardExpense, DashboardFilter, Expense,
    ExpenseSort, ExpenseUpdate, NewExpense, Page,
};

/// Query parameters for a card's expense listing
#[derive(Debug, Default, Deserialize)]
pub struct CardExpensesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "fechaDesde")]
    pub date_from: Option<NaiveDate>,
    #[serde(rename = "fechaHasta")]
    pub date_to: Option<NaiveDate>,
    #[serde(rename = "categoriaId")]
    pub category_id: Option<i64>,
    #[serde(rename = "cuotasRestantes")]
    pub remaining: Option<u32>,
    #[serde(rename = "sortField")]
    pub sort_field: Option<String>,
    #[serde(rename = "sortDirection")]
    pub sort_direction: Option<String>,
}

/// Query parameters for the credit-card dashboard
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(rename = "fechaDesde")]
    pub date_from: Option<NaiveDate>,
    #[serde(rename = "fechaHasta")]
    pub date_to: Option<NaiveDate>,
    #[serde(rename = "categoriaId")]
    pub category_id: Option<i64>,
    #[serde(rename = "tarjetaId")]
    pub card_id: Option<i64>,
}

/// GET /gastos - List the caller's expenses, newest first
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<Expense>>, AppError> {
    let user = current_user(&request)?;

    let expenses = state.db.list_expenses(user.id, today())?;

    state.db.log_audit(
        Some(user.id),
        "list",
        Some("expense"),
        None,
        Some(&format!("count={}", expenses.len())),
    )?;

    Ok(Json(expenses))
}

/// POST /gastos - Record an expense, generating installments for credit cards
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Expense>, AppError> {
    let user = current_user(&request)?;
    let new_expense: NewExpense = read_json(request).await?;

    let id = state.db.create_expense(user.id, &new_expense)?;
    let expense = state.db.get_expense(user.id, id, today())?;

    state.db.log_audit(
        Some(user.id),
        "create",
        Some("expense"),
        Some(id),
        Some(&format!(
            "amount={}, installments={}",
            expense.amount, expense.total_installments
        )),
    )?;

    Ok(Json(expense))
}

/// GET /gastos/:id - Get a single expense
pub async fn get_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Expense>, AppError> {
    let user = current_user(&request)?;

    let expense = state.db.get_expense(user.id, id, today())?;

    state
        .db
        .log_audit(Some(user.id), "get", Some("expense"), Some(id), None)?;

    Ok(Json(expense))
}

/// PUT /gastos/:id - Partially update an expense
pub async fn update_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Expense>, AppError> {
    let user = current_user(&request)?;
    let update: ExpenseUpdate = read_json(request).await?;

    let regenerated = state.db.update_expense(user.id, id, &update)?;
    debug!(expense_id = id, regenerated, "Updated expense");

    let expense = state.db.get_expense(user.id, id, today())?;

    state.db.log_audit(
        Some(user.id),
        "update",
        Some("expense"),
        Some(id),
        Some(&format!("regenerated={}", regenerated)),
    )?;

    Ok(Json(expense))
}

/// DELETE /gastos/:id - Delete an expense and its installments
pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = current_user(&request)?;

    state.db.delete_expense(user.id, id)?;

    state
        .db
        .log_audit(Some(user.id), "delete", Some("expense"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /gastos/por-tarjeta/:tarjeta_id - Filtered, paginated card expenses
pub async fn list_card_expenses(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<i64>,
    Query(params): Query<CardExpensesQuery>,
    request: Request,
) -> Result<Json<Page<Expense>>, AppError> {
    let user = current_user(&request)?;

    let sort = match params.sort_field.as_deref() {
        Some(field) => field
            .parse::<ExpenseSort>()
            .map_err(|e| AppError::bad_request(&e))?,
        None => ExpenseSort::default(),
    };
    let descending = match params.sort_direction.as_deref() {
        None => true,
        Some(dir) if dir.eq_ignore_ascii_case("desc") => true,
        Some(dir) if dir.eq_ignore_ascii_case("asc") => false,
        Some(dir) => {
            return Err(AppError::bad_request(&format!(
                "Invalid sort direction: {} (use asc or desc)",
                dir
            )))
        }
    };
    let (page, limit) = page_params(params.page, params.limit);

    let filter = CardExpenseFilter {
        date_from: params.date_from,
        date_to: params.date_to,
        category_id: params.category_id,
        remaining: params.remaining,
        sort,
        descending,
        page,
        limit,
    };
    let result = state
        .db
        .list_card_expenses(user.id, card_id, &filter, today())?;

    state.db.log_audit(
        Some(user.id),
        "list",
        Some("card_expenses"),
        Some(card_id),
        Some(&format!("page={}, limit={}, total={}", page, limit, result.total)),
    )?;

    Ok(Json(result))
}

/// GET /gastos/dashboard/tarjetas - Credit-card expense dashboard rows
pub async fn list_dashboard_expenses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardQuery>,
    request: Request,
) -> Result<Json<Vec<DashboardExpense>>, AppError> {
    let user = current_user(&request)?;

    let filter = DashboardFilter {
        date_from: params.date_from,
        date_to: params.date_to,
        category_id: params.category_id,
        card_id: params.card_id,
    };
    let rows = state.db.list_dashboard_expenses(user.id, &filter)?;

    state.db.log_audit(
        Some(user.id),
        "report",
        Some("card_dashboard"),
        None,
        Some(&format!("rows={}", rows.len())),
    )?;

    Ok(Json(rows))
}

/// GET /gastos/mensuales/:tarjeta_id - Every installment of a card's expenses
pub async fn list_card_installment_rows(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<i64>,
    request: Request,
) -> Result<Json<Vec<CardInstallmentRow>>, AppError> {
    let user = current_user(&request)?;

    let rows = state.db.list_card_installment_rows(user.id, card_id)?;

    state.db.log_audit(
        Some(user.id),
        "list",
        Some("card_installments"),
        Some(card_id),
        Some(&format!("rows={}", rows.len())),
    )?;

    Ok(Json(rows))
}
