//! Installment (cuota) handlers: listings, payment and summaries

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Json,
};
use serde::Deserialize;

use super::{current_year, page_params, today};
use crate::{current_user, AppError, AppState, SuccessResponse};
use cuotas_core::models::{
    AnnualSummary, CardMonthTotal, CardMonthlyBreakdown, GeneralAnnualSummary, Installment,
    InstallmentFilter, InstallmentListItem, Page, PendingInstallmentsReport,
};

/// Query parameters for the installment listing
#[derive(Debug, Default, Deserialize)]
pub struct InstallmentsQuery {
    #[serde(rename = "tarjetaId")]
    pub card_id: Option<i64>,
    #[serde(rename = "mes")]
    pub month: Option<u32>,
    #[serde(rename = "anio")]
    pub year: Option<i32>,
    #[serde(rename = "pagada")]
    pub paid: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// `?anio=` for the yearly summaries, defaulting to the current year
#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    #[serde(rename = "anio")]
    pub year: Option<i32>,
}

/// GET /Cuota - Filtered, paginated installments across the caller's cards
pub async fn list_installments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InstallmentsQuery>,
    request: Request,
) -> Result<Json<Page<InstallmentListItem>>, AppError> {
    let user = current_user(&request)?;
    let (page, limit) = page_params(params.page, params.limit);

    let filter = InstallmentFilter {
        card_id: params.card_id,
        month: params.month,
        year: params.year,
        paid: params.paid,
        page,
        limit,
    };
    let result = state.db.list_installments(user.id, &filter)?;

    state.db.log_audit(
        Some(user.id),
        "list",
        Some("installment"),
        None,
        Some(&format!("page={}, limit={}, total={}", page, limit, result.total)),
    )?;

    Ok(Json(result))
}

/// GET /Cuota/gasto/:gasto_id - Installments of one expense
pub async fn list_expense_installments(
    State(state): State<Arc<AppState>>,
    Path(expense_id): Path<i64>,
    request: Request,
) -> Result<Json<Vec<Installment>>, AppError> {
    let user = current_user(&request)?;

    let installments = state
        .db
        .list_installments_for_expense(user.id, expense_id)?;

    state.db.log_audit(
        Some(user.id),
        "list",
        Some("installment"),
        Some(expense_id),
        Some(&format!("count={}", installments.len())),
    )?;

    Ok(Json(installments))
}

/// PATCH /Cuota/:id/pagar - Mark an installment as paid
///
/// Best effort: an unknown or foreign installment still answers success.
pub async fn pay_installment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = current_user(&request)?;

    let changed = state.db.mark_installment_paid(user.id, id)?;

    state.db.log_audit(
        Some(user.id),
        "pay",
        Some("installment"),
        Some(id),
        Some(&format!("changed={}", changed)),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /Cuota/resumen - Installments due this month, per card
pub async fn monthly_card_totals(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<CardMonthTotal>>, AppError> {
    let user = current_user(&request)?;

    let totals = state.db.monthly_card_totals(user.id, today())?;

    state
        .db
        .log_audit(Some(user.id), "report", Some("monthly_totals"), None, None)?;

    Ok(Json(totals))
}

/// GET /Cuota/resumen-anual - Per-card monthly totals for a year
pub async fn annual_card_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<YearQuery>,
    request: Request,
) -> Result<Json<AnnualSummary>, AppError> {
    let user = current_user(&request)?;
    let year = params.year.unwrap_or_else(current_year);

    let summary = state.db.annual_card_summary(user.id, year)?;

    state.db.log_audit(
        Some(user.id),
        "report",
        Some("annual_summary"),
        None,
        Some(&format!("year={}", year)),
    )?;

    Ok(Json(summary))
}

/// GET /Cuota/resumen-general-anual - Monthly totals across all cards
pub async fn general_annual_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<YearQuery>,
    request: Request,
) -> Result<Json<GeneralAnnualSummary>, AppError> {
    let user = current_user(&request)?;
    let year = params.year.unwrap_or_else(current_year);

    let summary = state.db.general_annual_summary(user.id, year)?;

    state.db.log_audit(
        Some(user.id),
        "report",
        Some("general_annual_summary"),
        None,
        Some(&format!("year={}", year)),
    )?;

    Ok(Json(summary))
}

/// GET /Cuota/resumen-tarjeta/:tarjeta_id - New vs carried-over installments per month
pub async fn card_monthly_breakdown(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<i64>,
    Query(params): Query<YearQuery>,
    request: Request,
) -> Result<Json<CardMonthlyBreakdown>, AppError> {
    let user = current_user(&request)?;
    let year = params.year.unwrap_or_else(current_year);

    let breakdown = state.db.card_monthly_breakdown(user.id, card_id, year)?;

    state.db.log_audit(
        Some(user.id),
        "report",
        Some("card_breakdown"),
        Some(card_id),
        Some(&format!("year={}", year)),
    )?;

    Ok(Json(breakdown))
}

/// GET /Cuota/pendientes-futuras/:tarjeta_id - Unpaid installments from next month on
pub async fn pending_future_installments(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<i64>,
    request: Request,
) -> Result<Json<PendingInstallmentsReport>, AppError> {
    let user = current_user(&request)?;

    let report = state
        .db
        .pending_future_installments(user.id, card_id, today())?;

    state.db.log_audit(
        Some(user.id),
        "report",
        Some("pending_installments"),
        Some(card_id),
        Some(&format!("expenses={}", report.expenses.len())),
    )?;

    Ok(Json(report))
}
