//! Chart data for the dashboard
//!
//! The aggregations live in core; this module only shapes them into
//! `{labels, datasets}` payloads a chart library can draw directly.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::current_year;
use crate::{current_user, AppError, AppState, MAX_BODY_SIZE};
use cuotas_core::{models::ChartFilter, MONTH_NAMES};

/// Palette cycled over chart segments
pub const CHART_COLORS: [&str; 10] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    /// Monthly totals for the year
    Line,
    /// Monthly totals for the year
    Bar,
    /// Totals per category
    Doughnut,
    /// Totals per card
    Pie,
}

impl std::str::FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(Self::Line),
            "bar" => Ok(Self::Bar),
            "doughnut" => Ok(Self::Doughnut),
            "pie" => Ok(Self::Pie),
            _ => Err(format!("Unknown chart type: {}", s)),
        }
    }
}

/// Request body for chart data; every field is optional
#[derive(Debug, Default, Deserialize)]
pub struct ChartRequest {
    #[serde(rename = "anio", default)]
    pub year: Option<i32>,
    #[serde(rename = "mes", default)]
    pub month: Option<u32>,
    #[serde(rename = "tarjetaId", default)]
    pub card_id: Option<i64>,
    #[serde(rename = "categorias", default)]
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<Decimal>,
    #[serde(rename = "backgroundColor")]
    pub background_color: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

fn palette(n: usize) -> Vec<&'static str> {
    CHART_COLORS.iter().copied().cycle().take(n).collect()
}

/// Build the chart payload for `chart_type` from the caller's installments
pub fn build_chart(
    state: &AppState,
    user_id: i64,
    chart_type: ChartType,
    filter: &ChartFilter,
) -> Result<ChartData, AppError> {
    let chart = match chart_type {
        ChartType::Line | ChartType::Bar => {
            let totals = state.db.monthly_totals(user_id, filter)?;
            ChartData {
                labels: MONTH_NAMES.iter().map(|m| m.to_string()).collect(),
                datasets: vec![ChartDataset {
                    label: format!("Gastos {}", filter.year),
                    background_color: vec![CHART_COLORS[0]; totals.len()],
                    data: totals,
                }],
            }
        }
        ChartType::Doughnut => {
            let totals = state.db.category_totals(user_id, filter)?;
            ChartData {
                labels: totals.iter().map(|t| t.category_name.clone()).collect(),
                datasets: vec![ChartDataset {
                    label: "Gastos por categoría".to_string(),
                    background_color: palette(totals.len()),
                    data: totals.into_iter().map(|t| t.total).collect(),
                }],
            }
        }
        ChartType::Pie => {
            let totals = state.db.card_totals(user_id, filter)?;
            ChartData {
                labels: totals.iter().map(|t| t.card_name.clone()).collect(),
                datasets: vec![ChartDataset {
                    label: "Gastos por tarjeta".to_string(),
                    background_color: palette(totals.len()),
                    data: totals.into_iter().map(|t| t.total).collect(),
                }],
            }
        }
    };

    Ok(chart)
}

/// POST /gastos/charts/:chart_type - Chart data (line, bar, doughnut, pie)
pub async fn chart_data(
    State(state): State<Arc<AppState>>,
    Path(chart_type): Path<String>,
    request: Request,
) -> Result<Json<ChartData>, AppError> {
    let user = current_user(&request)?;
    let kind: ChartType = chart_type
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;

    // An empty body means "this year, everything"
    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: ChartRequest = if bytes.is_empty() {
        ChartRequest::default()
    } else {
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?
    };

    let filter = ChartFilter {
        year: req.year.unwrap_or_else(current_year),
        month: req.month,
        card_id: req.card_id,
        category_ids: req.category_ids,
    };
    let chart = build_chart(&state, user.id, kind, &filter)?;

    state.db.log_audit(
        Some(user.id),
        "report",
        Some("chart"),
        None,
        Some(&format!("type={}, year={}", chart_type, filter.year)),
    )?;

    Ok(Json(chart))
}
