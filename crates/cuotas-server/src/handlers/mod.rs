//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod audit;
pub mod auth;
pub mod banks;
pub mod categories;
pub mod charts;
pub mod credit_cards;
pub mod debit_cards;
pub mod expenses;
pub mod installments;

// Re-export all handlers for use in router
pub use audit::*;
pub use auth::*;
pub use banks::*;
pub use categories::*;
pub use charts::*;
pub use credit_cards::*;
pub use debit_cards::*;
pub use expenses::*;
pub use installments::*;

use axum::extract::Request;
use chrono::{Datelike, NaiveDate, Utc};
use serde::de::DeserializeOwned;

use crate::{AppError, DEFAULT_PAGE_LIMIT, MAX_BODY_SIZE, MAX_PAGE_LIMIT};

/// Read and parse a JSON request body
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))
}

/// Current calendar date (UTC)
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn current_year() -> i32 {
    today().year()
}

/// Clamp client pagination to `(page >= 1, 1..=MAX_PAGE_LIMIT)`
pub(crate) fn page_params(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    (page, limit)
}
