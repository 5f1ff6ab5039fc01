//! Audit log handlers

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    Json,
};
use serde::Deserialize;

use crate::{current_user, AppError, AppState};
use cuotas_core::models::AuditEntry;

/// Query parameters for audit log
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_audit_limit")]
    pub limit: i64,
}

fn default_audit_limit() -> i64 {
    100
}

/// GET /auditoria - List the caller's audit log entries
pub async fn list_audit_log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQuery>,
    request: Request,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let user = current_user(&request)?;
    let limit = params.limit.clamp(1, 1000);

    let entries = state.db.list_audit_log(user.id, limit)?;

    // Audit log - viewing the audit log itself
    state.db.log_audit(
        Some(user.id),
        "list",
        Some("audit_log"),
        None,
        Some(&format!("limit={}", limit)),
    )?;

    Ok(Json(entries))
}
