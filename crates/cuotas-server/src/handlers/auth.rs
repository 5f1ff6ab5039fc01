//! Registration, login and caller identity

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::read_json;
use crate::{current_user, issue_token, AppError, AppState};
use cuotas_core::models::{NewUser, User};

/// Request body for logging in
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub user: User,
}

/// POST /auth/register - Create a user account
pub async fn register(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<User>, AppError> {
    let new_user: NewUser = read_json(request).await?;

    let user = state.db.create_user(&new_user)?;
    info!(user_id = user.id, "Registered user");

    state.db.log_audit(
        Some(user.id),
        "register",
        Some("user"),
        Some(user.id),
        None,
    )?;

    Ok(Json(user))
}

/// POST /auth/login - Exchange credentials for an access token
pub async fn login(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<LoginResponse>, AppError> {
    let req: LoginRequest = read_json(request).await?;

    let user = match state.db.verify_credentials(&req.email, &req.password) {
        Ok(user) => user,
        Err(e) => {
            warn!("Failed login attempt");
            state
                .db
                .log_audit(None, "login_failed", Some("user"), None, None)?;
            return Err(e.into());
        }
    };

    let access_token = issue_token(
        &user,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    state
        .db
        .log_audit(Some(user.id), "login", Some("user"), Some(user.id), None)?;

    Ok(Json(LoginResponse { access_token, user }))
}

/// GET /auth/me - The authenticated user
pub async fn me(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<User>, AppError> {
    let caller = current_user(&request)?;

    let user = state.db.get_user(caller.id)?;

    Ok(Json(user))
}
