//! Cuotas Web Server
//!
//! Axum-based REST API for the Cuotas expense and installment tracker.
//!
//! Security features:
//! - Bearer token authentication (HS256), every route except register/login
//! - Restrictive CORS policy
//! - Input validation (pagination limits, body size limits)
//! - Audit logging for all authenticated API access
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use cuotas_core::db::Database;

mod handlers;
pub mod token;

pub use token::{issue_token, verify_token, AuthUser, Claims};

/// Maximum JSON body size (10 KB)
pub const MAX_BODY_SIZE: usize = 10 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Default pagination limit
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct ServerConfig {
    /// HMAC secret for signing access tokens
    pub jwt_secret: String,
    /// Access token lifetime
    pub token_ttl_hours: i64,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Treat unauthenticated requests as this user (local development only)
    pub dev_user_id: Option<i64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: 24,
            allowed_origins: vec![],
            dev_user_id: None,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
}

/// Authentication middleware - validates the bearer token and stores the caller
///
/// A missing or invalid token is rejected with 401, unless `dev_user_id` is
/// configured, in which case requests without any token run as that user.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    match bearer {
        Some(token) => match verify_token(&token, &state.config.jwt_secret) {
            Ok(user) => {
                request.extensions_mut().insert(user);
                return next.run(request).await;
            }
            Err(e) => {
                warn!(path = %request.uri().path(), error = %e, "Rejected bearer token");
            }
        },
        None => {
            if let Some(id) = state.config.dev_user_id {
                request.extensions_mut().insert(AuthUser {
                    id,
                    email: "dev@localhost".to_string(),
                });
                return next.run(request).await;
            }
            warn!(path = %request.uri().path(), "Unauthorized request - no bearer token");
        }
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Get the authenticated caller stored by the auth middleware
pub fn current_user(request: &Request) -> Result<AuthUser, AppError> {
    request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::unauthorized("Authentication required"))
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });

    let public_routes = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login));

    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::me))
        // Banks
        .route("/banco", get(handlers::list_banks).post(handlers::create_bank))
        .route(
            "/banco/:id",
            get(handlers::get_bank)
                .put(handlers::update_bank)
                .delete(handlers::delete_bank),
        )
        // Categories
        .route(
            "/categoria",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categoria/:id",
            get(handlers::get_category)
                .patch(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route("/categoria/:id/restaurar", post(handlers::restore_category))
        // Credit cards
        .route(
            "/tarjetas-credito",
            get(handlers::list_credit_cards).post(handlers::create_credit_card),
        )
        .route("/tarjetas-credito/resumen", get(handlers::credit_card_overview))
        .route(
            "/tarjetas-credito/:id",
            get(handlers::get_credit_card)
                .put(handlers::update_credit_card)
                .delete(handlers::delete_credit_card),
        )
        .route(
            "/tarjetas-credito/:id/detalle",
            get(handlers::credit_card_detail),
        )
        .route(
            "/tarjetas-credito/:id/movimientos",
            get(handlers::credit_card_movements),
        )
        // Debit cards
        .route(
            "/tarjetas-debito",
            get(handlers::list_debit_cards).post(handlers::create_debit_card),
        )
        .route(
            "/tarjetas-debito/:id",
            get(handlers::get_debit_card)
                .put(handlers::update_debit_card)
                .delete(handlers::delete_debit_card),
        )
        // Expenses
        .route(
            "/gastos",
            get(handlers::list_expenses).post(handlers::create_expense),
        )
        .route(
            "/gastos/:id",
            get(handlers::get_expense)
                .put(handlers::update_expense)
                .delete(handlers::delete_expense),
        )
        .route(
            "/gastos/por-tarjeta/:tarjeta_id",
            get(handlers::list_card_expenses),
        )
        .route(
            "/gastos/dashboard/tarjetas",
            get(handlers::list_dashboard_expenses),
        )
        .route(
            "/gastos/mensuales/:tarjeta_id",
            get(handlers::list_card_installment_rows),
        )
        .route("/gastos/charts/:chart_type", post(handlers::chart_data))
        // Installments
        .route("/Cuota", get(handlers::list_installments))
        .route("/Cuota/resumen", get(handlers::monthly_card_totals))
        .route("/Cuota/resumen-anual", get(handlers::annual_card_summary))
        .route(
            "/Cuota/resumen-general-anual",
            get(handlers::general_annual_summary),
        )
        .route(
            "/Cuota/resumen-tarjeta/:tarjeta_id",
            get(handlers::card_monthly_breakdown),
        )
        .route(
            "/Cuota/pendientes-futuras/:tarjeta_id",
            get(handlers::pending_future_installments),
        )
        .route(
            "/Cuota/gasto/:gasto_id",
            get(handlers::list_expense_installments),
        )
        .route("/Cuota/:id/pagar", patch(handlers::pay_installment))
        // Audit
        .route("/auditoria", get(handlers::list_audit_log))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if config.jwt_secret.is_empty() {
        anyhow::bail!("A JWT secret is required to start the server");
    }
    if let Some(id) = config.dev_user_id {
        warn!(
            "⚠️  Unauthenticated requests run as user {} - do not expose to network!",
            id
        );
    }

    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Error handling
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        // Domain errors carry a client-safe message and a status of their own
        if let Some(core) = err.downcast_ref::<cuotas_core::Error>() {
            let status = match core {
                cuotas_core::Error::NotFound(_) => Some(StatusCode::NOT_FOUND),
                cuotas_core::Error::Validation(_) => Some(StatusCode::BAD_REQUEST),
                cuotas_core::Error::Conflict(_) => Some(StatusCode::CONFLICT),
                cuotas_core::Error::Auth(_) => Some(StatusCode::UNAUTHORIZED),
                _ => None,
            };
            if let Some(status) = status {
                return Self::with_status(status, &core.to_string());
            }
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
