//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use cuotas_core::db::Database;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const TEST_SECRET: &str = "test-secret";

fn setup_test_app() -> Router {
    let db = Database::in_memory().unwrap();
    db.seed_default_categories().unwrap();
    let config = ServerConfig {
        jwt_secret: TEST_SECRET.to_string(),
        ..Default::default()
    };
    create_router(db, config)
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> axum::response::Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };

    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

/// Register and log in, returning the access token
async fn login_as(app: &Router, email: &str) -> String {
    let response = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"nombre": "Test", "email": email, "password": "hunter22"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": email, "password": "hunter22"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    json["accessToken"].as_str().unwrap().to_string()
}

/// Create a bank and credit card, returning the card id
async fn create_card(app: &Router, token: &str) -> i64 {
    let bank = get_body_json(
        send(
            app,
            "POST",
            "/banco",
            Some(token),
            Some(json!({"nombre": "Galicia", "pais": "AR"})),
        )
        .await,
    )
    .await;

    let response = send(
        app,
        "POST",
        "/tarjetas-credito",
        Some(token),
        Some(json!({
            "bancoId": bank["id"],
            "nombreTarjeta": "Visa Gold",
            "numeroTarjeta": "4111 1111 1111 1234",
            "limiteCredito": 200000,
            "diaCierre": 25,
            "diaVencimiento": 5
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let card = get_body_json(response).await;
    assert_eq!(card["ultimosDigitos"], "1234");
    card["id"].as_i64().unwrap()
}

async fn category_id(app: &Router, token: &str, name: &str) -> i64 {
    let json = get_body_json(send(app, "GET", "/categoria", Some(token), None).await).await;
    json.as_array()
        .unwrap()
        .iter()
        .find(|c| c["nombre"] == name)
        .unwrap()["id"]
        .as_i64()
        .unwrap()
}

async fn create_installment_expense(app: &Router, token: &str, card_id: i64) -> Value {
    let category = category_id(app, token, "Hogar").await;
    let response = send(
        app,
        "POST",
        "/gastos",
        Some(token),
        Some(json!({
            "monto": 1500.75,
            "fecha": "2025-04-14",
            "descripcion": "Heladera",
            "categoriaGastoId": category,
            "tarjetaCreditoId": card_id,
            "numeroCuotas": 3
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    get_body_json(response).await
}

// ========== Auth Tests ==========

#[tokio::test]
async fn test_register_login_me() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;

    let response = send(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["email"], "ana@example.com");
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
async fn test_duplicate_email_conflict() {
    let app = setup_test_app();
    login_as(&app, "ana@example.com").await;

    let response = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"nombre": "Otra", "email": "ana@example.com", "password": "hunter22"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_wrong_password_unauthorized() {
    let app = setup_test_app();
    login_as(&app, "ana@example.com").await;

    let response = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": "ana@example.com", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = setup_test_app();

    let response = send(&app, "GET", "/gastos", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, "GET", "/gastos", Some("not-a-jwt"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Authentication required");
}

#[tokio::test]
async fn test_dev_user_bypasses_token() {
    let db = Database::in_memory().unwrap();
    let user = db
        .create_user(&cuotas_core::models::NewUser {
            name: "Dev".into(),
            email: "dev@example.com".into(),
            password: "hunter22".into(),
        })
        .unwrap();
    let app = create_router(
        db,
        ServerConfig {
            jwt_secret: TEST_SECRET.to_string(),
            dev_user_id: Some(user.id),
            ..Default::default()
        },
    );

    let response = send(&app, "GET", "/auth/me", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["id"], user.id);
}

#[tokio::test]
async fn test_security_headers() {
    let app = setup_test_app();

    let response = send(&app, "POST", "/auth/login", None, Some(json!({}))).await;
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}

// ========== Expense Tests ==========

#[tokio::test]
async fn test_create_expense_generates_installments() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;
    let card_id = create_card(&app, &token).await;

    let expense = create_installment_expense(&app, &token, card_id).await;
    assert_eq!(expense["esEnCuotas"], true);
    assert_eq!(expense["cuotas"], 3);
    assert_eq!(expense["nameCard"], "Visa Gold");

    let uri = format!("/Cuota/gasto/{}", expense["id"]);
    let response = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let installments = json.as_array().unwrap();
    assert_eq!(installments.len(), 3);
    assert_eq!(installments[0]["monto"].as_f64(), Some(500.25));
    assert_eq!(installments[0]["fechaVencimiento"], "2025-04-14");
    assert_eq!(installments[2]["fechaVencimiento"], "2025-06-14");
}

#[tokio::test]
async fn test_expense_with_both_cards_rejected() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;
    let card_id = create_card(&app, &token).await;
    let category = category_id(&app, &token, "Alimentación").await;

    let response = send(
        &app,
        "POST",
        "/gastos",
        Some(&token),
        Some(json!({
            "monto": 100,
            "fecha": "2025-04-14",
            "categoriaGastoId": category,
            "tarjetaCreditoId": card_id,
            "tarjetaDebitoId": 1
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was written
    let json = get_body_json(send(&app, "GET", "/gastos", Some(&token), None).await).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_json_rejected() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/gastos")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Invalid JSON");
}

#[tokio::test]
async fn test_other_users_expense_not_found() {
    let app = setup_test_app();
    let ana = login_as(&app, "ana@example.com").await;
    let bruno = login_as(&app, "bruno@example.com").await;
    let card_id = create_card(&app, &ana).await;
    let expense = create_installment_expense(&app, &ana, card_id).await;

    let uri = format!("/gastos/{}", expense["id"]);
    let response = send(&app, "GET", &uri, Some(&bruno), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "DELETE", &uri, Some(&bruno), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let uri = format!("/Cuota/gasto/{}", expense["id"]);
    let response = send(&app, "GET", &uri, Some(&bruno), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_users_category_and_card_not_found() {
    let app = setup_test_app();
    let ana = login_as(&app, "ana@example.com").await;
    let bruno = login_as(&app, "bruno@example.com").await;
    let card_id = create_card(&app, &ana).await;
    let category = get_body_json(
        send(
            &app,
            "POST",
            "/categoria",
            Some(&ana),
            Some(json!({"nombre": "Mascotas"})),
        )
        .await,
    )
    .await;

    let uri = format!("/categoria/{}", category["id"]);
    let response = send(&app, "GET", &uri, Some(&bruno), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(
        &app,
        "PATCH",
        &uri,
        Some(&bruno),
        Some(json!({"nombre": "Robada"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&app, "DELETE", &uri, Some(&bruno), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let uri = format!("/tarjetas-credito/{}", card_id);
    let response = send(&app, "GET", &uri, Some(&bruno), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(
        &app,
        "PUT",
        &uri,
        Some(&bruno),
        Some(json!({"limiteCredito": 1})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&app, "DELETE", &uri, Some(&bruno), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Still intact for the owner
    let response = send(&app, "GET", &uri, Some(&ana), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let card = get_body_json(response).await;
    assert_eq!(card["limiteCredito"].as_f64(), Some(200000.0));
    let uri = format!("/categoria/{}", category["id"]);
    let response = send(&app, "GET", &uri, Some(&ana), None).await;
    assert_eq!(get_body_json(response).await["nombre"], "Mascotas");
}

#[tokio::test]
async fn test_category_name_clash_ignores_accented_case() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;

    let response = send(
        &app,
        "POST",
        "/categoria",
        Some(&token),
        Some(json!({"nombre": "EDUCACIÓN"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_expense_regenerates_installments() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;
    let card_id = create_card(&app, &token).await;
    let expense = create_installment_expense(&app, &token, card_id).await;

    let uri = format!("/gastos/{}", expense["id"]);
    let response = send(&app, "PUT", &uri, Some(&token), Some(json!({"numeroCuotas": 2}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["cuotas"], 2);

    let uri = format!("/Cuota/gasto/{}", expense["id"]);
    let json = get_body_json(send(&app, "GET", &uri, Some(&token), None).await).await;
    let installments = json.as_array().unwrap();
    assert_eq!(installments.len(), 2);
    assert_eq!(installments[1]["monto"].as_f64(), Some(750.38));
}

#[tokio::test]
async fn test_delete_expense() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;
    let card_id = create_card(&app, &token).await;
    let expense = create_installment_expense(&app, &token, card_id).await;

    let uri = format!("/gastos/{}", expense["id"]);
    let response = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = get_body_json(
        send(&app, "GET", "/Cuota/resumen-anual?anio=2025", Some(&token), None).await,
    )
    .await;
    assert_eq!(json["totalGeneral"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn test_card_expenses_pagination_and_sort() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;
    let card_id = create_card(&app, &token).await;
    let category = category_id(&app, &token, "Alimentación").await;

    for (amount, date) in [(100, "2025-01-10"), (300, "2025-02-10"), (200, "2025-03-10")] {
        let response = send(
            &app,
            "POST",
            "/gastos",
            Some(&token),
            Some(json!({
                "monto": amount,
                "fecha": date,
                "categoriaGastoId": category,
                "tarjetaCreditoId": card_id
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let uri = format!(
        "/gastos/por-tarjeta/{}?sortField=monto&sortDirection=desc&page=1&limit=2",
        card_id
    );
    let json = get_body_json(send(&app, "GET", &uri, Some(&token), None).await).await;
    assert_eq!(json["total"], 3);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["monto"].as_f64(), Some(300.0));
    assert_eq!(data[1]["monto"].as_f64(), Some(200.0));

    let uri = format!("/gastos/por-tarjeta/{}?sortField=color", card_id);
    let response = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Installment Tests ==========

#[tokio::test]
async fn test_annual_summaries() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;
    let card_id = create_card(&app, &token).await;
    create_installment_expense(&app, &token, card_id).await;

    let json = get_body_json(
        send(&app, "GET", "/Cuota/resumen-anual?anio=2025", Some(&token), None).await,
    )
    .await;
    let cards = json["resumenPorTarjeta"].as_array().unwrap();
    assert_eq!(cards.len(), 1);
    let months = cards[0]["resumenMensual"].as_array().unwrap();
    assert_eq!(months.len(), 12);
    assert_eq!(months[3]["totalCuotas"].as_f64(), Some(500.25));
    assert_eq!(months[6]["totalCuotas"].as_f64(), Some(0.0));
    assert_eq!(json["totalGeneral"].as_f64(), Some(1500.75));

    let json = get_body_json(
        send(
            &app,
            "GET",
            "/Cuota/resumen-general-anual?anio=2025",
            Some(&token),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(json["anio"], 2025);
    assert_eq!(json["totalAnual"].as_f64(), Some(1500.75));

    let uri = format!("/Cuota/resumen-tarjeta/{}?anio=2025", card_id);
    let json = get_body_json(send(&app, "GET", &uri, Some(&token), None).await).await;
    let months = json["resumenMensual"].as_array().unwrap();
    assert_eq!(months[3]["gastoActual"].as_f64(), Some(500.25));
    assert_eq!(months[4]["montoCuotas"].as_f64(), Some(500.25));
    assert_eq!(json["banco"], "Galicia");
}

#[tokio::test]
async fn test_pay_installment_and_filter() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;
    let card_id = create_card(&app, &token).await;
    let expense = create_installment_expense(&app, &token, card_id).await;

    let uri = format!("/Cuota/gasto/{}", expense["id"]);
    let json = get_body_json(send(&app, "GET", &uri, Some(&token), None).await).await;
    let first_id = json[0]["id"].as_i64().unwrap();

    let uri = format!("/Cuota/{}/pagar", first_id);
    let response = send(&app, "PATCH", &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(send(&app, "GET", "/Cuota?pagada=true", Some(&token), None).await).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["data"][0]["id"], first_id);
    assert_eq!(json["data"][0]["totalCuotas"], 3);

    let json =
        get_body_json(send(&app, "GET", "/Cuota?pagada=false", Some(&token), None).await).await;
    assert_eq!(json["total"], 2);

    // Unknown installments still answer success
    let response = send(&app, "PATCH", "/Cuota/99999/pagar", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["success"], true);
}

#[tokio::test]
async fn test_pending_future_for_foreign_card_is_empty() {
    let app = setup_test_app();
    let ana = login_as(&app, "ana@example.com").await;
    let bruno = login_as(&app, "bruno@example.com").await;
    let card_id = create_card(&app, &ana).await;

    let uri = format!("/Cuota/pendientes-futuras/{}", card_id);
    let response = send(&app, "GET", &uri, Some(&bruno), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert!(json["detalles"].as_array().unwrap().is_empty());
    assert_eq!(json["totalGeneral"].as_f64(), Some(0.0));
}

// ========== Chart Tests ==========

#[tokio::test]
async fn test_line_chart_has_month_labels() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;
    let card_id = create_card(&app, &token).await;
    create_installment_expense(&app, &token, card_id).await;

    let response = send(
        &app,
        "POST",
        "/gastos/charts/line",
        Some(&token),
        Some(json!({"anio": 2025})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["labels"][0], "Enero");
    assert_eq!(json["labels"].as_array().unwrap().len(), 12);
    assert_eq!(json["datasets"][0]["data"][4].as_f64(), Some(500.25));
}

#[tokio::test]
async fn test_doughnut_chart_by_category() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;
    let card_id = create_card(&app, &token).await;
    create_installment_expense(&app, &token, card_id).await;

    let response = send(
        &app,
        "POST",
        "/gastos/charts/doughnut",
        Some(&token),
        Some(json!({"anio": 2025, "mes": 4})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["labels"][0], "Hogar");
    assert_eq!(json["datasets"][0]["data"][0].as_f64(), Some(500.25));
    assert_eq!(
        json["datasets"][0]["backgroundColor"][0],
        handlers::CHART_COLORS[0]
    );
}

#[tokio::test]
async fn test_unknown_chart_type_rejected() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;

    let response = send(&app, "POST", "/gastos/charts/radar", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Other Resources ==========

#[tokio::test]
async fn test_bank_in_use_cannot_be_deleted() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;
    let card_id = create_card(&app, &token).await;

    let card = get_body_json(
        send(
            &app,
            "GET",
            &format!("/tarjetas-credito/{}", card_id),
            Some(&token),
            None,
        )
        .await,
    )
    .await;

    let uri = format!("/banco/{}", card["bancoId"]);
    let response = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_category_soft_delete_and_restore() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;

    let category = get_body_json(
        send(
            &app,
            "POST",
            "/categoria",
            Some(&token),
            Some(json!({"nombre": "Mascotas"})),
        )
        .await,
    )
    .await;
    let uri = format!("/categoria/{}", category["id"]);

    let response = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "POST", &format!("{}/restaurar", uri), Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["nombre"], "Mascotas");
}

#[tokio::test]
async fn test_audit_log_records_calls() {
    let app = setup_test_app();
    let token = login_as(&app, "ana@example.com").await;
    create_card(&app, &token).await;

    let json = get_body_json(send(&app, "GET", "/auditoria?limit=10", Some(&token), None).await).await;
    let actions: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["action"].as_str())
        .collect();
    assert!(actions.contains(&"login"));
    assert!(actions.contains(&"create"));
}
