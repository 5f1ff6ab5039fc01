//! CLI command tests

use cuotas_core::db::Database;
use cuotas_core::models::{NewBank, NewCreditCard, NewExpense};
use tempfile::TempDir;

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    let db = Database::in_memory().unwrap();
    db.seed_default_categories().unwrap();
    db
}

/// Register a user with one card and a 3-installment expense, returning the card id
fn seed_user_with_expense(db: &Database, email: &str) -> i64 {
    commands::cmd_users_add(db, "Ana", email, "hunter22").unwrap();
    let user = commands::resolve_user(db, email).unwrap();

    let bank = db
        .create_bank(
            user.id,
            &NewBank {
                name: "Macro".into(),
                country: None,
            },
        )
        .unwrap();
    let card = db
        .create_credit_card(
            user.id,
            &NewCreditCard {
                bank_id: bank.id,
                name: "Visa".into(),
                number: "4111111111111111".into(),
                credit_limit: 100000.into(),
                closing_day: 20,
                due_day: 1,
            },
        )
        .unwrap();
    let category = db.list_categories(user.id).unwrap()[0].id;
    db.create_expense(
        user.id,
        &NewExpense {
            amount: 300.into(),
            date: chrono::Utc::now().date_naive(),
            description: Some("Zapatillas".into()),
            category_id: category,
            credit_card_id: Some(card.id),
            debit_card_id: None,
            installments: Some(3),
        },
    )
    .unwrap();

    card.id
}

// ========== Core Command Tests ==========

#[test]
fn test_cmd_init_creates_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cuotas.db");

    commands::cmd_init(&path).unwrap();
    assert!(path.exists());

    // Running it twice keeps a single copy of each category
    commands::cmd_init(&path).unwrap();
    let db = commands::open_db(&path).unwrap();
    assert_eq!(db.seed_default_categories().unwrap(), 0);
}

#[test]
fn test_cmd_users_add() {
    let db = setup_test_db();
    commands::cmd_users_add(&db, "Ana", "ana@example.com", "hunter22").unwrap();

    let user = commands::resolve_user(&db, "ana@example.com").unwrap();
    assert_eq!(user.name, "Ana");
}

#[test]
fn test_cmd_users_add_duplicate_fails() {
    let db = setup_test_db();
    commands::cmd_users_add(&db, "Ana", "ana@example.com", "hunter22").unwrap();
    assert!(commands::cmd_users_add(&db, "Ana", "ana@example.com", "hunter22").is_err());
}

#[test]
fn test_cmd_users_add_short_password_fails() {
    let db = setup_test_db();
    assert!(commands::cmd_users_add(&db, "Ana", "ana@example.com", "abc").is_err());
}

#[test]
fn test_resolve_unknown_user() {
    let db = setup_test_db();
    let err = commands::resolve_user(&db, "nobody@example.com").unwrap_err();
    assert!(err.to_string().contains("nobody@example.com"));
}

#[test]
fn test_cmd_banks_add_is_visible_to_users() {
    let db = setup_test_db();
    commands::cmd_banks_add(&db, "Nación", Some("AR")).unwrap();
    commands::cmd_users_add(&db, "Ana", "ana@example.com", "hunter22").unwrap();
    let user = commands::resolve_user(&db, "ana@example.com").unwrap();

    let banks = db.list_banks(user.id).unwrap();
    assert!(banks.iter().any(|b| b.name == "Nación" && b.user_id.is_none()));
}

// ========== Report Command Tests ==========

#[test]
fn test_report_commands_with_data() {
    let db = setup_test_db();
    let card_id = seed_user_with_expense(&db, "ana@example.com");

    for json in [false, true] {
        commands::cmd_report_month(&db, "ana@example.com", json).unwrap();
        commands::cmd_report_annual(&db, "ana@example.com", None, json).unwrap();
        commands::cmd_report_pending(&db, "ana@example.com", card_id, json).unwrap();
        commands::cmd_report_cards(&db, "ana@example.com", json).unwrap();
    }
}

#[test]
fn test_report_commands_empty() {
    let db = setup_test_db();
    commands::cmd_users_add(&db, "Bruno", "bruno@example.com", "hunter22").unwrap();

    commands::cmd_report_month(&db, "bruno@example.com", false).unwrap();
    commands::cmd_report_annual(&db, "bruno@example.com", Some(2024), false).unwrap();
    commands::cmd_report_pending(&db, "bruno@example.com", 1, false).unwrap();
    commands::cmd_report_cards(&db, "bruno@example.com", false).unwrap();
}

#[test]
fn test_report_unknown_user_fails() {
    let db = setup_test_db();
    assert!(commands::cmd_report_annual(&db, "ghost@example.com", None, false).is_err());
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("Visa", 10), "Visa");
    assert_eq!(truncate("Mastercard Black", 10), "Masterc...");
    assert_eq!(truncate("Heladería", 9), "Heladería");
}
