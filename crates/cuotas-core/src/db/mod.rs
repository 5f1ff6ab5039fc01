//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `users` - Registration and credential checks
//! - `banks` - Banks (user-owned and global)
//! - `categories` - Expense categories with soft delete
//! - `cards` - Credit and debit cards
//! - `expenses` - Expense lifecycle and installment regeneration
//! - `installments` - Installment store and listings
//! - `summaries` - Monthly/annual installment rollups
//! - `charts` - Dashboard aggregations
//! - `audit` - API access audit trail

use std::str::FromStr;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::Result;

mod audit;
mod banks;
mod cards;
mod categories;
mod charts;
mod expenses;
mod installments;
mod summaries;
mod users;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Categories every user sees from the start
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Alimentación", "Supermercado, restaurantes y delivery"),
    ("Transporte", "Combustible, transporte público, peajes"),
    ("Servicios", "Luz, gas, agua, internet, telefonía"),
    ("Salud", "Medicina prepaga, farmacia, consultas"),
    ("Educación", "Cursos, libros, cuotas escolares"),
    ("Entretenimiento", "Suscripciones, salidas, viajes"),
    ("Hogar", "Muebles, electrodomésticos, mantenimiento"),
    ("Indumentaria", "Ropa y calzado"),
    ("Otros", "Gastos sin categoría específica"),
];

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Read a money column stored as decimal text
pub(crate) fn get_decimal(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Keep only the trailing four digits of a card number
pub(crate) fn last_four_digits(number: &str) -> Option<String> {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    Some(digits[digits.len() - 4..].iter().collect())
}

/// Case-folding key for name comparisons. SQLite's `LOWER` only folds ASCII,
/// so names are compared here instead of in SQL.
pub(crate) fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) a database file and apply migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| {
                conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` so that every pooled
    /// connection sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "cuotas_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Insert the default global categories that are not present yet
    pub fn seed_default_categories(&self) -> Result<usize> {
        let conn = self.conn()?;
        let mut inserted = 0;

        for (name, description) in DEFAULT_CATEGORIES {
            inserted += conn.execute(
                r#"
                INSERT INTO categories (name, description, user_id)
                SELECT ?1, ?2, NULL
                WHERE NOT EXISTS (
                    SELECT 1 FROM categories
                    WHERE user_id IS NULL AND LOWER(name) = LOWER(?1) AND deleted_at IS NULL
                )
                "#,
                rusqlite::params![name, description],
            )?;
        }

        if inserted > 0 {
            info!("Seeded {} default categories", inserted);
        }
        Ok(inserted)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- user_id NULL marks a global bank
            CREATE TABLE IF NOT EXISTS banks (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                country TEXT,
                user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_banks_user ON banks(user_id);

            -- user_id NULL marks a global category
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                deleted_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);

            -- Money columns hold decimal text, e.g. '1500.75'
            CREATE TABLE IF NOT EXISTS credit_cards (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                bank_id INTEGER NOT NULL REFERENCES banks(id),
                name TEXT NOT NULL,
                last_four TEXT NOT NULL,
                credit_limit TEXT NOT NULL DEFAULT '0',
                closing_day INTEGER NOT NULL CHECK (closing_day BETWEEN 1 AND 31),
                due_day INTEGER NOT NULL CHECK (due_day BETWEEN 1 AND 31),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                deleted_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_credit_cards_user ON credit_cards(user_id);

            CREATE TABLE IF NOT EXISTS debit_cards (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                bank_id INTEGER NOT NULL REFERENCES banks(id),
                name TEXT NOT NULL,
                last_four TEXT NOT NULL,
                available_balance TEXT NOT NULL DEFAULT '0',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                deleted_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_debit_cards_user ON debit_cards(user_id);

            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                credit_card_id INTEGER REFERENCES credit_cards(id),
                debit_card_id INTEGER REFERENCES debit_cards(id),
                amount TEXT NOT NULL,
                date DATE NOT NULL,
                description TEXT,
                is_installment INTEGER NOT NULL DEFAULT 0,
                total_installments INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                deleted_at DATETIME,
                CHECK (credit_card_id IS NULL OR debit_card_id IS NULL)
            );

            CREATE INDEX IF NOT EXISTS idx_expenses_user ON expenses(user_id);
            CREATE INDEX IF NOT EXISTS idx_expenses_credit_card ON expenses(credit_card_id);
            CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);

            CREATE TABLE IF NOT EXISTS installments (
                id INTEGER PRIMARY KEY,
                expense_id INTEGER NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
                number INTEGER NOT NULL,
                amount TEXT NOT NULL,
                due_date DATE NOT NULL,
                paid INTEGER NOT NULL DEFAULT 0,
                UNIQUE (expense_id, number)
            );

            CREATE INDEX IF NOT EXISTS idx_installments_expense ON installments(expense_id);
            CREATE INDEX IF NOT EXISTS idx_installments_due ON installments(due_date);

            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                user_id INTEGER,
                action TEXT NOT NULL,
                entity_type TEXT,
                entity_id INTEGER,
                details TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp);
            "#,
        )?;

        info!("Database schema ready at {}", self.db_path);
        Ok(())
    }
}
