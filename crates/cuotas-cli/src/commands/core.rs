//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_users_add` / `cmd_banks_add` - Seed users and shared banks

use std::path::Path;

use anyhow::{Context, Result};
use cuotas_core::db::Database;
use cuotas_core::models::{NewUser, User};
use tracing::info;

/// Open (and migrate) the database at `db_path`
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// Look up a user by login email
pub fn resolve_user(db: &Database, email: &str) -> Result<User> {
    db.find_user_by_email(email)?
        .with_context(|| format!("No user with email {}", email))
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;

    let seeded = db
        .seed_default_categories()
        .context("Failed to seed default categories")?;
    println!("   Seeded {} default categories", seeded);

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create a user: cuotas users add --name Ana --email ana@example.com --password ...");
    println!("  2. Start the API: CUOTAS_JWT_SECRET=... cuotas serve");

    Ok(())
}

pub fn cmd_users_add(db: &Database, name: &str, email: &str, password: &str) -> Result<()> {
    let user = db
        .create_user(&NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })
        .context("Failed to create user")?;
    info!(user_id = user.id, "Created user");

    println!("✅ Created user {} <{}> (id {})", user.name, user.email, user.id);

    Ok(())
}

pub fn cmd_banks_add(db: &Database, name: &str, country: Option<&str>) -> Result<()> {
    let bank = db
        .create_global_bank(name, country)
        .context("Failed to create bank")?;

    println!(
        "✅ Added bank {} ({}) (id {})",
        bank.name,
        bank.country.as_deref().unwrap_or("-"),
        bank.id
    );

    Ok(())
}
