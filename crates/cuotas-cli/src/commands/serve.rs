//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    dev_user_id: Option<i64>,
) -> Result<()> {
    let jwt_secret = std::env::var("CUOTAS_JWT_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
        .context("CUOTAS_JWT_SECRET must be set to sign access tokens")?;

    let token_ttl_hours = match std::env::var("CUOTAS_TOKEN_TTL_HOURS") {
        Ok(v) => v
            .parse::<i64>()
            .context("CUOTAS_TOKEN_TTL_HOURS must be a whole number of hours")?,
        Err(_) => 24,
    };

    // Parse allowed CORS origins from environment (comma-separated)
    let allowed_origins: Vec<String> = std::env::var("CUOTAS_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    println!("🚀 Starting Cuotas web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    println!("   🔒 Authentication: bearer tokens ({}h lifetime)", token_ttl_hours);
    if !allowed_origins.is_empty() {
        println!("   🌐 CORS origins: {}", allowed_origins.join(", "));
    }
    if let Some(id) = dev_user_id {
        println!();
        println!(
            "   ⚠️  Requests without a token run as user {} - do not expose to network!",
            id
        );
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path)?;

    // Shared categories are idempotent
    db.seed_default_categories()
        .context("Failed to seed default categories")?;

    let config = cuotas_server::ServerConfig {
        jwt_secret,
        token_ttl_hours,
        allowed_origins,
        dev_user_id,
    };

    cuotas_server::serve_with_config(db, host, port, config).await
}
