//! Cuotas CLI - Expense and installment tracker
//!
//! Usage:
//!   cuotas init                               Initialize database
//!   cuotas users add --name N --email E ...   Register a user
//!   cuotas report annual --email E            Installment totals for the year
//!   cuotas serve --port 3000                  Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Serve {
            port,
            host,
            no_auth_dev_user,
        } => commands::cmd_serve(&cli.db, &host, port, no_auth_dev_user).await,
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                UsersAction::Add {
                    name,
                    email,
                    password,
                } => commands::cmd_users_add(&db, &name, &email, &password),
            }
        }
        Commands::Banks { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                BanksAction::Add { name, country } => {
                    commands::cmd_banks_add(&db, &name, country.as_deref())
                }
            }
        }
        Commands::Report { report_type } => {
            let db = commands::open_db(&cli.db)?;
            match report_type {
                ReportType::Month { email, json } => {
                    commands::cmd_report_month(&db, &email, json)
                }
                ReportType::Annual { email, year, json } => {
                    commands::cmd_report_annual(&db, &email, year, json)
                }
                ReportType::Pending { email, card, json } => {
                    commands::cmd_report_pending(&db, &email, card, json)
                }
                ReportType::Cards { email, json } => {
                    commands::cmd_report_cards(&db, &email, json)
                }
            }
        }
    }
}
