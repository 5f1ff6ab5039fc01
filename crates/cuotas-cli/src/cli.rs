//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cuotas - Track card expenses and their installments
#[derive(Parser)]
#[command(name = "cuotas")]
#[command(about = "Self-hosted expense and credit-card installment tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "cuotas.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed the shared categories
    Init,

    /// Start the web server
    ///
    /// Requires CUOTAS_JWT_SECRET. Optional: CUOTAS_TOKEN_TTL_HOURS,
    /// CUOTAS_ALLOWED_ORIGINS (comma-separated).
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Run requests without a token as this user id (local development only)
        #[arg(long, value_name = "USER_ID")]
        no_auth_dev_user: Option<i64>,
    },

    /// Manage users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },

    /// Manage banks shared by every user
    Banks {
        #[command(subcommand)]
        action: BanksAction,
    },

    /// Installment reports for one user
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// Register a user
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// Login email
        #[arg(long)]
        email: String,

        /// Password (at least 6 characters)
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
pub enum BanksAction {
    /// Add a bank visible to every user
    Add {
        /// Bank name
        #[arg(long)]
        name: String,

        /// Country code (e.g. AR)
        #[arg(long)]
        country: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Installments due this month, per card
    Month {
        /// User email
        #[arg(long)]
        email: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Monthly installment totals per card for a year
    Annual {
        /// User email
        #[arg(long)]
        email: String,

        /// Year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Unpaid installments due from next month on, for one card
    Pending {
        /// User email
        #[arg(long)]
        email: String,

        /// Credit card id
        #[arg(long)]
        card: i64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Credit limit usage of every card
    Cards {
        /// User email
        #[arg(long)]
        email: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}
