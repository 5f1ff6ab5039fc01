//! Cuotas Core Library
//!
//! Shared functionality for the Cuotas expense tracker:
//! - Database access and migrations
//! - Installment schedule generation and remaining-installment math
//! - Monthly/annual installment summaries and dashboard aggregations
//! - Password hashing

pub mod auth;
pub mod calendar;
pub mod db;
pub mod error;
pub mod installments;
pub mod models;

pub use calendar::MONTH_NAMES;
pub use db::Database;
pub use error::{Error, Result};
pub use installments::{generate, remaining, InstallmentDraft, MAX_INSTALLMENTS};
