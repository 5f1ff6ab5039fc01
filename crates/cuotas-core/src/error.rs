//! Error types for Cuotas

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Request rejected before any write (bad amount, two cards, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing row, or a row owned by another user
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

pub type Result<T> = std::result::Result<T, Error>;
