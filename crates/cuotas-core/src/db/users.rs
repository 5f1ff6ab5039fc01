//! User operations

use rusqlite::{params, OptionalExtension};
use tracing::{info, warn};

use super::{parse_datetime, Database};
use crate::auth::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::error::{Error, Result};
use crate::models::{NewUser, User};

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let created_at_str: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Register a user. Emails are unique regardless of case.
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let name = new.name.trim();
        let email = new.email.trim().to_lowercase();

        if name.is_empty() {
            return Err(Error::Validation("Name is required".into()));
        }
        if !email.contains('@') {
            return Err(Error::Validation(format!("Invalid email: {}", email)));
        }
        if new.password.len() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let conn = self.conn()?;
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)",
            params![email],
            |row| row.get(0),
        )?;
        if taken {
            return Err(Error::Conflict(format!("Email {} is already registered", email)));
        }

        let hash = hash_password(&new.password)?;
        conn.execute(
            "INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?)",
            params![name, email, hash],
        )?;
        let id = conn.last_insert_rowid();
        info!(user_id = id, "Registered user");

        self.get_user(id)
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<User> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?",
            params![id],
            row_to_user,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("User {}", id)))
    }

    /// Look up a user by email (case-insensitive)
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
                params![email.trim().to_lowercase()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Check an email/password pair.
    ///
    /// Unknown email and wrong password produce the same error.
    pub fn verify_credentials(&self, email: &str, password: &str) -> Result<User> {
        let invalid = || Error::Auth("Invalid email or password".into());

        let user = self.find_user_by_email(email)?.ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "Rejected login: wrong password");
            return Err(invalid());
        }
        Ok(user)
    }
}
