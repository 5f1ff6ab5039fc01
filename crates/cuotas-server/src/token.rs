//! HS256 access tokens

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use cuotas_core::models::User;

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a string
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller, placed in request extensions by the auth middleware
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
}

/// Sign an access token for `user` valid for `ttl_hours`
pub fn issue_token(
    user: &User,
    secret: &str,
    ttl_hours: i64,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate signature and expiry, returning the caller identity
pub fn verify_token(token: &str, secret: &str) -> Result<AuthUser, String> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| format!("Invalid token: {}", e))?;

    let id = data
        .claims
        .sub
        .parse::<i64>()
        .map_err(|_| "Token subject is not a user id".to_string())?;

    Ok(AuthUser {
        id,
        email: data.claims.email,
    })
}
