//! Authentication middleware
//!
//! Verifies the HS256 bearer token issued by the login service and exposes
//! the tenant identity to handlers. Tokens are trusted once verified.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

use crate::error::AppError;
use crate::state::AppState;

/// Database connection wrapper for use in handlers via Extension
#[derive(Clone)]
pub struct DbConn(pub DatabaseConnection);

impl Deref for DbConn {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Tenant id
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Extension to store current tenant in request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = String;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| format!("invalid subject: {}", claims.sub))?;
        Ok(Self {
            id,
            email: claims.email.unwrap_or_default(),
            name: claims.name.unwrap_or_default(),
        })
    }
}

/// Verify a bearer token and extract the tenant it names
pub fn verify_token(token: &str, secret: &str) -> Result<CurrentUser, String> {
    if secret.is_empty() {
        return Err("jwt secret is not configured".to_string());
    }

    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| format!("Failed to verify JWT: {}", e))?;

    CurrentUser::try_from(data.claims)
}

/// Paths that don't require authentication
fn is_public_path(path: &str) -> bool {
    !path.starts_with("/api") || path == "/api/health"
}

fn unauthorized(reason: &str) -> Response {
    AppError::Unauthorized(reason.to_string()).into_response()
}

/// Authentication middleware
pub async fn auth_layer(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // Make the pool available to all handlers via Extension<DbConn>
    request.extensions_mut().insert(DbConn(state.db.clone()));

    if is_public_path(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(TypedHeader(bearer)) = bearer else {
        return unauthorized("missing bearer token");
    };

    match verify_token(bearer.token(), &state.config.auth.jwt_secret) {
        Ok(current_user) => {
            request.extensions_mut().insert(current_user);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!("Rejected token for {}: {}", request.uri().path(), e);
            unauthorized("invalid token")
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const SECRET: &str = "test-secret";

    /// Sign a token the way the login service does
    pub fn token_for(tenant_id: &str, secret: &str, exp: usize) -> String {
        let claims = Claims {
            sub: tenant_id.to_string(),
            exp,
            email: Some("owner@example.com".to_string()),
            name: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    pub fn valid_token(tenant_id: i64) -> String {
        let exp = (chrono::Utc::now().timestamp() + 3600) as usize;
        token_for(&tenant_id.to_string(), SECRET, exp)
    }

    #[test]
    fn accepts_valid_token() {
        let user = verify_token(&valid_token(42), SECRET).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.email, "owner@example.com");
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let exp = (chrono::Utc::now().timestamp() + 3600) as usize;
        assert!(verify_token(&token_for("1", "other", exp), SECRET).is_err());

        let expired = (chrono::Utc::now().timestamp() - 3600) as usize;
        assert!(verify_token(&token_for("1", SECRET, expired), SECRET).is_err());
    }

    #[test]
    fn rejects_non_numeric_subject_and_missing_secret() {
        let exp = (chrono::Utc::now().timestamp() + 3600) as usize;
        assert!(verify_token(&token_for("alice", SECRET, exp), SECRET).is_err());
        assert!(verify_token(&valid_token(1), "").is_err());
    }

    #[test]
    fn public_paths() {
        assert!(is_public_path("/api/health"));
        assert!(is_public_path("/index.html"));
        assert!(!is_public_path("/api/catalog"));
    }
}
