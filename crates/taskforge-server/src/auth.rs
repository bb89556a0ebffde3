//! Bearer-token issuance and the authenticated-request extractor.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use taskforge_core::{auth, ApiError, Principal};

use crate::api::AppState;
use crate::error::ApiFailure;

/// HS256 key pair derived from the configured secret.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the authenticated account.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign an access token for the given username.
pub fn issue_token(keys: &JwtKeys, username: &str, ttl_secs: i64) -> Result<String, ApiFailure> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: username.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|e| ApiFailure(ApiError::Internal(e.to_string())))
}

/// Extractor that authenticates the request from its `Authorization:
/// Bearer` header and resolves the account's current roles.
pub struct AuthPrincipal(pub Principal);

impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = ApiFailure;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("Expected a Bearer token"))?;

        let data = decode::<Claims>(token, &state.jwt.decoding, &Validation::default())
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        // Roles are read fresh on every request so a revoked grant takes
        // effect before the token expires.
        let db = state.db()?;
        let principal = auth::load_principal(&db, &data.claims.sub).map_err(ApiFailure)?;
        Ok(AuthPrincipal(principal))
    }
}

fn unauthorized(message: &str) -> ApiFailure {
    ApiFailure(ApiError::Unauthorized(message.to_string()))
}
