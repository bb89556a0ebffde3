//! Account registration and credential verification.
//!
//! Token issuance lives in the HTTP layer; this module owns everything that
//! touches the user table: uniqueness checks, field validation, password
//! hashing, and the normalized login error that deliberately does not
//! distinguish an unknown account from a wrong password.

use std::sync::OnceLock;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::RngCore;
use regex::Regex;

use taskforge_store::{Database, User};

use crate::dto::RegisterRequest;
use crate::error::{ApiError, Result};
use crate::principal::{Principal, ROLE_USER};

const MIN_PASSWORD_LEN: usize = 8;

/// Single message for both unknown-account and wrong-password failures.
const BAD_CREDENTIALS: &str = "Invalid username or password";

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\w\-.]+@([\w-]+\.)+[\w-]{2,4}$").expect("email pattern is valid")
    })
}

/// Register a new account with the `ROLE_USER` role.
pub fn register(db: &Database, req: &RegisterRequest) -> Result<String> {
    if db.username_exists(&req.username)? {
        return Err(ApiError::Validation("Username is already exists!".to_string()));
    }
    if db.email_exists(&req.email)? {
        return Err(ApiError::Validation("Email is already exists".to_string()));
    }
    if !email_regex().is_match(&req.email) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let user = User {
        id: 0,
        first_name: req.first_name.clone(),
        last_name: req.last_name.clone(),
        username: req.username.clone(),
        email: req.email.clone(),
        password_hash: hash_password(&req.password)?,
        created_at: Utc::now(),
    };
    let user_id = db.insert_user(&user)?;

    let role = db
        .find_role_by_name(ROLE_USER)?
        .ok_or_else(|| ApiError::Internal("ROLE_USER is not seeded".to_string()))?;
    db.assign_role(user_id, role.id)?;

    tracing::info!(username = %req.username, "registered new user");

    Ok("User Registered Successfully!".to_string())
}

/// Verify credentials and return the matching user.
///
/// The caller (HTTP layer) issues the access token from the result.
pub fn authenticate(db: &Database, username_or_email: &str, password: &str) -> Result<User> {
    let user = db
        .find_user_by_username_or_email(username_or_email)?
        .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    if !verify_password(password, &user.password_hash) {
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    Ok(user)
}

/// Resolve a username (e.g. a token subject) into a [`Principal`] with its
/// current role set.
pub fn load_principal(db: &Database, username: &str) -> Result<Principal> {
    let user = db
        .find_user_by_username_or_email(username)?
        .ok_or_else(|| ApiError::Unauthorized("Unknown account".to_string()))?;
    let roles = db.roles_for_user(user.id)?;

    Ok(Principal {
        user_id: user.id,
        username: user.username,
        roles,
    })
}

/// Hash a password into PHC string format with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Verify a password against a stored PHC hash.  A malformed hash counts as
/// a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
