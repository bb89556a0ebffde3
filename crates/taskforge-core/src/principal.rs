//! The authenticated identity threaded through every core operation.

use crate::error::{ApiError, Result};

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_USER: &str = "ROLE_USER";

/// The resolved identity of the caller.
///
/// Built by the HTTP layer from the bearer token and passed into the core
/// explicitly; the core never consults ambient authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ROLE_ADMIN)
    }

    /// Endpoint-level role gate for admin-only actions.  Returns the
    /// role-based denial, distinct from the ownership
    /// [`Forbidden`](ApiError::Forbidden) errors the engines raise.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::AccessDenied("Admin role required.".to_string()))
        }
    }

    /// Endpoint-level role gate for actions open to any registered user.
    pub fn require_user(&self) -> Result<()> {
        if self.roles.iter().any(|r| r == ROLE_ADMIN || r == ROLE_USER) {
            Ok(())
        } else {
            Err(ApiError::AccessDenied("User role required.".to_string()))
        }
    }
}
