//! # taskforge-core
//!
//! Business logic for the taskforge backend: the todo and todo-item
//! lifecycle engines, the participation/leaderboard aggregator, the
//! discussion-message rules, and account registration/authentication.
//!
//! Every operation takes the [`Database`] handle and, where identity
//! matters, an explicit [`Principal`] resolved by the HTTP layer.  Nothing
//! in this crate reads ambient authentication state.
//!
//! [`Database`]: taskforge_store::Database

pub mod auth;
pub mod dto;
pub mod items;
pub mod leaderboard;
pub mod messages;
pub mod principal;
pub mod todos;

mod error;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{ApiError, Result};
pub use principal::{Principal, ROLE_ADMIN, ROLE_USER};
