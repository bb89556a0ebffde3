//! # taskforge-store
//!
//! SQLite persistence layer for the taskforge backend.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD and aggregate helpers for
//! every domain model.  Schema migrations run automatically when the
//! database is opened.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod todo_items;
pub mod todos;
pub mod users;

mod convert;
mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
