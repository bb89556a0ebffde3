//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the service layer without an extra mapping step.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// User / Role
// ---------------------------------------------------------------------------

/// A registered account.  Identity fields are immutable after registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Auto-increment row id.
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Argon2 PHC-format password hash.
    pub password_hash: String,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

/// A named permission group (`ROLE_ADMIN`, `ROLE_USER`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Todo
// ---------------------------------------------------------------------------

/// A task with lifecycle Open -> Completed -> Reviewed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Optional due date (date only, no time component).
    pub due_date: Option<NaiveDate>,
    /// Set once at creation.
    pub created_date: NaiveDate,
    pub completed: bool,
    pub reviewed: bool,
    /// User id of the finisher.  `None` while the todo is open.
    pub completed_by: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Display name of the reviewer.  `None` until reviewed.
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Derived flag, persisted and kept consistent on every mutation.
    pub overdue: bool,
}

// ---------------------------------------------------------------------------
// TodoItem
// ---------------------------------------------------------------------------

/// A sub-task of a [`Todo`], independently completable by any user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoItem {
    pub id: i64,
    /// Parent todo.
    pub todo_id: i64,
    pub title: String,
    pub completed: bool,
    /// User id of whoever completed the item.
    pub completed_by: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set once at insert (server clock).
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A discussion message attached to a [`Todo`].  Append-only except for
/// deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub todo_id: i64,
    /// Authoring user.
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Aggregate query rows
// ---------------------------------------------------------------------------

/// Per-user completed-item count for a single todo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantCount {
    pub username: String,
    pub count: i64,
}

/// One leaderboard row: a user and how many completions they are credited
/// with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub user_id: i64,
    pub user_name: String,
    pub count: i64,
}

/// One completed item on the collaboration detail view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollabItemRow {
    pub todo_id: i64,
    pub todo_title: String,
    pub item_id: i64,
    pub item_title: String,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One finished todo on the finisher detail view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinisherTodoRow {
    pub todo_id: i64,
    pub title: String,
    pub completed_at: Option<DateTime<Utc>>,
}
