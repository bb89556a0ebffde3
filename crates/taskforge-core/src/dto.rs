//! Request and response payload types for the HTTP boundary.
//!
//! Field names serialize in camelCase to match the JSON contract consumed
//! by the frontend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use taskforge_store::User;

// ---------------------------------------------------------------------------
// Todos
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TodoDto {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub created_date: NaiveDate,
    pub completed: bool,
    pub reviewed: bool,
    pub completed_by_id: Option<i64>,
    pub completed_by_name: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub overdue: bool,
}

/// Payload for creating or updating a todo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
}

/// Live counts over all todos.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoStats {
    pub total: i64,
    pub completed: i64,
    pub pending_review: i64,
    pub reviewed: i64,
    pub overdue: i64,
}

// ---------------------------------------------------------------------------
// Todo items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TodoItemDto {
    pub id: i64,
    pub todo_id: i64,
    pub title: String,
    pub completed: bool,
    pub completed_by_id: Option<i64>,
    pub completed_by_name: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItemRequest {
    pub title: String,
}

/// Progress summary of a todo's items.  `progress` is 0.0 when the todo has
/// no items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemSummary {
    pub total: i64,
    pub completed: i64,
    pub progress: f64,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: i64,
    pub todo_id: i64,
    pub user_id: i64,
    pub username: String,
    pub author_full_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessageRequest {
    pub content: String,
}

// ---------------------------------------------------------------------------
// Participation & leaderboards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantEntry {
    pub username: String,
    pub count: i64,
    /// Share of the todo's completed items, rounded to two decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationDetail {
    pub todo_id: i64,
    pub eligible_for_collab_board: bool,
    pub total_completed_items: i64,
    pub current_user_is_participant: bool,
    pub participants: Vec<ParticipantEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollabRow {
    pub user_id: i64,
    pub user_name: String,
    pub collab_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollabItemDetail {
    pub todo_id: i64,
    pub todo_title: String,
    pub item_id: i64,
    pub item_title: String,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinisherRow {
    pub user_id: i64,
    pub user_name: String,
    pub finish_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinisherTodoDetail {
    pub todo_id: i64,
    pub title: String,
    pub completed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
}

// ---------------------------------------------------------------------------
// Display-name derivation
// ---------------------------------------------------------------------------

/// Full display name used for item completers and message authors: last
/// name followed by first name, the concatenation trimmed at the ends,
/// falling back to the username when the result is empty.  Derived at the
/// read boundary so renames never go stale.
pub(crate) fn full_display_name(user: &User) -> String {
    let full = format!("{}{}", user.last_name, user.first_name);
    let full = full.trim();
    if full.is_empty() {
        user.username.clone()
    } else {
        full.to_string()
    }
}
