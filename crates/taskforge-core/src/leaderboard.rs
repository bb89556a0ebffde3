//! Participation views and leaderboards.
//!
//! Two boards exist.  The collaboration board counts completed items, but
//! only on todos where at least two distinct users completed items; solo
//! work never scores.  The finisher board counts todo-level completions
//! with no eligibility threshold.

use std::collections::HashMap;

use taskforge_store::{Database, StoreError};

use crate::dto::{
    CollabItemDetail, CollabRow, FinisherRow, FinisherTodoDetail, ParticipantEntry,
    ParticipationDetail,
};
use crate::error::{ApiError, Result};
use crate::principal::Principal;

/// Per-user completed-item counts for one todo, keyed by username.
pub fn participation_stats(db: &Database, todo_id: i64) -> Result<HashMap<String, i64>> {
    ensure_todo(db, todo_id)?;
    Ok(db
        .completed_counts_by_user(todo_id)?
        .into_iter()
        .map(|c| (c.username, c.count))
        .collect())
}

/// Detailed participation view for one todo, from the perspective of the
/// acting user.
pub fn participation_detail(
    db: &Database,
    principal: &Principal,
    todo_id: i64,
) -> Result<ParticipationDetail> {
    ensure_todo(db, todo_id)?;

    let counts = db.completed_counts_by_user(todo_id)?;
    let total: i64 = counts.iter().map(|c| c.count).sum();
    let eligible = counts.len() >= 2;
    let is_participant = db.is_participant(todo_id, principal.user_id)?;

    let participants = counts
        .into_iter()
        .map(|c| ParticipantEntry {
            percentage: percentage(c.count, total),
            username: c.username,
            count: c.count,
        })
        .collect();

    Ok(ParticipationDetail {
        todo_id,
        eligible_for_collab_board: eligible,
        total_completed_items: total,
        current_user_is_participant: is_participant,
        participants,
    })
}

/// Collaboration leaderboard across all collab-eligible todos, best first.
pub fn collab_board(db: &Database) -> Result<Vec<CollabRow>> {
    Ok(db
        .collab_leaderboard()?
        .into_iter()
        .map(|r| CollabRow {
            user_id: r.user_id,
            user_name: r.user_name,
            collab_count: r.count,
        })
        .collect())
}

/// Every item a user completed on collab-eligible todos, most recent
/// first.
pub fn collab_details(db: &Database, user_id: i64) -> Result<Vec<CollabItemDetail>> {
    ensure_user(db, user_id)?;
    Ok(db
        .collab_details_for_user(user_id)?
        .into_iter()
        .map(|r| CollabItemDetail {
            todo_id: r.todo_id,
            todo_title: r.todo_title,
            item_id: r.item_id,
            item_title: r.item_title,
            completed_at: r.completed_at,
        })
        .collect())
}

/// Finisher leaderboard: todo-level completions per user, best first.
pub fn finisher_board(db: &Database) -> Result<Vec<FinisherRow>> {
    let mut rows: Vec<FinisherRow> = db
        .finisher_leaderboard()?
        .into_iter()
        .map(|r| FinisherRow {
            user_id: r.user_id,
            user_name: r.user_name,
            finish_count: r.count,
        })
        .collect();
    // Order is by count alone; the stable sort keeps the query's ordering
    // for ties.
    rows.sort_by(|a, b| b.finish_count.cmp(&a.finish_count));
    Ok(rows)
}

/// Every todo a user finished, most recent first.
pub fn finisher_details(db: &Database, user_id: i64) -> Result<Vec<FinisherTodoDetail>> {
    ensure_user(db, user_id)?;
    Ok(db
        .finisher_details(user_id)?
        .into_iter()
        .map(|r| FinisherTodoDetail {
            todo_id: r.todo_id,
            title: r.title,
            completed_at: r.completed_at,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Share of `count` in `total` as a percentage rounded to two decimals.
fn percentage(count: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((count * 10_000) as f64 / total as f64).round() / 100.0
}

fn ensure_todo(db: &Database, todo_id: i64) -> Result<()> {
    db.get_todo(todo_id).map(|_| ()).map_err(|e| match e {
        StoreError::NotFound => ApiError::NotFound(format!("Todo not found with id: {todo_id}")),
        other => ApiError::Store(other),
    })
}

fn ensure_user(db: &Database, user_id: i64) -> Result<()> {
    db.get_user(user_id).map(|_| ()).map_err(|e| match e {
        StoreError::NotFound => ApiError::NotFound(format!("User not found with id: {user_id}")),
        other => ApiError::Store(other),
    })
}
