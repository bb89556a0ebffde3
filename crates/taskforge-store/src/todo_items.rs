//! CRUD and aggregate operations for [`TodoItem`] records.
//!
//! The aggregate queries here back the participation views and the
//! collaboration leaderboard.  A todo is "collab-eligible" when at least two
//! distinct users completed at least one of its items; that subquery is
//! shared by [`Database::collab_leaderboard`] and
//! [`Database::collab_details_for_user`].

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::convert;
use crate::database::Database;
use crate::error::Result;
use crate::models::{CollabItemRow, LeaderboardRow, ParticipantCount, TodoItem};
use crate::users::not_found;

/// Todo ids with >= 2 distinct item completers.
const ELIGIBLE_TODOS_SQL: &str = "SELECT todo_id FROM todo_items
     WHERE completed = 1 AND completed_by IS NOT NULL
     GROUP BY todo_id
     HAVING COUNT(DISTINCT completed_by) >= 2";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new item and return its row id.  The `id` field of the
    /// argument is ignored.
    pub fn insert_item(&self, item: &TodoItem) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO todo_items (todo_id, title, completed, completed_by, completed_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.todo_id,
                item.title,
                item.completed,
                item.completed_by,
                item.completed_at.map(|t| t.to_rfc3339()),
                item.created_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single item by row id.
    pub fn get_item(&self, id: i64) -> Result<TodoItem> {
        self.conn()
            .query_row(
                "SELECT id, todo_id, title, completed, completed_by, completed_at, created_at
                 FROM todo_items WHERE id = ?1",
                params![id],
                row_to_item,
            )
            .map_err(not_found)
    }

    /// List the items of a todo, ordered by id ascending.
    pub fn list_items_for_todo(&self, todo_id: i64) -> Result<Vec<TodoItem>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, todo_id, title, completed, completed_by, completed_at, created_at
             FROM todo_items
             WHERE todo_id = ?1
             ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![todo_id], row_to_item)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Total number of items on a todo.
    pub fn count_items(&self, todo_id: i64) -> Result<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM todo_items WHERE todo_id = ?1",
            params![todo_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of completed items on a todo.
    pub fn count_completed_items(&self, todo_id: i64) -> Result<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM todo_items WHERE todo_id = ?1 AND completed = 1",
            params![todo_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Whether any item of the todo is still incomplete.
    pub fn has_incomplete_items(&self, todo_id: i64) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM todo_items WHERE todo_id = ?1 AND completed = 0",
            params![todo_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether the user completed at least one item of this todo.
    pub fn is_participant(&self, todo_id: i64, user_id: i64) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM todo_items
             WHERE todo_id = ?1 AND completed = 1 AND completed_by = ?2",
            params![todo_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Mark an item completed, recording the completer.  Conditional on the
    /// item still being open so racing completions cannot both claim
    /// credit.  Returns `true` if this call won the transition.
    pub fn mark_item_completed(&self, id: i64, user_id: i64, at: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE todo_items
             SET completed = 1, completed_by = ?2, completed_at = ?3
             WHERE id = ?1 AND completed = 0",
            params![id, user_id, at.to_rfc3339()],
        )?;
        Ok(affected > 0)
    }

    /// Clear an item's completion credit.  Conditional on the item being
    /// completed.  Returns `true` if a row transitioned.
    pub fn clear_item_completion(&self, id: i64) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE todo_items
             SET completed = 0, completed_by = NULL, completed_at = NULL
             WHERE id = ?1 AND completed = 1",
            params![id],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete an item by row id.  Returns `true` if a row was deleted.
    pub fn delete_item(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM todo_items WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------

    /// Per-user completed-item counts for one todo, ordered by count
    /// descending.
    pub fn completed_counts_by_user(&self, todo_id: i64) -> Result<Vec<ParticipantCount>> {
        let mut stmt = self.conn().prepare(
            "SELECT u.username, COUNT(*) AS completed_count
             FROM todo_items i
             JOIN users u ON u.id = i.completed_by
             WHERE i.todo_id = ?1 AND i.completed = 1
             GROUP BY u.id, u.username
             ORDER BY completed_count DESC",
        )?;

        let rows = stmt.query_map(params![todo_id], |row| {
            Ok(ParticipantCount {
                username: row.get(0)?,
                count: row.get(1)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Collaboration leaderboard: per-user completed-item counts summed
    /// across all collab-eligible todos, ordered by count descending.
    pub fn collab_leaderboard(&self) -> Result<Vec<LeaderboardRow>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT u.id, u.first_name, COUNT(*) AS collab_count
             FROM todo_items i
             JOIN users u ON u.id = i.completed_by
             WHERE i.completed = 1 AND i.todo_id IN ({ELIGIBLE_TODOS_SQL})
             GROUP BY u.id, u.first_name
             ORDER BY collab_count DESC"
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(LeaderboardRow {
                user_id: row.get(0)?,
                user_name: row.get(1)?,
                count: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Every item a user completed on collab-eligible todos, most recent
    /// first.
    pub fn collab_details_for_user(&self, user_id: i64) -> Result<Vec<CollabItemRow>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT t.id, t.title, i.id, i.title, i.completed_at
             FROM todo_items i
             JOIN todos t ON t.id = i.todo_id
             WHERE i.completed = 1 AND i.completed_by = ?1
               AND i.todo_id IN ({ELIGIBLE_TODOS_SQL})
             ORDER BY i.completed_at DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], |row| {
            let completed_str: Option<String> = row.get(4)?;
            Ok(CollabItemRow {
                todo_id: row.get(0)?,
                todo_title: row.get(1)?,
                item_id: row.get(2)?,
                item_title: row.get(3)?,
                completed_at: convert::opt_timestamp(4, completed_str)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`TodoItem`].
fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<TodoItem> {
    let completed_at_str: Option<String> = row.get(5)?;
    let created_str: String = row.get(6)?;

    Ok(TodoItem {
        id: row.get(0)?,
        todo_id: row.get(1)?,
        title: row.get(2)?,
        completed: row.get(3)?,
        completed_by: row.get(4)?,
        completed_at: convert::opt_timestamp(5, completed_at_str)?,
        created_at: convert::timestamp(6, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{Todo, User};

    fn make_user(db: &Database, username: &str) -> i64 {
        db.insert_user(&User {
            id: 0,
            first_name: username.to_uppercase(),
            last_name: String::new(),
            username: username.into(),
            email: format!("{username}@example.com"),
            password_hash: "hash".into(),
            created_at: Utc::now(),
        })
        .unwrap()
    }

    fn make_todo(db: &Database, title: &str) -> i64 {
        db.insert_todo(&Todo {
            id: 0,
            title: title.into(),
            description: "desc".into(),
            due_date: None,
            created_date: Utc::now().date_naive(),
            completed: false,
            reviewed: false,
            completed_by: None,
            completed_at: None,
            reviewed_by: None,
            reviewed_at: None,
            overdue: false,
        })
        .unwrap()
    }

    fn make_item(db: &Database, todo_id: i64, title: &str) -> i64 {
        db.insert_item(&TodoItem {
            id: 0,
            todo_id,
            title: title.into(),
            completed: false,
            completed_by: None,
            completed_at: None,
            created_at: Utc::now(),
        })
        .unwrap()
    }

    #[test]
    fn items_ordered_by_id() {
        let db = Database::open_in_memory().unwrap();
        let todo = make_todo(&db, "t");
        let a = make_item(&db, todo, "a");
        let b = make_item(&db, todo, "b");

        let ids: Vec<i64> = db.list_items_for_todo(todo).unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(db.count_items(todo).unwrap(), 2);
        assert_eq!(db.count_completed_items(todo).unwrap(), 0);
        assert!(db.has_incomplete_items(todo).unwrap());
    }

    #[test]
    fn completion_is_conditional() {
        let db = Database::open_in_memory().unwrap();
        let todo = make_todo(&db, "t");
        let item = make_item(&db, todo, "a");
        let ada = make_user(&db, "ada");
        let grace = make_user(&db, "grace");

        assert!(db.mark_item_completed(item, ada, Utc::now()).unwrap());
        assert!(!db.mark_item_completed(item, grace, Utc::now()).unwrap());

        let fetched = db.get_item(item).unwrap();
        assert_eq!(fetched.completed_by, Some(ada));
        assert!(db.is_participant(todo, ada).unwrap());
        assert!(!db.is_participant(todo, grace).unwrap());

        assert!(db.clear_item_completion(item).unwrap());
        assert!(!db.clear_item_completion(item).unwrap());
        assert!(db.get_item(item).unwrap().completed_by.is_none());
    }

    #[test]
    fn deleting_todo_cascades_to_items() {
        let db = Database::open_in_memory().unwrap();
        let todo = make_todo(&db, "t");
        let item = make_item(&db, todo, "a");

        assert!(db.delete_todo(todo).unwrap());
        assert!(matches!(db.get_item(item), Err(crate::StoreError::NotFound)));
    }

    #[test]
    fn collab_leaderboard_requires_two_distinct_completers() {
        let db = Database::open_in_memory().unwrap();
        let ada = make_user(&db, "ada");
        let grace = make_user(&db, "grace");

        // Solo todo: one user completed everything -- contributes nothing.
        let solo = make_todo(&db, "solo");
        let s1 = make_item(&db, solo, "s1");
        let s2 = make_item(&db, solo, "s2");
        db.mark_item_completed(s1, ada, Utc::now()).unwrap();
        db.mark_item_completed(s2, ada, Utc::now()).unwrap();

        assert!(db.collab_leaderboard().unwrap().is_empty());

        // Shared todo: two distinct completers -- both appear.
        let shared = make_todo(&db, "shared");
        let a = make_item(&db, shared, "a");
        let b = make_item(&db, shared, "b");
        let c = make_item(&db, shared, "c");
        db.mark_item_completed(a, ada, Utc::now()).unwrap();
        db.mark_item_completed(b, ada, Utc::now()).unwrap();
        db.mark_item_completed(c, grace, Utc::now()).unwrap();

        let board = db.collab_leaderboard().unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_id, ada);
        assert_eq!(board[0].count, 2);
        assert_eq!(board[1].count, 1);

        // Details are restricted to eligible todos: ada's solo items are
        // excluded.
        let details = db.collab_details_for_user(ada).unwrap();
        assert_eq!(details.len(), 2);
        assert!(details.iter().all(|d| d.todo_id == shared));
    }

    #[test]
    fn participation_counts_grouped_by_user() {
        let db = Database::open_in_memory().unwrap();
        let ada = make_user(&db, "ada");
        let grace = make_user(&db, "grace");
        let todo = make_todo(&db, "t");

        for n in 0..3 {
            let item = make_item(&db, todo, &format!("a{n}"));
            db.mark_item_completed(item, ada, Utc::now()).unwrap();
        }
        let item = make_item(&db, todo, "g");
        db.mark_item_completed(item, grace, Utc::now()).unwrap();

        let counts = db.completed_counts_by_user(todo).unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].username, "ada");
        assert_eq!(counts[0].count, 3);
        assert_eq!(counts[1].username, "grace");
        assert_eq!(counts[1].count, 1);
    }
}
