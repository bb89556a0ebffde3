//! CRUD and aggregate operations for [`Todo`] records.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;

use crate::convert;
use crate::database::Database;
use crate::error::Result;
use crate::models::{FinisherTodoRow, LeaderboardRow, Todo};
use crate::users::not_found;

const TODO_COLUMNS: &str = "id, title, description, due_date, created_date, completed, reviewed,
     completed_by, completed_at, reviewed_by, reviewed_at, overdue";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new todo and return its row id.  The `id` field of the
    /// argument is ignored.
    pub fn insert_todo(&self, todo: &Todo) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO todos (title, description, due_date, created_date, completed, reviewed,
                                completed_by, completed_at, reviewed_by, reviewed_at, overdue)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                todo.title,
                todo.description,
                todo.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                todo.created_date.format("%Y-%m-%d").to_string(),
                todo.completed,
                todo.reviewed,
                todo.completed_by,
                todo.completed_at.map(|t| t.to_rfc3339()),
                todo.reviewed_by,
                todo.reviewed_at.map(|t| t.to_rfc3339()),
                todo.overdue,
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single todo by row id.
    pub fn get_todo(&self, id: i64) -> Result<Todo> {
        self.conn()
            .query_row(
                &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"),
                params![id],
                row_to_todo,
            )
            .map_err(not_found)
    }

    /// List all todos, ordered by id ascending.
    pub fn list_todos(&self) -> Result<Vec<Todo>> {
        self.query_todos(&format!("SELECT {TODO_COLUMNS} FROM todos ORDER BY id ASC"), params![])
    }

    /// Completed but not yet reviewed.
    pub fn list_pending_review(&self) -> Result<Vec<Todo>> {
        self.query_todos(
            &format!(
                "SELECT {TODO_COLUMNS} FROM todos
                 WHERE completed = 1 AND reviewed = 0 ORDER BY id ASC"
            ),
            params![],
        )
    }

    /// Completed and reviewed.
    pub fn list_reviewed(&self) -> Result<Vec<Todo>> {
        self.query_todos(
            &format!(
                "SELECT {TODO_COLUMNS} FROM todos
                 WHERE completed = 1 AND reviewed = 1 ORDER BY id ASC"
            ),
            params![],
        )
    }

    /// Todos whose due date is strictly before the given date.
    pub fn list_due_before(&self, date: NaiveDate) -> Result<Vec<Todo>> {
        self.query_todos(
            &format!(
                "SELECT {TODO_COLUMNS} FROM todos
                 WHERE due_date IS NOT NULL AND due_date < ?1 ORDER BY id ASC"
            ),
            params![date.format("%Y-%m-%d").to_string()],
        )
    }

    fn query_todos(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Todo>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(args, row_to_todo)?;

        let mut todos = Vec::new();
        for row in rows {
            todos.push(row?);
        }
        Ok(todos)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Write back every mutable column of a todo.  `created_date` is set
    /// once at insert and never updated.
    pub fn update_todo(&self, todo: &Todo) -> Result<()> {
        self.conn().execute(
            "UPDATE todos
             SET title = ?2, description = ?3, due_date = ?4, completed = ?5, reviewed = ?6,
                 completed_by = ?7, completed_at = ?8, reviewed_by = ?9, reviewed_at = ?10,
                 overdue = ?11
             WHERE id = ?1",
            params![
                todo.id,
                todo.title,
                todo.description,
                todo.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                todo.completed,
                todo.reviewed,
                todo.completed_by,
                todo.completed_at.map(|t| t.to_rfc3339()),
                todo.reviewed_by,
                todo.reviewed_at.map(|t| t.to_rfc3339()),
                todo.overdue,
            ],
        )?;
        Ok(())
    }

    /// Mark a todo completed, recording the finisher.  The update is
    /// conditional on the todo still being open so racing completions
    /// cannot both claim credit.  Returns `true` if this call won the
    /// transition.
    pub fn mark_todo_completed(
        &self,
        id: i64,
        user_id: i64,
        at: DateTime<Utc>,
        overdue: bool,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE todos
             SET completed = 1, reviewed = 0, completed_by = ?2, completed_at = ?3, overdue = ?4
             WHERE id = ?1 AND completed = 0 AND reviewed = 0",
            params![id, user_id, at.to_rfc3339(), overdue],
        )?;
        Ok(affected > 0)
    }

    /// Reopen a completed, unreviewed todo: clear the finisher and all
    /// review fields.  Conditional for the same reason as
    /// [`Database::mark_todo_completed`].
    pub fn clear_todo_completion(&self, id: i64, overdue: bool) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE todos
             SET completed = 0, completed_by = NULL, completed_at = NULL,
                 reviewed = 0, reviewed_by = NULL, reviewed_at = NULL, overdue = ?2
             WHERE id = ?1 AND completed = 1 AND reviewed = 0",
            params![id, overdue],
        )?;
        Ok(affected > 0)
    }

    /// Record a review.  Requires the todo to be completed; re-reviewing a
    /// reviewed todo simply re-stamps the reviewer fields.
    pub fn mark_todo_reviewed(
        &self,
        id: i64,
        reviewer: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE todos
             SET reviewed = 1, reviewed_by = ?2, reviewed_at = ?3
             WHERE id = ?1 AND completed = 1",
            params![id, reviewer, at.to_rfc3339()],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a todo (items and messages cascade).  Returns `true` if a row
    /// was deleted.
    pub fn delete_todo(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM todos WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------

    /// Finisher leaderboard: per user, how many todos they are recorded as
    /// the finisher of (the todo-level `completed_by` reference, not item
    /// completions).  Ordered by count descending.
    pub fn finisher_leaderboard(&self) -> Result<Vec<LeaderboardRow>> {
        let mut stmt = self.conn().prepare(
            "SELECT u.id, u.first_name, COUNT(*) AS finish_count
             FROM todos t
             JOIN users u ON u.id = t.completed_by
             WHERE t.completed_by IS NOT NULL
             GROUP BY u.id, u.first_name
             ORDER BY finish_count DESC",
        )?;

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

    /// Every todo a user is recorded as finisher of, most recent first.
    pub fn finisher_details(&self, user_id: i64) -> Result<Vec<FinisherTodoRow>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, title, completed_at
             FROM todos
             WHERE completed_by = ?1
             ORDER BY completed_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            let completed_str: Option<String> = row.get(2)?;
            Ok(FinisherTodoRow {
                todo_id: row.get(0)?,
                title: row.get(1)?,
                completed_at: convert::opt_timestamp(2, completed_str)?,
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

/// Map a `rusqlite::Row` to a [`Todo`].
fn row_to_todo(row: &rusqlite::Row<'_>) -> rusqlite::Result<Todo> {
    let due_str: Option<String> = row.get(3)?;
    let created_str: String = row.get(4)?;
    let completed_at_str: Option<String> = row.get(8)?;
    let reviewed_at_str: Option<String> = row.get(10)?;

    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        due_date: convert::opt_date(3, due_str)?,
        created_date: convert::date(4, &created_str)?,
        completed: row.get(5)?,
        reviewed: row.get(6)?,
        completed_by: row.get(7)?,
        completed_at: convert::opt_timestamp(8, completed_at_str)?,
        reviewed_by: row.get(9)?,
        reviewed_at: convert::opt_timestamp(10, reviewed_at_str)?,
        overdue: row.get(11)?,
    })
}
