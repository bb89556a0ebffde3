//! CRUD operations for [`Message`] records.

use rusqlite::params;

use crate::convert;
use crate::database::Database;
use crate::error::Result;
use crate::models::Message;
use crate::users::not_found;

impl Database {
    /// Insert a new message and return its row id.  The `id` field of the
    /// argument is ignored.
    pub fn insert_message(&self, message: &Message) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO messages (todo_id, user_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                message.todo_id,
                message.user_id,
                message.content,
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Fetch a single message by row id.
    pub fn get_message(&self, id: i64) -> Result<Message> {
        self.conn()
            .query_row(
                "SELECT id, todo_id, user_id, content, created_at
                 FROM messages WHERE id = ?1",
                params![id],
                row_to_message,
            )
            .map_err(not_found)
    }

    /// List the messages of a todo, oldest first.  Row id breaks ties
    /// between messages created within the same instant.
    pub fn list_messages_for_todo(&self, todo_id: i64) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, todo_id, user_id, content, created_at
             FROM messages
             WHERE todo_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![todo_id], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Delete a message by row id.  Returns `true` if a row was deleted.
    pub fn delete_message(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM messages WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let created_str: String = row.get(4)?;

    Ok(Message {
        id: row.get(0)?,
        todo_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created_at: convert::timestamp(4, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::{Todo, User};

    fn fixtures(db: &Database) -> (i64, i64) {
        let user_id = db
            .insert_user(&User {
                id: 0,
                first_name: "Ada".into(),
                last_name: String::new(),
                username: "ada".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
                created_at: Utc::now(),
            })
            .unwrap();
        let todo_id = db
            .insert_todo(&Todo {
                id: 0,
                title: "t".into(),
                description: "d".into(),
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
            .unwrap();
        (todo_id, user_id)
    }

    #[test]
    fn messages_ordered_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        let (todo_id, user_id) = fixtures(&db);

        let now = Utc::now();
        let later = db
            .insert_message(&Message {
                id: 0,
                todo_id,
                user_id,
                content: "second".into(),
                created_at: now + Duration::seconds(5),
            })
            .unwrap();
        let earlier = db
            .insert_message(&Message {
                id: 0,
                todo_id,
                user_id,
                content: "first".into(),
                created_at: now,
            })
            .unwrap();

        let ids: Vec<i64> = db
            .list_messages_for_todo(todo_id)
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![earlier, later]);
    }

    #[test]
    fn delete_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let (todo_id, user_id) = fixtures(&db);

        let id = db
            .insert_message(&Message {
                id: 0,
                todo_id,
                user_id,
                content: "hello".into(),
                created_at: Utc::now(),
            })
            .unwrap();

        assert!(db.delete_message(id).unwrap());
        assert!(!db.delete_message(id).unwrap());
        assert!(matches!(db.get_message(id), Err(crate::StoreError::NotFound)));
    }
}
