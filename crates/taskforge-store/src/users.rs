//! CRUD operations for [`User`] and [`Role`] records.

use rusqlite::{params, OptionalExtension};

use crate::convert;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Role, User};

impl Database {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Insert a new user and return its row id.  The `id` field of the
    /// argument is ignored.
    pub fn insert_user(&self, user: &User) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO users (first_name, last_name, username, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.first_name,
                user.last_name,
                user.username,
                user.email,
                user.password_hash,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Fetch a single user by row id.
    pub fn get_user(&self, id: i64) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, first_name, last_name, username, email, password_hash, created_at
                 FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Look up a user by username or email (the login form accepts either).
    pub fn find_user_by_username_or_email(&self, needle: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, first_name, last_name, username, email, password_hash, created_at
                 FROM users WHERE username = ?1 OR email = ?1",
                params![needle],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Whether a user with this username already exists.
    pub fn username_exists(&self, username: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether a user with this email already exists.
    pub fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    /// Look up a role by its unique name.
    pub fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let role = self
            .conn()
            .query_row(
                "SELECT id, name FROM roles WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Role {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(role)
    }

    /// Insert a role and return its row id.
    pub fn insert_role(&self, name: &str) -> Result<i64> {
        self.conn()
            .execute("INSERT INTO roles (name) VALUES (?1)", params![name])?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Grant a role to a user.  Idempotent.
    pub fn assign_role(&self, user_id: i64, role_id: i64) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
            params![user_id, role_id],
        )?;
        Ok(())
    }

    /// Names of all roles granted to a user.
    pub fn roles_for_user(&self, user_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT r.name FROM roles r
             JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = ?1
             ORDER BY r.name ASC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;

        let mut roles = Vec::new();
        for row in rows {
            roles.push(row?);
        }
        Ok(roles)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let created_str: String = row.get(6)?;

    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        username: row.get(3)?,
        email: row.get(4)?,
        password_hash: row.get(5)?,
        created_at: convert::timestamp(6, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn sample_user(username: &str, email: &str) -> User {
        User {
            id: 0,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            username: username.into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_fetch_user() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_user(&sample_user("ada", "ada@example.com")).unwrap();

        let fetched = db.get_user(id).unwrap();
        assert_eq!(fetched.username, "ada");
        assert_eq!(fetched.email, "ada@example.com");

        assert!(db.username_exists("ada").unwrap());
        assert!(!db.username_exists("grace").unwrap());
        assert!(db.email_exists("ada@example.com").unwrap());
    }

    #[test]
    fn find_by_username_or_email() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&sample_user("ada", "ada@example.com")).unwrap();

        assert!(db.find_user_by_username_or_email("ada").unwrap().is_some());
        assert!(db
            .find_user_by_username_or_email("ada@example.com")
            .unwrap()
            .is_some());
        assert!(db.find_user_by_username_or_email("nobody").unwrap().is_none());
    }

    #[test]
    fn roles_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let user_id = db.insert_user(&sample_user("ada", "ada@example.com")).unwrap();

        let admin = db.insert_role("ROLE_ADMIN").unwrap();
        let user = db.insert_role("ROLE_USER").unwrap();
        db.assign_role(user_id, admin).unwrap();
        db.assign_role(user_id, user).unwrap();
        // Granting twice is a no-op.
        db.assign_role(user_id, user).unwrap();

        let roles = db.roles_for_user(user_id).unwrap();
        assert_eq!(roles, vec!["ROLE_ADMIN".to_string(), "ROLE_USER".to_string()]);

        assert!(db.find_role_by_name("ROLE_ADMIN").unwrap().is_some());
        assert!(db.find_role_by_name("ROLE_NOPE").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_rejected_by_schema() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&sample_user("ada", "ada@example.com")).unwrap();
        assert!(db.insert_user(&sample_user("ada", "other@example.com")).is_err());
    }
}
