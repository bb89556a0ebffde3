//! v001 -- Initial schema creation.
//!
//! Creates the six core tables: `users`, `roles`, `user_roles`, `todos`,
//! `todo_items`, and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name    TEXT NOT NULL,
    last_name     TEXT NOT NULL,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Roles
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS roles (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE                  -- ROLE_ADMIN / ROLE_USER
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id INTEGER NOT NULL,
    role_id INTEGER NOT NULL,

    PRIMARY KEY (user_id, role_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (role_id) REFERENCES roles(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Todos
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS todos (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    title        TEXT NOT NULL,
    description  TEXT NOT NULL,
    due_date     TEXT,                         -- YYYY-MM-DD
    created_date TEXT NOT NULL,                -- YYYY-MM-DD, set once
    completed    INTEGER NOT NULL DEFAULT 0,   -- boolean 0/1
    reviewed     INTEGER NOT NULL DEFAULT 0,
    completed_by INTEGER,                      -- nullable FK -> users(id)
    completed_at TEXT,                         -- ISO-8601
    reviewed_by  TEXT,                         -- reviewer display name
    reviewed_at  TEXT,
    overdue      INTEGER NOT NULL DEFAULT 0,

    FOREIGN KEY (completed_by) REFERENCES users(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_todos_completed_reviewed
    ON todos(completed, reviewed);
CREATE INDEX IF NOT EXISTS idx_todos_due_date ON todos(due_date);
CREATE INDEX IF NOT EXISTS idx_todos_completed_by ON todos(completed_by);

-- ----------------------------------------------------------------
-- Todo items (sub-tasks)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS todo_items (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    todo_id      INTEGER NOT NULL,             -- FK -> todos(id)
    title        TEXT NOT NULL,
    completed    INTEGER NOT NULL DEFAULT 0,
    completed_by INTEGER,                      -- nullable FK -> users(id)
    completed_at TEXT,
    created_at   TEXT NOT NULL,                -- set once at insert

    FOREIGN KEY (todo_id) REFERENCES todos(id) ON DELETE CASCADE,
    FOREIGN KEY (completed_by) REFERENCES users(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_todo_items_todo_id ON todo_items(todo_id);
CREATE INDEX IF NOT EXISTS idx_todo_items_completed_by
    ON todo_items(completed_by);

-- ----------------------------------------------------------------
-- Messages (discussion thread per todo)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    todo_id    INTEGER NOT NULL,               -- FK -> todos(id)
    user_id    INTEGER NOT NULL,               -- FK -> users(id)
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (todo_id) REFERENCES todos(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_todo_created
    ON messages(todo_id, created_at ASC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
