//! Shared fixtures for the core test modules.

use chrono::Utc;

use taskforge_store::{Database, Todo, TodoItem, User};

use crate::principal::{Principal, ROLE_ADMIN, ROLE_USER};

pub(crate) fn open_db() -> Database {
    let db = Database::open_in_memory().expect("in-memory database");
    db.insert_role(ROLE_ADMIN).unwrap();
    db.insert_role(ROLE_USER).unwrap();
    db
}

/// Register a user with the given roles and return the matching principal.
pub(crate) fn make_principal(db: &Database, username: &str, roles: &[&str]) -> Principal {
    let user_id = db
        .insert_user(&User {
            id: 0,
            first_name: capitalize(username),
            last_name: String::new(),
            username: username.into(),
            email: format!("{username}@example.com"),
            password_hash: "hash".into(),
            created_at: Utc::now(),
        })
        .unwrap();

    for role in roles {
        let role = db.find_role_by_name(role).unwrap().expect("seeded role");
        db.assign_role(user_id, role.id).unwrap();
    }

    Principal {
        user_id,
        username: username.into(),
        roles: roles.iter().map(|r| (*r).to_string()).collect(),
    }
}

pub(crate) fn make_user(db: &Database, username: &str) -> Principal {
    make_principal(db, username, &[ROLE_USER])
}

pub(crate) fn make_admin(db: &Database, username: &str) -> Principal {
    make_principal(db, username, &[ROLE_ADMIN, ROLE_USER])
}

pub(crate) fn make_todo(db: &Database, title: &str) -> i64 {
    db.insert_todo(&Todo {
        id: 0,
        title: title.into(),
        description: "description".into(),
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

pub(crate) fn make_item(db: &Database, todo_id: i64, title: &str) -> i64 {
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

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
