//! Discussion messages attached to a todo.

use chrono::Utc;

use taskforge_store::{Database, Message, StoreError};

use crate::dto::{full_display_name, MessageDto, NewMessageRequest};
use crate::error::{ApiError, Result};
use crate::principal::Principal;

const MAX_MESSAGE_LEN: usize = 2000;

/// List a todo's messages, oldest first.
pub fn list_messages(db: &Database, todo_id: i64) -> Result<Vec<MessageDto>> {
    ensure_todo(db, todo_id)?;
    db.list_messages_for_todo(todo_id)?
        .iter()
        .map(|m| to_dto(db, m))
        .collect()
}

/// Post a message on a todo, credited to the acting user.
pub fn add_message(
    db: &Database,
    principal: &Principal,
    todo_id: i64,
    req: &NewMessageRequest,
) -> Result<MessageDto> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Message cannot be empty.".to_string()));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::Validation(
            "Message is too long (max 2000 characters).".to_string(),
        ));
    }
    ensure_todo(db, todo_id)?;

    let id = db.insert_message(&Message {
        id: 0,
        todo_id,
        user_id: principal.user_id,
        content: content.to_string(),
        created_at: Utc::now(),
    })?;

    tracing::debug!(todo_id, message_id = id, user = %principal.username, "posted message");

    to_dto(db, &db.get_message(id)?)
}

/// Delete a message from a todo.  Permitted only for its author or an
/// admin.
pub fn delete_message(
    db: &Database,
    principal: &Principal,
    todo_id: i64,
    message_id: i64,
) -> Result<()> {
    ensure_todo(db, todo_id)?;
    let message = db.get_message(message_id).map_err(|e| match e {
        StoreError::NotFound => {
            ApiError::NotFound(format!("Message not found with id: {message_id}"))
        }
        other => ApiError::Store(other),
    })?;
    if message.todo_id != todo_id {
        return Err(ApiError::NotFound(format!(
            "Message not found with id: {message_id}"
        )));
    }

    if !principal.is_admin() && message.user_id != principal.user_id {
        return Err(ApiError::Forbidden(
            "Only the author or an admin can delete this message.".to_string(),
        ));
    }

    db.delete_message(message_id)?;
    tracing::debug!(message_id, user = %principal.username, "deleted message");
    Ok(())
}

fn ensure_todo(db: &Database, todo_id: i64) -> Result<()> {
    db.get_todo(todo_id).map(|_| ()).map_err(|e| match e {
        StoreError::NotFound => ApiError::NotFound(format!("Todo not found with id: {todo_id}")),
        other => ApiError::Store(other),
    })
}

fn to_dto(db: &Database, message: &Message) -> Result<MessageDto> {
    let author = db.get_user(message.user_id)?;
    Ok(MessageDto {
        id: message.id,
        todo_id: message.todo_id,
        user_id: message.user_id,
        username: author.username.clone(),
        author_full_name: full_display_name(&author),
        content: message.content.clone(),
        created_at: message.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_admin, make_todo, make_user, open_db};

    fn request(content: &str) -> NewMessageRequest {
        NewMessageRequest {
            content: content.into(),
        }
    }

    #[test]
    fn post_and_list_in_order() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let todo = make_todo(&db, "t");

        add_message(&db, &ada, todo, &request("first")).unwrap();
        add_message(&db, &ada, todo, &request("second")).unwrap();

        let contents: Vec<String> = list_messages(&db, todo)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn author_fields_resolved_from_user() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let todo = make_todo(&db, "t");

        let dto = add_message(&db, &ada, todo, &request("hello")).unwrap();
        assert_eq!(dto.username, "ada");
        assert_eq!(dto.author_full_name, "Ada");
        assert_eq!(dto.user_id, ada.user_id);
    }

    #[test]
    fn content_validation() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let todo = make_todo(&db, "t");

        let err = add_message(&db, &ada, todo, &request("   ")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let long = "x".repeat(MAX_MESSAGE_LEN + 1);
        let err = add_message(&db, &ada, todo, &request(&long)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m.contains("2000")));

        // Exactly at the limit is fine.
        let at_limit = "x".repeat(MAX_MESSAGE_LEN);
        add_message(&db, &ada, todo, &request(&at_limit)).unwrap();

        // Content is stored trimmed, and the length cap applies to the
        // trimmed text.
        let dto = add_message(&db, &ada, todo, &request("  hello  ")).unwrap();
        assert_eq!(dto.content, "hello");
        let padded = format!("  {at_limit}  ");
        add_message(&db, &ada, todo, &request(&padded)).unwrap();
    }

    #[test]
    fn missing_todo_is_not_found() {
        let db = open_db();
        let ada = make_user(&db, "ada");

        assert!(matches!(list_messages(&db, 999), Err(ApiError::NotFound(_))));
        assert!(matches!(
            add_message(&db, &ada, 999, &request("hi")),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn delete_restricted_to_author_or_admin() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let grace = make_user(&db, "grace");
        let admin = make_admin(&db, "root");
        let todo = make_todo(&db, "t");

        let m1 = add_message(&db, &ada, todo, &request("mine")).unwrap();
        let err = delete_message(&db, &grace, todo, m1.id).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        delete_message(&db, &ada, todo, m1.id).unwrap();

        let m2 = add_message(&db, &ada, todo, &request("moderated")).unwrap();
        delete_message(&db, &admin, todo, m2.id).unwrap();

        assert!(matches!(
            delete_message(&db, &ada, todo, m2.id),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn delete_checks_the_todo_association() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let todo = make_todo(&db, "t");
        let other = make_todo(&db, "other");

        let m = add_message(&db, &ada, todo, &request("hello")).unwrap();
        assert!(matches!(
            delete_message(&db, &ada, other, m.id),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            delete_message(&db, &ada, 999, m.id),
            Err(ApiError::NotFound(_))
        ));
        delete_message(&db, &ada, todo, m.id).unwrap();
    }
}
