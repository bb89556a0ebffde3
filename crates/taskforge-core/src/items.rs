//! Item operations within a todo.
//!
//! Items carry their own completion credit, which feeds participation
//! checks on the parent todo and the collaboration leaderboard.  Once the
//! parent todo is reviewed its items are frozen along with it.

use chrono::Utc;

use taskforge_store::{Database, StoreError, Todo, TodoItem};

use crate::dto::{full_display_name, ItemSummary, NewItemRequest, TodoItemDto};
use crate::error::{ApiError, Result};
use crate::principal::Principal;

/// List the items of a todo, ordered by id ascending.
pub fn list_items(db: &Database, todo_id: i64) -> Result<Vec<TodoItemDto>> {
    fetch_todo(db, todo_id)?;
    db.list_items_for_todo(todo_id)?
        .iter()
        .map(|i| to_dto(db, i))
        .collect()
}

/// Progress summary for a todo's items.  A todo with no items reports zero
/// progress; an unknown todo id does too, intentionally, since the summary
/// is polled by list views that may race deletions.
pub fn item_summary(db: &Database, todo_id: i64) -> Result<ItemSummary> {
    let total = db.count_items(todo_id)?;
    let completed = db.count_completed_items(todo_id)?;
    let progress = if total > 0 {
        completed as f64 / total as f64
    } else {
        0.0
    };
    Ok(ItemSummary {
        total,
        completed,
        progress,
    })
}

/// Add an item to a todo.
pub fn add_item(db: &Database, todo_id: i64, req: &NewItemRequest) -> Result<TodoItemDto> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Item title cannot be empty.".to_string()));
    }
    let todo = fetch_todo(db, todo_id)?;
    reject_reviewed(&todo)?;

    let id = db.insert_item(&TodoItem {
        id: 0,
        todo_id,
        title: title.to_string(),
        completed: false,
        completed_by: None,
        completed_at: None,
        created_at: Utc::now(),
    })?;

    tracing::debug!(todo_id, item_id = id, "added item");

    to_dto(db, &db.get_item(id)?)
}

/// Delete an item from a todo.  No ownership check; the endpoint gates on
/// the admin role.
pub fn delete_item(db: &Database, todo_id: i64, item_id: i64) -> Result<()> {
    fetch_todo(db, todo_id)
        .and_then(|todo| reject_reviewed(&todo))?;
    let item = fetch_item(db, item_id)?;
    if item.todo_id != todo_id {
        return Err(ApiError::NotFound(format!(
            "Todo item not found with id: {item_id}"
        )));
    }

    db.delete_item(item_id)?;
    tracing::debug!(todo_id, item_id, "deleted item");
    Ok(())
}

/// Mark an item completed, crediting the acting user.  Idempotent once
/// completed: the recorded credit is never re-stamped, whoever calls.
pub fn complete_item(db: &Database, principal: &Principal, item_id: i64) -> Result<TodoItemDto> {
    let item = fetch_item(db, item_id)?;
    let todo = fetch_todo(db, item.todo_id)?;
    reject_reviewed(&todo)?;

    if item.completed {
        return to_dto(db, &item);
    }

    // Conditional update: a concurrent completion keeps its credit and
    // this call degrades to the idempotent read.
    if !db.mark_item_completed(item_id, principal.user_id, Utc::now())? {
        return to_dto(db, &db.get_item(item_id)?);
    }

    tracing::debug!(item_id, user = %principal.username, "item completed");

    to_dto(db, &db.get_item(item_id)?)
}

/// Clear an item's completion.  Permitted only for the recorded completer
/// or an admin.
pub fn uncomplete_item(db: &Database, principal: &Principal, item_id: i64) -> Result<TodoItemDto> {
    let item = fetch_item(db, item_id)?;
    let todo = fetch_todo(db, item.todo_id)?;
    reject_reviewed(&todo)?;

    if !item.completed {
        return to_dto(db, &item);
    }

    let is_owner = item.completed_by == Some(principal.user_id);
    if !principal.is_admin() && !is_owner {
        return Err(ApiError::Forbidden(
            "Only the user who completed this item or an admin can mark it as incomplete."
                .to_string(),
        ));
    }

    db.clear_item_completion(item_id)?;
    to_dto(db, &db.get_item(item_id)?)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fetch_todo(db: &Database, todo_id: i64) -> Result<Todo> {
    db.get_todo(todo_id).map_err(|e| match e {
        StoreError::NotFound => ApiError::NotFound(format!("Todo not found with id: {todo_id}")),
        other => ApiError::Store(other),
    })
}

fn fetch_item(db: &Database, item_id: i64) -> Result<TodoItem> {
    db.get_item(item_id).map_err(|e| match e {
        StoreError::NotFound => {
            ApiError::NotFound(format!("Todo item not found with id: {item_id}"))
        }
        other => ApiError::Store(other),
    })
}

/// Items are frozen together with their parent once it is reviewed.
fn reject_reviewed(todo: &Todo) -> Result<()> {
    if todo.reviewed {
        return Err(ApiError::InvalidState(
            "Cannot modify items of a reviewed task.".to_string(),
        ));
    }
    Ok(())
}

fn to_dto(db: &Database, item: &TodoItem) -> Result<TodoItemDto> {
    let completed_by_name = match item.completed_by {
        Some(user_id) => Some(full_display_name(&db.get_user(user_id)?)),
        None => None,
    };

    Ok(TodoItemDto {
        id: item.id,
        todo_id: item.todo_id,
        title: item.title.clone(),
        completed: item.completed,
        completed_by_id: item.completed_by,
        completed_by_name,
        completed_at: item.completed_at,
        created_at: item.created_at,
    })
}
