//! Todo lifecycle engine.
//!
//! State machine per todo: Open -> Completed via [`complete_todo`],
//! Completed -> Open via [`incomplete_todo`], Completed -> Reviewed via
//! [`review_todo`].  Review is terminal: a reviewed todo rejects every
//! further mutation, on the todo itself and on its items.
//!
//! Completion of a todo that owns items is gated twice: every item must be
//! completed, and the acting user must have completed at least one of them.
//! A todo without items can be completed directly by any authenticated
//! user.

use chrono::Utc;

use taskforge_store::{Database, StoreError, Todo};

use crate::dto::{TodoDto, TodoRequest, TodoStats};
use crate::error::{ApiError, Result};
use crate::principal::Principal;

/// Create a new todo.  The creation date is the server's current date and
/// the overdue flag is derived from the due date.
pub fn add_todo(db: &Database, req: &TodoRequest) -> Result<TodoDto> {
    validate_request(req)?;

    let today = Utc::now().date_naive();
    let overdue = !req.completed && req.due_date.is_some_and(|d| d < today);

    let todo = Todo {
        id: 0,
        title: req.title.clone(),
        description: req.description.clone(),
        due_date: req.due_date,
        created_date: today,
        completed: req.completed,
        reviewed: false,
        completed_by: None,
        completed_at: None,
        reviewed_by: None,
        reviewed_at: None,
        overdue,
    };
    let id = db.insert_todo(&todo)?;

    tracing::debug!(todo_id = id, "created todo");

    to_dto(db, &db.get_todo(id)?)
}

/// Fetch a single todo.
pub fn get_todo(db: &Database, id: i64) -> Result<TodoDto> {
    let todo = fetch(db, id)?;
    to_dto(db, &todo)
}

/// List every todo.
pub fn get_all_todos(db: &Database) -> Result<Vec<TodoDto>> {
    db.list_todos()?.iter().map(|t| to_dto(db, t)).collect()
}

/// Update title, description, due date, and the completed flag.
///
/// The overdue recompute here is deliberately asymmetric, matching
/// long-standing behavior the frontend depends on: the flag is set
/// whenever the due date is past, but it is only cleared when it is
/// currently set AND the due date now lies in the future.  Clearing the
/// due date entirely leaves a stale flag in place.
pub fn update_todo(db: &Database, id: i64, req: &TodoRequest) -> Result<TodoDto> {
    let mut todo = fetch(db, id)?;

    if todo.reviewed {
        return Err(ApiError::InvalidState("Reviewed task cannot be edited.".to_string()));
    }
    validate_request(req)?;

    todo.title = req.title.clone();
    todo.description = req.description.clone();
    todo.due_date = req.due_date;
    todo.completed = req.completed;

    let today = Utc::now().date_naive();
    if todo.due_date.is_some_and(|d| d < today) {
        todo.overdue = true;
    }
    if todo.overdue && todo.due_date.is_some_and(|d| d > today) {
        todo.overdue = false;
    }

    db.update_todo(&todo)?;
    to_dto(db, &db.get_todo(id)?)
}

/// Delete a todo; its items and messages go with it.
pub fn delete_todo(db: &Database, id: i64) -> Result<()> {
    fetch(db, id)?;
    db.delete_todo(id)?;
    tracing::debug!(todo_id = id, "deleted todo");
    Ok(())
}

/// Mark a todo completed, crediting the acting user as finisher.
pub fn complete_todo(db: &Database, principal: &Principal, id: i64) -> Result<TodoDto> {
    let todo = fetch(db, id)?;

    if todo.reviewed {
        return Err(ApiError::InvalidState(
            "This task has already been reviewed and cannot be marked as completed.".to_string(),
        ));
    }

    if todo.completed {
        return already_completed(db, &todo, principal);
    }

    let items_total = db.count_items(id)?;
    if items_total > 0 {
        if db.has_incomplete_items(id)? {
            return Err(ApiError::Conflict(
                "All items must be completed before this task can be marked as completed."
                    .to_string(),
            ));
        }
        if !db.is_participant(id, principal.user_id)? {
            return Err(ApiError::Forbidden(
                "Only participants who completed at least one item can complete this task."
                    .to_string(),
            ));
        }
    }

    let now = Utc::now();
    let overdue = if todo.due_date.is_some_and(|d| d < now.date_naive()) {
        true
    } else {
        todo.overdue
    };

    // Conditional update: if a concurrent request completed the todo
    // between our read and this write, fall through to the
    // already-completed rules instead of overwriting its credit.
    if !db.mark_todo_completed(id, principal.user_id, now, overdue)? {
        let current = db.get_todo(id)?;
        return already_completed(db, &current, principal);
    }

    tracing::info!(todo_id = id, user = %principal.username, "todo completed");

    to_dto(db, &db.get_todo(id)?)
}

/// The already-completed branch of [`complete_todo`]: idempotent for the
/// recorded finisher, a conflict for anyone else.
fn already_completed(db: &Database, todo: &Todo, principal: &Principal) -> Result<TodoDto> {
    if let Some(finisher) = todo.completed_by {
        if finisher != principal.user_id {
            let other = db.get_user(finisher)?;
            return Err(ApiError::Conflict(format!(
                "This task is already completed by {}",
                other.first_name
            )));
        }
    }
    to_dto(db, todo)
}

/// Reopen a completed todo, clearing completion credit and review fields.
/// Permitted only for the recorded finisher or an admin.
pub fn incomplete_todo(db: &Database, principal: &Principal, id: i64) -> Result<TodoDto> {
    let todo = fetch(db, id)?;

    if todo.reviewed {
        return Err(ApiError::InvalidState(
            "This task has already been reviewed and cannot be marked as incomplete.".to_string(),
        ));
    }

    if !todo.completed {
        return to_dto(db, &todo);
    }

    let is_owner = todo.completed_by == Some(principal.user_id);
    if !principal.is_admin() && !is_owner {
        return Err(ApiError::Forbidden(
            "Only the original finisher or an admin can mark this task as incomplete.".to_string(),
        ));
    }

    let today = Utc::now().date_naive();
    let overdue = todo.due_date.is_some_and(|d| d < today);
    db.clear_todo_completion(id, overdue)?;

    tracing::info!(todo_id = id, user = %principal.username, "todo reopened");

    to_dto(db, &db.get_todo(id)?)
}

/// Mark a completed todo as reviewed, recording the reviewer's first name.
/// Terminal: no transition leaves the reviewed state.
pub fn review_todo(db: &Database, principal: &Principal, id: i64) -> Result<TodoDto> {
    let todo = fetch(db, id)?;

    if !todo.completed {
        return Err(ApiError::InvalidOperation(
            "Cannot review a task that is not completed.".to_string(),
        ));
    }

    let reviewer = db.get_user(principal.user_id)?;
    db.mark_todo_reviewed(id, &reviewer.first_name, Utc::now())?;

    tracing::info!(todo_id = id, reviewer = %principal.username, "todo reviewed");

    to_dto(db, &db.get_todo(id)?)
}

/// Completed todos awaiting review.
pub fn get_pending_review_todos(db: &Database) -> Result<Vec<TodoDto>> {
    db.list_pending_review()?.iter().map(|t| to_dto(db, t)).collect()
}

/// Completed and reviewed todos.
pub fn get_reviewed_todos(db: &Database) -> Result<Vec<TodoDto>> {
    db.list_reviewed()?.iter().map(|t| to_dto(db, t)).collect()
}

/// Open todos whose due date has passed.  Computed from the due date and
/// completion flag, never from the persisted overdue marker.
pub fn get_overdue_todos(db: &Database) -> Result<Vec<TodoDto>> {
    let today = Utc::now().date_naive();
    db.list_due_before(today)?
        .iter()
        .filter(|t| !t.completed)
        .map(|t| to_dto(db, t))
        .collect()
}

/// Live counts over all todos.  Overdue is recomputed here rather than
/// read from the persisted flag.
pub fn get_todo_statistics(db: &Database) -> Result<TodoStats> {
    let todos = db.list_todos()?;
    let today = Utc::now().date_naive();

    let total = todos.len() as i64;
    let completed = todos.iter().filter(|t| t.completed).count() as i64;
    let pending_review = todos.iter().filter(|t| t.completed && !t.reviewed).count() as i64;
    let reviewed = todos.iter().filter(|t| t.reviewed).count() as i64;
    let overdue = todos
        .iter()
        .filter(|t| t.due_date.is_some_and(|d| d < today) && !t.completed)
        .count() as i64;

    Ok(TodoStats {
        total,
        completed,
        pending_review,
        reviewed,
        overdue,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fetch(db: &Database, id: i64) -> Result<Todo> {
    db.get_todo(id).map_err(|e| match e {
        StoreError::NotFound => ApiError::NotFound(format!("Todo not found with id: {id}")),
        other => ApiError::Store(other),
    })
}

fn validate_request(req: &TodoRequest) -> Result<()> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("Title cannot be empty.".to_string()));
    }
    if req.description.trim().is_empty() {
        return Err(ApiError::Validation("Description cannot be empty.".to_string()));
    }
    Ok(())
}

/// Map a stored todo to its DTO, resolving the finisher's display name at
/// the read boundary.
pub(crate) fn to_dto(db: &Database, todo: &Todo) -> Result<TodoDto> {
    let completed_by_name = match todo.completed_by {
        Some(user_id) => Some(db.get_user(user_id)?.first_name),
        None => None,
    };

    Ok(TodoDto {
        id: todo.id,
        title: todo.title.clone(),
        description: todo.description.clone(),
        due_date: todo.due_date,
        created_date: todo.created_date,
        completed: todo.completed,
        reviewed: todo.reviewed,
        completed_by_id: todo.completed_by,
        completed_by_name,
        completed_at: todo.completed_at,
        reviewed_by: todo.reviewed_by.clone(),
        reviewed_at: todo.reviewed_at,
        overdue: todo.overdue,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::items;
    use crate::testutil::{make_admin, make_item, make_todo, make_user, open_db};

    fn request(title: &str) -> TodoRequest {
        TodoRequest {
            title: title.into(),
            description: "description".into(),
            due_date: None,
            completed: false,
        }
    }

    #[test]
    fn add_todo_sets_creation_date_and_overdue() {
        let db = open_db();
        let today = Utc::now().date_naive();

        let mut req = request("late");
        req.due_date = Some(today - Duration::days(1));
        let dto = add_todo(&db, &req).unwrap();
        assert_eq!(dto.created_date, today);
        assert!(dto.overdue);

        let mut req = request("on time");
        req.due_date = Some(today + Duration::days(1));
        assert!(!add_todo(&db, &req).unwrap().overdue);

        assert!(!add_todo(&db, &request("no due date")).unwrap().overdue);
    }

    #[test]
    fn add_todo_requires_title_and_description() {
        let db = open_db();

        let err = add_todo(&db, &request("  ")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let mut req = request("ok");
        req.description = String::new();
        let err = add_todo(&db, &req).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn complete_without_items_is_open_to_any_user() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let id = make_todo(&db, "simple");

        let dto = complete_todo(&db, &ada, id).unwrap();
        assert!(dto.completed);
        assert_eq!(dto.completed_by_id, Some(ada.user_id));
        assert!(dto.completed_at.is_some());
        assert!(!dto.reviewed);
    }

    #[test]
    fn complete_is_idempotent_for_the_finisher() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let id = make_todo(&db, "simple");

        let first = complete_todo(&db, &ada, id).unwrap();
        let second = complete_todo(&db, &ada, id).unwrap();
        // No error and no timestamp drift.
        assert_eq!(first.completed_at, second.completed_at);
    }

    #[test]
    fn complete_by_another_user_conflicts() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let grace = make_user(&db, "grace");
        let id = make_todo(&db, "simple");

        complete_todo(&db, &ada, id).unwrap();
        let err = complete_todo(&db, &grace, id).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref m) if m.contains("Ada")));
    }

    #[test]
    fn completion_gated_on_all_items_done() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let id = make_todo(&db, "with items");
        let a = make_item(&db, id, "A");
        make_item(&db, id, "B");

        items::complete_item(&db, &ada, a).unwrap();

        let err = complete_todo(&db, &ada, id).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref m) if m.contains("All items")));
    }

    #[test]
    fn completion_gated_on_participation() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let grace = make_user(&db, "grace");
        let bystander = make_user(&db, "eve");
        let id = make_todo(&db, "with items");
        let a = make_item(&db, id, "A");
        let b = make_item(&db, id, "B");

        items::complete_item(&db, &ada, a).unwrap();
        items::complete_item(&db, &grace, b).unwrap();

        // A user who completed no item cannot finish the todo.
        let err = complete_todo(&db, &bystander, id).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // A participant can.
        let dto = complete_todo(&db, &grace, id).unwrap();
        assert_eq!(dto.completed_by_id, Some(grace.user_id));
    }

    #[test]
    fn reopen_restricted_to_finisher_or_admin() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let grace = make_user(&db, "grace");
        let admin = make_admin(&db, "root");

        // Finisher can reopen.
        let id = make_todo(&db, "one");
        complete_todo(&db, &ada, id).unwrap();
        let err = incomplete_todo(&db, &grace, id).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        let dto = incomplete_todo(&db, &ada, id).unwrap();
        assert!(!dto.completed);
        assert!(dto.completed_by_id.is_none());
        assert!(dto.completed_at.is_none());

        // Admin can reopen someone else's completion.
        let id = make_todo(&db, "two");
        complete_todo(&db, &ada, id).unwrap();
        let dto = incomplete_todo(&db, &admin, id).unwrap();
        assert!(!dto.completed);
    }

    #[test]
    fn reopen_is_idempotent_when_open() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let id = make_todo(&db, "open");

        let dto = incomplete_todo(&db, &ada, id).unwrap();
        assert!(!dto.completed);
    }

    #[test]
    fn reopen_clears_review_fields() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let id = make_todo(&db, "cycle");

        complete_todo(&db, &ada, id).unwrap();
        let dto = incomplete_todo(&db, &ada, id).unwrap();
        assert!(!dto.reviewed);
        assert!(dto.reviewed_by.is_none());
        assert!(dto.reviewed_at.is_none());
    }

    #[test]
    fn review_requires_completion_and_is_terminal() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let admin = make_admin(&db, "root");
        let id = make_todo(&db, "audit me");

        let err = review_todo(&db, &admin, id).unwrap_err();
        assert!(matches!(err, ApiError::InvalidOperation(_)));

        complete_todo(&db, &ada, id).unwrap();
        let dto = review_todo(&db, &admin, id).unwrap();
        assert!(dto.reviewed);
        assert_eq!(dto.reviewed_by.as_deref(), Some("Root"));
        assert!(dto.reviewed_at.is_some());

        // Every mutation is now rejected.
        assert!(matches!(
            update_todo(&db, id, &request("edit")),
            Err(ApiError::InvalidState(_))
        ));
        assert!(matches!(
            complete_todo(&db, &ada, id),
            Err(ApiError::InvalidState(_))
        ));
        assert!(matches!(
            incomplete_todo(&db, &admin, id),
            Err(ApiError::InvalidState(_))
        ));
    }

    #[test]
    fn update_overdue_recompute_is_asymmetric() {
        let db = open_db();
        let today = Utc::now().date_naive();

        let mut req = request("deadline");
        req.due_date = Some(today - Duration::days(1));
        let id = add_todo(&db, &req).unwrap().id;
        assert!(get_todo(&db, id).unwrap().overdue);

        // Moving the due date into the future clears the flag.
        req.due_date = Some(today + Duration::days(3));
        assert!(!update_todo(&db, id, &req).unwrap().overdue);

        // Moving it back into the past sets it again.
        req.due_date = Some(today - Duration::days(3));
        assert!(update_todo(&db, id, &req).unwrap().overdue);

        // Removing the due date entirely does NOT clear the flag: the
        // clear branch only fires for a future due date.  Historical
        // behavior, kept on purpose.
        req.due_date = None;
        assert!(update_todo(&db, id, &req).unwrap().overdue);
    }

    #[test]
    fn overdue_views_ignore_persisted_flag() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let today = Utc::now().date_naive();

        let mut req = request("late");
        req.due_date = Some(today - Duration::days(1));
        let id = add_todo(&db, &req).unwrap().id;

        let overdue: Vec<i64> = get_overdue_todos(&db).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(overdue, vec![id]);

        // Completing removes the todo from the overdue view regardless of
        // its due date.
        complete_todo(&db, &ada, id).unwrap();
        assert!(get_overdue_todos(&db).unwrap().is_empty());

        let stats = get_todo_statistics(&db).unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending_review, 1);
        assert_eq!(stats.reviewed, 0);
        assert_eq!(stats.overdue, 0);
    }

    #[test]
    fn statistics_count_each_bucket() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let admin = make_admin(&db, "root");
        let today = Utc::now().date_naive();

        make_todo(&db, "open");

        let mut req = request("late open");
        req.due_date = Some(today - Duration::days(2));
        add_todo(&db, &req).unwrap();

        let done = make_todo(&db, "done");
        complete_todo(&db, &ada, done).unwrap();

        let audited = make_todo(&db, "audited");
        complete_todo(&db, &ada, audited).unwrap();
        review_todo(&db, &admin, audited).unwrap();

        let stats = get_todo_statistics(&db).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.pending_review, 1);
        assert_eq!(stats.reviewed, 1);
        assert_eq!(stats.overdue, 1);
    }

    #[test]
    fn pending_and_reviewed_views() {
        let db = open_db();
        let ada = make_user(&db, "ada");
        let admin = make_admin(&db, "root");

        let done = make_todo(&db, "done");
        complete_todo(&db, &ada, done).unwrap();
        let audited = make_todo(&db, "audited");
        complete_todo(&db, &ada, audited).unwrap();
        review_todo(&db, &admin, audited).unwrap();

        let pending: Vec<i64> = get_pending_review_todos(&db).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(pending, vec![done]);
        let reviewed: Vec<i64> = get_reviewed_todos(&db).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(reviewed, vec![audited]);
    }

    #[test]
    fn delete_missing_todo_is_not_found() {
        let db = open_db();
        assert!(matches!(delete_todo(&db, 999), Err(ApiError::NotFound(_))));
        assert!(matches!(get_todo(&db, 999), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn end_to_end_collaborative_lifecycle() {
        let db = open_db();
        let user1 = make_user(&db, "ada");
        let user2 = make_user(&db, "grace");
        let admin = make_admin(&db, "root");
        let today = Utc::now().date_naive();

        // Create with a past due date: overdue immediately.
        let mut req = request("ship release");
        req.due_date = Some(today - Duration::days(1));
        let id = add_todo(&db, &req).unwrap().id;
        assert!(get_todo(&db, id).unwrap().overdue);

        let a = make_item(&db, id, "A");
        let b = make_item(&db, id, "B");

        // user1 completes "A"; the todo cannot be finished while "B" is open.
        items::complete_item(&db, &user1, a).unwrap();
        assert!(matches!(
            complete_todo(&db, &user1, id),
            Err(ApiError::Conflict(_))
        ));

        // user2 completes "B"; user1 finishes the todo.
        items::complete_item(&db, &user2, b).unwrap();
        let dto = complete_todo(&db, &user1, id).unwrap();
        assert!(dto.completed);
        assert_eq!(dto.completed_by_id, Some(user1.user_id));

        // user2 colliding with the finished todo gets a named conflict.
        let err = complete_todo(&db, &user2, id).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref m) if m.contains("Ada")));

        // Admin reviews; reopening is now impossible even for the finisher.
        assert!(review_todo(&db, &admin, id).unwrap().reviewed);
        assert!(matches!(
            incomplete_todo(&db, &user1, id),
            Err(ApiError::InvalidState(_))
        ));
    }
}
