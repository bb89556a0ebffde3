//! HTTP API: application state, router, and handlers.
//!
//! Handlers are thin: a role gate where the route requires one, then a
//! call into `taskforge-core`.  Ownership rules (who may reopen a todo,
//! delete a message, and so on) live in the core, not here.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    middleware,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use taskforge_core::dto::{
    AuthResponse, CollabItemDetail, CollabRow, FinisherRow, FinisherTodoDetail, ItemSummary,
    LoginRequest, MessageDto, NewItemRequest, NewMessageRequest, ParticipationDetail,
    RegisterRequest, TodoDto, TodoItemDto, TodoRequest, TodoStats,
};
use taskforge_core::{auth, items, leaderboard, messages, todos, ApiError, ROLE_ADMIN};
use taskforge_store::Database;

use crate::auth::{issue_token, AuthPrincipal, JwtKeys};
use crate::config::ServerConfig;
use crate::error::{error_details, ApiFailure};

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let jwt = Arc::new(JwtKeys::new(config.jwt_secret.as_bytes()));
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            jwt,
        }
    }

    /// Lock the database for the duration of one handler call.
    pub fn db(&self) -> Result<MutexGuard<'_, Database>, ApiFailure> {
        self.db
            .lock()
            .map_err(|_| ApiFailure(ApiError::Internal("database lock poisoned".to_string())))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/pending-review", get(pending_review_todos))
        .route("/api/todos/reviewed", get(reviewed_todos))
        .route("/api/todos/overdue", get(overdue_todos))
        .route("/api/todos/stats", get(todo_stats))
        .route("/api/todos/leaderboard/collab", get(collab_board))
        .route("/api/todos/leaderboard/collab/{user_id}/items", get(collab_details))
        .route("/api/todos/leaderboard/finish-by-id", get(finisher_board))
        .route(
            "/api/todos/leaderboard/finish/{user_id}/todos-by-id",
            get(finisher_details),
        )
        .route(
            "/api/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/api/todos/{id}/complete", patch(complete_todo))
        .route("/api/todos/{id}/in-complete", patch(incomplete_todo))
        .route("/api/todos/{id}/review", put(review_todo))
        .route("/api/todos/{id}/participation", get(participation_stats))
        .route("/api/todos/{id}/participation-detail", get(participation_detail))
        .route("/api/todos/{todo_id}/items", get(list_items).post(add_item))
        .route("/api/todos/{todo_id}/items/summary", get(item_summary))
        .route("/api/todos/{todo_id}/items/{item_id}", delete(delete_item))
        .route("/api/todos/{todo_id}/items/{item_id}/complete", patch(complete_item))
        .route(
            "/api/todos/{todo_id}/items/{item_id}/incomplete",
            patch(incomplete_item),
        )
        .route(
            "/api/todos/{todo_id}/messages",
            get(list_messages).post(post_message),
        )
        .route(
            "/api/todos/{todo_id}/messages/{message_id}",
            delete(delete_message),
        )
        .layer(middleware::from_fn(error_details))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the task is cancelled.
pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP API listening");
    axum::serve(listener, router).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Health & auth
// ---------------------------------------------------------------------------

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, String), ApiFailure> {
    let message = auth::register(&*state.db()?, &req)?;
    Ok((StatusCode::CREATED, message))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiFailure> {
    let db = state.db()?;
    let user = auth::authenticate(&db, &req.username_or_email, &req.password)?;
    let roles = db.roles_for_user(user.id).map_err(ApiError::from)?;
    drop(db);

    let role = if roles.iter().any(|r| r == ROLE_ADMIN) {
        Some(ROLE_ADMIN.to_string())
    } else {
        roles.first().cloned()
    };

    let access_token = issue_token(&state.jwt, &user.username, state.config.token_ttl_secs)?;
    info!(username = %user.username, "login succeeded");

    Ok(Json(AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        first_name: user.first_name,
        last_name: user.last_name,
        role,
    }))
}

// ---------------------------------------------------------------------------
// Todos
// ---------------------------------------------------------------------------

async fn list_todos(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<TodoDto>>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(todos::get_all_todos(&*state.db()?)?))
}

async fn create_todo(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(req): Json<TodoRequest>,
) -> Result<(StatusCode, Json<TodoDto>), ApiFailure> {
    principal.require_admin()?;
    let dto = todos::add_todo(&*state.db()?, &req)?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn get_todo(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<i64>,
) -> Result<Json<TodoDto>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(todos::get_todo(&*state.db()?, id)?))
}

async fn update_todo(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<i64>,
    Json(req): Json<TodoRequest>,
) -> Result<Json<TodoDto>, ApiFailure> {
    principal.require_admin()?;
    Ok(Json(todos::update_todo(&*state.db()?, id, &req)?))
}

async fn delete_todo(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<i64>,
) -> Result<String, ApiFailure> {
    principal.require_admin()?;
    todos::delete_todo(&*state.db()?, id)?;
    Ok("Todo deleted successfully!".to_string())
}

async fn complete_todo(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<i64>,
) -> Result<Json<TodoDto>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(todos::complete_todo(&*state.db()?, &principal, id)?))
}

async fn incomplete_todo(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<i64>,
) -> Result<Json<TodoDto>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(todos::incomplete_todo(&*state.db()?, &principal, id)?))
}

async fn review_todo(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<i64>,
) -> Result<Json<TodoDto>, ApiFailure> {
    principal.require_admin()?;
    Ok(Json(todos::review_todo(&*state.db()?, &principal, id)?))
}

async fn pending_review_todos(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<TodoDto>>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(todos::get_pending_review_todos(&*state.db()?)?))
}

async fn reviewed_todos(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<TodoDto>>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(todos::get_reviewed_todos(&*state.db()?)?))
}

async fn overdue_todos(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<TodoDto>>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(todos::get_overdue_todos(&*state.db()?)?))
}

async fn todo_stats(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<TodoStats>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(todos::get_todo_statistics(&*state.db()?)?))
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

async fn list_items(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(todo_id): Path<i64>,
) -> Result<Json<Vec<TodoItemDto>>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(items::list_items(&*state.db()?, todo_id)?))
}

async fn add_item(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(todo_id): Path<i64>,
    Json(req): Json<NewItemRequest>,
) -> Result<(StatusCode, Json<TodoItemDto>), ApiFailure> {
    principal.require_admin()?;
    let dto = items::add_item(&*state.db()?, todo_id, &req)?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn item_summary(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(todo_id): Path<i64>,
) -> Result<Json<ItemSummary>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(items::item_summary(&*state.db()?, todo_id)?))
}

async fn delete_item(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((todo_id, item_id)): Path<(i64, i64)>,
) -> Result<String, ApiFailure> {
    principal.require_admin()?;
    items::delete_item(&*state.db()?, todo_id, item_id)?;
    Ok("Todo item deleted successfully!".to_string())
}

async fn complete_item(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((_todo_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<TodoItemDto>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(items::complete_item(&*state.db()?, &principal, item_id)?))
}

async fn incomplete_item(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((_todo_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<TodoItemDto>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(items::uncomplete_item(&*state.db()?, &principal, item_id)?))
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

async fn list_messages(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(todo_id): Path<i64>,
) -> Result<Json<Vec<MessageDto>>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(messages::list_messages(&*state.db()?, todo_id)?))
}

async fn post_message(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(todo_id): Path<i64>,
    Json(req): Json<NewMessageRequest>,
) -> Result<(StatusCode, Json<MessageDto>), ApiFailure> {
    principal.require_user()?;
    let dto = messages::add_message(&*state.db()?, &principal, todo_id, &req)?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn delete_message(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((todo_id, message_id)): Path<(i64, i64)>,
) -> Result<String, ApiFailure> {
    principal.require_user()?;
    messages::delete_message(&*state.db()?, &principal, todo_id, message_id)?;
    Ok("Message deleted successfully!".to_string())
}

// ---------------------------------------------------------------------------
// Participation & leaderboards
// ---------------------------------------------------------------------------

async fn participation_stats(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<i64>,
) -> Result<Json<std::collections::HashMap<String, i64>>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(leaderboard::participation_stats(&*state.db()?, id)?))
}

async fn participation_detail(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<i64>,
) -> Result<Json<ParticipationDetail>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(leaderboard::participation_detail(
        &*state.db()?,
        &principal,
        id,
    )?))
}

async fn collab_board(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<CollabRow>>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(leaderboard::collab_board(&*state.db()?)?))
}

async fn collab_details(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<CollabItemDetail>>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(leaderboard::collab_details(&*state.db()?, user_id)?))
}

async fn finisher_board(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<FinisherRow>>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(leaderboard::finisher_board(&*state.db()?)?))
}

async fn finisher_details(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<FinisherTodoDetail>>, ApiFailure> {
    principal.require_user()?;
    Ok(Json(leaderboard::finisher_details(&*state.db()?, user_id)?))
}
