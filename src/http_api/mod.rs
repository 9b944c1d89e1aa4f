use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::json;

use crate::{
    Database, NewSchedule, NewTask, Schedule, ScheduleFilter, ScheduleId, ScheduleStore,
    ScheduleUpdate, SqliteScheduleStore, SqliteTaskStore, StoreError, Task, TaskFilter, TaskId,
    TaskStore, TaskUpdate, ValidationError,
};

#[derive(Clone)]
pub struct AppState {
    schedules: Arc<dyn ScheduleStore>,
    tasks: Arc<dyn TaskStore>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self::with_stores(
            Arc::new(SqliteScheduleStore::new(db.clone())),
            Arc::new(SqliteTaskStore::new(db)),
        )
    }

    pub fn with_stores(schedules: Arc<dyn ScheduleStore>, tasks: Arc<dyn TaskStore>) -> Self {
        Self { schedules, tasks }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<ValidationError>,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String, Vec<ValidationError>),
    Internal,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into(), Vec::new())
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(err) => ApiError::Invalid(err.to_string(), vec![err]),
            StoreError::ScheduleNotFound(_) => ApiError::not_found("Schedule not found"),
            StoreError::TaskNotFound(_) => ApiError::not_found("Task not found"),
            StoreError::Storage(err) => {
                tracing::error!(error = %err, "storage failure");
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::invalid(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::invalid(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message, errors) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message, Vec::new()),
            ApiError::Invalid(message, errors) => {
                (StatusCode::BAD_REQUEST, "invalid_request", message, errors)
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error".to_string(),
                Vec::new(),
            ),
        };
        let body = Json(ErrorBody {
            error,
            message,
            errors,
        });
        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schedule", get(list_schedules).post(create_schedule))
        .route(
            "/schedule/:schedule_id",
            get(get_schedule).put(update_schedule).delete(delete_schedule),
        )
        .route("/task", get(list_tasks).post(create_task))
        .route(
            "/task/:task_id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, db: Database) -> std::io::Result<()> {
    let app = router(AppState::new(db));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Runs a store call on the blocking pool; SQLite I/O never runs on the
/// async workers.
async fn blocking<T, F>(call: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(call).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(err) => {
            tracing::error!(error = %err, "store call did not complete");
            Err(ApiError::Internal)
        }
    }
}

fn parse_schedule_id(raw: &str) -> Result<ScheduleId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found("Schedule not found"))
}

fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found("Task not found"))
}

async fn list_schedules(
    State(state): State<AppState>,
    filter: Result<Query<ScheduleFilter>, QueryRejection>,
) -> Result<Json<Vec<Schedule>>, ApiError> {
    let Query(filter) = filter?;
    let schedules = state.schedules.clone();
    Ok(Json(blocking(move || schedules.find_all(&filter)).await?))
}

async fn get_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<String>,
) -> Result<Json<Schedule>, ApiError> {
    let id = parse_schedule_id(&schedule_id)?;
    let schedules = state.schedules.clone();
    match blocking(move || schedules.find(id)).await? {
        Some(schedule) => Ok(Json(schedule)),
        None => Err(StoreError::ScheduleNotFound(id).into()),
    }
}

async fn create_schedule(
    State(state): State<AppState>,
    payload: Result<Json<NewSchedule>, JsonRejection>,
) -> Result<(StatusCode, Json<Schedule>), ApiError> {
    let Json(input) = payload?;
    let schedules = state.schedules.clone();
    let created = blocking(move || schedules.create(input)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<String>,
    payload: Result<Json<ScheduleUpdate>, JsonRejection>,
) -> Result<Json<Schedule>, ApiError> {
    let id = parse_schedule_id(&schedule_id)?;
    let Json(update) = payload?;
    let schedules = state.schedules.clone();
    Ok(Json(blocking(move || schedules.update(id, update)).await?))
}

async fn delete_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<String>,
) -> Result<Json<Schedule>, ApiError> {
    let id = parse_schedule_id(&schedule_id)?;
    let schedules = state.schedules.clone();
    Ok(Json(blocking(move || schedules.delete(id)).await?))
}

async fn list_tasks(
    State(state): State<AppState>,
    filter: Result<Query<TaskFilter>, QueryRejection>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let Query(filter) = filter?;
    let tasks = state.tasks.clone();
    Ok(Json(blocking(move || tasks.find_all(&filter)).await?))
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&task_id)?;
    let tasks = state.tasks.clone();
    match blocking(move || tasks.find(id)).await? {
        Some(task) => Ok(Json(task)),
        None => Err(StoreError::TaskNotFound(id).into()),
    }
}

async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(input) = payload?;
    let tasks = state.tasks.clone();
    let created = blocking(move || tasks.create(input)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    payload: Result<Json<TaskUpdate>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&task_id)?;
    let Json(update) = payload?;
    let tasks = state.tasks.clone();
    Ok(Json(blocking(move || tasks.update(id, update)).await?))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&task_id)?;
    let tasks = state.tasks.clone();
    Ok(Json(blocking(move || tasks.delete(id)).await?))
}
