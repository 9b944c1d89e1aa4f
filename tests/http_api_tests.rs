#![cfg(feature = "http_api")]

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use schedule_store::{
    Database, NewSchedule, Schedule, ScheduleFilter, ScheduleId, ScheduleStore, ScheduleUpdate,
    SqliteTaskStore, StoreError, StoreResult, Task, http_api,
};
use std::sync::Arc;
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn new_router() -> axum::Router {
    let db = Database::open_in_memory().unwrap();
    http_api::router(http_api::AppState::new(db))
}

fn in_ms(ms: i64) -> String {
    (Utc::now() + Duration::milliseconds(ms)).to_rfc3339()
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn schedule_lifecycle_via_http_api() {
    let app = new_router();

    let (status, body) = send(
        &app,
        "POST",
        "/schedule",
        Some(json!({
            "account_id": 1,
            "agent_id": null,
            "start_time": in_ms(5_000),
            "tasks": [{ "type": "break", "duration": null, "start_time": null, "account_id": 1 }],
            "end_time": null
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Schedule = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(created.tasks.len(), 1);
    assert_eq!(body["tasks"][0]["type"], json!("break"));
    assert_eq!(body["tasks"][0]["account_id"], json!(1));
    assert_eq!(body["agent_id"], Value::Null);

    let (status, fetched) = send(&app, "GET", &format!("/schedule/{}", created.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);

    let task_id = created.tasks[0].id;
    let (status, _) = send(&app, "DELETE", &format!("/schedule/{}", created.id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &format!("/task/{task_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn past_start_time_returns_pointer() {
    let app = new_router();
    let (status, body) = send(
        &app,
        "POST",
        "/schedule",
        Some(json!({
            "account_id": 1,
            "start_time": in_ms(-10_000),
            "tasks": [{ "type": "break" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_request"));
    assert_eq!(body["errors"][0]["instancePath"], json!("/start_time"));
    assert_eq!(body["errors"][0]["message"], json!("must not be in the past"));

    let (_, listed) = send(&app, "GET", "/schedule", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn empty_or_missing_tasks_are_bad_requests() {
    let app = new_router();
    let (status, body) = send(
        &app,
        "POST",
        "/schedule",
        Some(json!({ "account_id": 1, "start_time": in_ms(10_000), "tasks": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["instancePath"], json!("/tasks"));

    let (status, body) = send(
        &app,
        "POST",
        "/schedule",
        Some(json!({ "account_id": 1, "start_time": in_ms(10_000) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("tasks"));
}

#[tokio::test]
async fn unknown_task_type_is_rejected() {
    let app = new_router();
    let (status, body) = send(
        &app,
        "POST",
        "/schedule",
        Some(json!({ "account_id": 1, "start_time": in_ms(10_000), "tasks": [{ "type": "nap" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_request"));
}

#[tokio::test]
async fn update_schedule_via_http_api() {
    let app = new_router();
    let (_, body) = send(
        &app,
        "POST",
        "/schedule",
        Some(json!({ "account_id": 1, "start_time": in_ms(10_000), "tasks": [{ "type": "break" }] })),
    )
    .await;
    let original: Schedule = serde_json::from_value(body).unwrap();

    let new_start = (original.start_time + Duration::milliseconds(15_000)).to_rfc3339();
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/schedule/{}", original.id),
        Some(json!({
            "start_time": new_start,
            "tasks": [{ "id": original.tasks[0].id, "type": "work" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated: Schedule = serde_json::from_value(body).unwrap();
    assert_eq!(
        updated.start_time,
        original.start_time + Duration::milliseconds(15_000)
    );
    assert_eq!(updated.tasks.len(), 1);
    assert_eq!(updated.tasks[0].id, original.tasks[0].id);
    assert_eq!(updated.tasks[0].task_type, schedule_store::TaskType::Work);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/schedule/{}", original.id),
        Some(json!({ "start_time": in_ms(-10_000) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = new_router();
    let missing = uuid_like();
    for uri in [
        format!("/schedule/{missing}"),
        format!("/task/{missing}"),
        "/schedule/later".to_string(),
    ] {
        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/schedule/{missing}"),
        Some(json!({ "agent_id": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &format!("/task/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_lifecycle_via_http_api() {
    let app = new_router();
    let (_, body) = send(
        &app,
        "POST",
        "/schedule",
        Some(json!({ "account_id": 3, "start_time": in_ms(10_000), "tasks": [{ "type": "break" }] })),
    )
    .await;
    let schedule: Schedule = serde_json::from_value(body).unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/task",
        Some(json!({ "schedule_id": schedule.id, "type": "work" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let task: Task = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(task.account_id, 3);
    assert_eq!(body["schedule"]["id"], json!(schedule.id));

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/task/{}", task.id),
        Some(json!({ "type": "break", "duration": 200 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], json!("break"));
    assert_eq!(body["duration"], json!(200));

    let (status, body) = send(&app, "GET", &format!("/task?schedule_id={}", schedule.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (status, _) = send(&app, "DELETE", &format!("/task/{}", task.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &format!("/task/{}", task.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/task",
        Some(json!({ "schedule_id": uuid_like(), "type": "work" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = new_router();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

fn uuid_like() -> String {
    schedule_store::ScheduleId::new().to_string()
}

struct BrokenSchedules;

fn storage_failure() -> StoreError {
    StoreError::Storage(rusqlite::Error::InvalidColumnName("secret_column".into()))
}

impl ScheduleStore for BrokenSchedules {
    fn find(&self, _id: ScheduleId) -> StoreResult<Option<Schedule>> {
        Err(storage_failure())
    }

    fn find_all(&self, _filter: &ScheduleFilter) -> StoreResult<Vec<Schedule>> {
        Err(storage_failure())
    }

    fn create(&self, _input: NewSchedule) -> StoreResult<Schedule> {
        Err(storage_failure())
    }

    fn update(&self, _id: ScheduleId, _update: ScheduleUpdate) -> StoreResult<Schedule> {
        Err(storage_failure())
    }

    fn delete(&self, _id: ScheduleId) -> StoreResult<Schedule> {
        Err(storage_failure())
    }
}

#[tokio::test]
async fn storage_failures_hide_driver_details() {
    let db = Database::open_in_memory().unwrap();
    let state = http_api::AppState::with_stores(
        Arc::new(BrokenSchedules),
        Arc::new(SqliteTaskStore::new(db)),
    );
    let app = http_api::router(state);

    let (status, body) = send(&app, "GET", "/schedule", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert_eq!(body["message"], "internal error");
    assert!(!body.to_string().contains("secret_column"));
}
