//! REST surface. Handlers are thin: parse, run one board operation inside
//! one store transaction, present the result.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{Local, Utc};
use serde_json::{json, Value};

use crate::board::{self, BoardError, Stats};
use crate::dto::{
    AgendaResponse, CreateSubtaskRequest, CreateTaskRequest, ListQuery, MatrixResponse,
    PositionRequest, Presenter, QuadrantRequest, ReorderRequest, SubtaskReorderResponse,
    TaskResponse, UpdateSubtaskRequest, UpdateTaskRequest,
};
use crate::model::Subtask;
use crate::settings::Settings;
use crate::store::Store;

// ── Shared state ───────────────────────────────────────────────

pub struct AppState {
    pub store: Store,
    pub settings: Settings,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    fn presenter(&self) -> Presenter {
        Presenter {
            today: Local::now().date_naive(),
            soon_window_days: self.settings.soon_window_days,
        }
    }
}

type ApiError = (StatusCode, String);

fn reject(e: BoardError) -> ApiError {
    let status = match &e {
        BoardError::TaskNotFound(_) | BoardError::SubtaskNotFound(_) => StatusCode::NOT_FOUND,
        BoardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BoardError::Store(_) => {
            tracing::error!(error = %e, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/reorder", post(reorder_tasks))
        .route(
            "/api/tasks/:id",
            get(get_task).put(update_task).patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/:id/position", patch(set_position))
        .route("/api/tasks/:id/quadrant", patch(set_quadrant))
        .route("/api/tasks/:id/subtasks", get(list_subtasks).post(create_subtask))
        .route("/api/tasks/:id/subtasks/reorder", post(reorder_subtasks))
        .route(
            "/api/tasks/:id/subtasks/:subtask_id",
            get(get_subtask).put(update_subtask).delete(delete_subtask),
        )
        .route("/api/matrix", get(matrix))
        .route("/api/agenda", get(agenda))
        .route("/api/stats", get(stats))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ── Tasks ──────────────────────────────────────────────────────

// GET /api/tasks
async fn list_tasks(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let (filter, sort) = query.into_parts().map_err(|e| reject(e.into()))?;
    let tasks = state
        .store
        .read(|r| board::list_tasks(r, &filter, sort))
        .map_err(reject)?;
    Ok(Json(state.presenter().tasks(tasks)))
}

// POST /api/tasks
async fn create_task(
    State(state): State<SharedState>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let task = state
        .store
        .write(|tx| board::create_task(tx, payload.into(), Utc::now()))
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(state.presenter().task(task))))
}

// GET /api/tasks/:id
async fn get_task(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state.store.read(|r| board::get_task(r, id)).map_err(reject)?;
    Ok(Json(state.presenter().task(task)))
}

// PUT|PATCH /api/tasks/:id
async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let updated = state
        .store
        .write(|tx| board::update_task(tx, id, payload.into(), Utc::now()))
        .map_err(reject)?;
    Ok(Json(state.presenter().task(updated.task)))
}

// DELETE /api/tasks/:id
async fn delete_task(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.store.write(|tx| board::delete_task(tx, id)).map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

// PATCH /api/tasks/:id/position
async fn set_position(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<PositionRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state
        .store
        .write(|tx| board::set_position(tx, id, payload.position, Utc::now()))
        .map_err(reject)?;
    Ok(Json(state.presenter().task(task)))
}

// PATCH /api/tasks/:id/quadrant
async fn set_quadrant(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<QuadrantRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state
        .store
        .write(|tx| board::set_quadrant(tx, id, payload.quadrant, Utc::now()))
        .map_err(reject)?;
    Ok(Json(state.presenter().task(task)))
}

// POST /api/tasks/reorder
async fn reorder_tasks(
    State(state): State<SharedState>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let tasks = state
        .store
        .write(|tx| board::set_positions_bulk(tx, &payload.items, Utc::now()))
        .map_err(reject)?;
    Ok(Json(state.presenter().tasks(tasks)))
}

// ── Subtasks ───────────────────────────────────────────────────

// GET /api/tasks/:id/subtasks
async fn list_subtasks(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<Subtask>>, ApiError> {
    let subtasks = state.store.read(|r| board::list_subtasks(r, id)).map_err(reject)?;
    Ok(Json(subtasks))
}

// POST /api/tasks/:id/subtasks
async fn create_subtask(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<CreateSubtaskRequest>,
) -> Result<(StatusCode, Json<Subtask>), ApiError> {
    let subtask = state
        .store
        .write(|tx| board::create_subtask(tx, id, payload.into(), Utc::now()))
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

// GET /api/tasks/:id/subtasks/:subtask_id
async fn get_subtask(
    State(state): State<SharedState>,
    Path((id, subtask_id)): Path<(u64, u64)>,
) -> Result<Json<Subtask>, ApiError> {
    let subtask = state
        .store
        .read(|r| board::get_subtask(r, id, subtask_id))
        .map_err(reject)?;
    Ok(Json(subtask))
}

// PUT /api/tasks/:id/subtasks/:subtask_id
async fn update_subtask(
    State(state): State<SharedState>,
    Path((id, subtask_id)): Path<(u64, u64)>,
    Json(payload): Json<UpdateSubtaskRequest>,
) -> Result<Json<Subtask>, ApiError> {
    let subtask = state
        .store
        .write(|tx| board::update_subtask(tx, id, subtask_id, payload.into()))
        .map_err(reject)?;
    Ok(Json(subtask))
}

// DELETE /api/tasks/:id/subtasks/:subtask_id
async fn delete_subtask(
    State(state): State<SharedState>,
    Path((id, subtask_id)): Path<(u64, u64)>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .write(|tx| board::delete_subtask(tx, id, subtask_id))
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/tasks/:id/subtasks/reorder
async fn reorder_subtasks(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<SubtaskReorderResponse>, ApiError> {
    let subtasks = state
        .store
        .write(|tx| board::set_subtask_positions_bulk(tx, id, &payload.items))
        .map_err(reject)?;
    Ok(Json(subtasks.into()))
}

// ── Views ──────────────────────────────────────────────────────

// GET /api/matrix
async fn matrix(State(state): State<SharedState>) -> Result<Json<MatrixResponse>, ApiError> {
    let matrix = state.store.read(|r| board::matrix(r)).map_err(reject)?;
    Ok(Json(state.presenter().matrix(matrix)))
}

// GET /api/agenda
async fn agenda(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<AgendaResponse>, ApiError> {
    let (filter, sort) = query.into_parts().map_err(|e| reject(e.into()))?;
    let presenter = state.presenter();
    let agenda = state
        .store
        .read(|r| board::agenda(r, &filter, sort, presenter.today, presenter.soon_window_days))
        .map_err(reject)?;
    Ok(Json(presenter.agenda(agenda)))
}

// GET /api/stats
async fn stats(State(state): State<SharedState>) -> Result<Json<Stats>, ApiError> {
    let stats = state.store.read(|r| board::stats(r, Utc::now())).map_err(reject)?;
    Ok(Json(stats))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = Arc::new(AppState {
            store: Store::in_memory().unwrap(),
            settings: Settings::default(),
        });
        router(state)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn create(app: &Router, body: Value) -> u64 {
        let (status, task) = call(app, "POST", "/api/tasks", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        task["id"].as_u64().unwrap()
    }

    fn ids(list: &Value) -> Vec<u64> {
        list.as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = call(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn create_derives_quadrant_and_due_status() {
        let app = app();
        let (status, task) = call(
            &app,
            "POST",
            "/api/tasks",
            Some(json!({ "title": "  File taxes ", "urgent": true, "important": true, "tag": " Home " })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task["title"], "File taxes");
        assert_eq!(task["quadrant"], 1);
        assert_eq!(task["tag"], "home");
        assert_eq!(task["status"], "todo");
        assert_eq!(task["due_status"], "none");
    }

    #[tokio::test]
    async fn validation_failures_are_unprocessable() {
        let app = app();
        let (status, _) = call(&app, "POST", "/api/tasks", Some(json!({ "title": "   " }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(&app, "POST", "/api/tasks", Some(json!({ "title": "x", "quadrant": 7 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(&app, "GET", "/api/tasks?sort=random", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let app = app();
        let (status, _) = call(&app, "GET", "/api/tasks/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "PATCH", "/api/tasks/999", Some(json!({ "title": "y" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "DELETE", "/api/tasks/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn quadrant_patch_overrides_and_null_clears() {
        let app = app();
        let id = create(&app, json!({ "title": "a", "urgent": true })).await;

        let uri = format!("/api/tasks/{id}/quadrant");
        let (status, task) = call(&app, "PATCH", &uri, Some(json!({ "quadrant": 2 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(task["quadrant"], 2);
        assert_eq!(task["urgent"], false);
        assert_eq!(task["important"], true);

        let (_, task) = call(&app, "PATCH", &uri, Some(json!({ "quadrant": null }))).await;
        assert_eq!(task["quadrant"], Value::Null);

        let (_, matrix) = call(&app, "GET", "/api/matrix", None).await;
        assert_eq!(ids(&matrix["q2"]), vec![id]);
    }

    #[tokio::test]
    async fn bulk_reorder_then_sort_by_position() {
        let app = app();
        let a = create(&app, json!({ "title": "a" })).await;
        let b = create(&app, json!({ "title": "b" })).await;
        let c = create(&app, json!({ "title": "c" })).await;

        let items = json!({ "items": [
            { "id": c, "position": 0 },
            { "id": a, "position": 1 },
            { "id": b, "position": 2 },
            { "id": 4040, "position": 3 }
        ]});
        let (status, updated) = call(&app, "POST", "/api/tasks/reorder", Some(items)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated.as_array().unwrap().len(), 3);

        let (_, list) = call(&app, "GET", "/api/tasks?sort=position", None).await;
        assert_eq!(ids(&list), vec![c, a, b]);

        let uri = format!("/api/tasks/{b}/position");
        call(&app, "PATCH", &uri, Some(json!({ "position": -1 }))).await;
        let (_, list) = call(&app, "GET", "/api/tasks?sort=position", None).await;
        assert_eq!(ids(&list), vec![b, c, a]);
    }

    #[tokio::test]
    async fn completing_a_daily_task_creates_the_next_one() {
        let app = app();
        let id = create(
            &app,
            json!({ "title": "water plants", "due_date": "2025-01-10", "recurrence_pattern": "daily", "tag": "home" }),
        )
        .await;

        let uri = format!("/api/tasks/{id}");
        let (status, done) = call(&app, "PATCH", &uri, Some(json!({ "status": "done" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(done["completed_at"].is_string());

        let (_, open) = call(&app, "GET", "/api/tasks?status=todo", None).await;
        let open = open.as_array().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0]["title"], "water plants");
        assert_eq!(open[0]["due_date"], "2025-01-11");
        assert_eq!(open[0]["recurrence_pattern"], "daily");
        assert_eq!(open[0]["tag"], "home");
    }

    #[tokio::test]
    async fn list_filters_by_tag_and_text() {
        let app = app();
        let home = create(&app, json!({ "title": "Fix sink", "tag": "home" })).await;
        let work = create(&app, json!({ "title": "Write report", "description": "quarterly sink numbers", "tag": "work" })).await;

        let (_, list) = call(&app, "GET", "/api/tasks?tag=HOME", None).await;
        assert_eq!(ids(&list), vec![home]);

        let (_, list) = call(&app, "GET", "/api/tasks?q=report", None).await;
        assert_eq!(ids(&list), vec![work]);
    }

    #[tokio::test]
    async fn subtask_flow_and_cascade() {
        let app = app();
        let id = create(&app, json!({ "title": "move house" })).await;
        let base = format!("/api/tasks/{id}/subtasks");

        let (status, first) = call(&app, "POST", &base, Some(json!({ "title": "boxes" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, second) = call(&app, "POST", &base, Some(json!({ "title": "van" }))).await;
        let (s1, s2) = (first["id"].as_u64().unwrap(), second["id"].as_u64().unwrap());

        let (_, list) = call(&app, "GET", &base, None).await;
        assert_eq!(ids(&list), vec![s1, s2]);

        let reorder = json!({ "items": [{ "id": s2, "position": 0 }, { "id": s1, "position": 1 }] });
        let (_, body) = call(&app, "POST", &format!("{base}/reorder"), Some(reorder)).await;
        assert_eq!(body["updated"], json!([s2, s1]));
        let (_, list) = call(&app, "GET", &base, None).await;
        assert_eq!(ids(&list), vec![s2, s1]);

        let (_, sub) = call(&app, "PUT", &format!("{base}/{s1}"), Some(json!({ "status": "done" }))).await;
        assert_eq!(sub["status"], "done");

        let (status, _) = call(&app, "DELETE", &format!("/api/tasks/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &format!("/api/tasks/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, list) = call(&app, "GET", &base, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn stats_and_agenda_reflect_completion() {
        let app = app();
        let a = create(&app, json!({ "title": "a", "urgent": true, "important": true })).await;
        create(&app, json!({ "title": "b" })).await;
        call(&app, "PATCH", &format!("/api/tasks/{a}"), Some(json!({ "status": "done" }))).await;

        let (status, stats) = call(&app, "GET", "/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total"], 2);
        assert_eq!(stats["done"], 1);
        assert_eq!(stats["done_last_7_days"], 1);

        let (_, agenda) = call(&app, "GET", "/api/agenda", None).await;
        assert_eq!(ids(&agenda["done"]), vec![a]);
        assert_eq!(agenda["none"].as_array().unwrap().len(), 1);
    }
}
