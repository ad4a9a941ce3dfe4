use crate::models::{AppState, Error};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use problemdetails::Problem;
use serde_json::Value;
use std::sync::Arc;
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks))
        .route("/tasks/:name/jobs", post(enqueue))
        .with_state(state)
}

async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.tasks.names())
}

async fn enqueue(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, Problem> {
    let args: Value = match body.is_empty() {
        true => Value::Null,
        false => serde_json::from_slice(&body).map_err(|_| Error::InvalidParams("body"))?,
    };
    let handle = state
        .tasks
        .get(&name)
        .ok_or_else(|| Error::TaskNotFound(name.clone()))?;

    let job_id = handle.enqueue(args).await?;
    debug!({ instance_id = %state.instance_id, job_id = %job_id, task = %name }, "==> enqueued");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::LOCATION,
        format!("/api/v1/jobs/{}", job_id).parse().unwrap(),
    );
    headers.insert("job-id", job_id.parse().unwrap());
    Ok((
        StatusCode::CREATED,
        headers,
        Json(serde_json::json!({ "job_id": job_id })),
    ))
}
