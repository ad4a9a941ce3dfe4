use crate::models::{AppState, Error, JobRecord, JobStatus};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use problemdetails::Problem;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/:id", get(get_by_id).delete(cancel_by_id))
        .with_state(state)
}

#[derive(Deserialize)]
struct JobsQuery {
    status: Option<String>,
}

async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<Vec<JobRecord>>, Problem> {
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => Some(s.parse::<JobStatus>()?),
    };
    let jobs = state.queue.list_jobs(status).await?;
    Ok(Json(jobs))
}

async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, Problem> {
    let record = state
        .queue
        .get_result(&id)
        .await?
        .ok_or(Error::JobNotFound(id))?;
    Ok(Json(record))
}

async fn cancel_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, Problem> {
    let cancelled = state.queue.cancel(&id).await?;
    Ok(Json(json!({ "job_id": id, "cancelled": cancelled })))
}
