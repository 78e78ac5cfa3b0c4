use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::{get, post, State};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task::spawn_blocking;

use mediachain::run::DEFAULT_LIST_LIMIT;
use mediachain::Run;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub blueprint: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub labels: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub run: Run,
}

#[derive(Debug, Serialize)]
pub struct RunListResponse {
    pub runs: Vec<Run>,
}

#[post("/workflows/run", data = "<request>")]
pub async fn run_workflow(
    state: &State<AppState>,
    request: Result<Json<RunRequest>, json::Error<'_>>,
) -> ApiResult<(Status, Json<RunResponse>)> {
    let request = request
        .map_err(|e| ApiError::bad_request(format!("Invalid run request: {}", e)))?
        .into_inner();

    let engine = state.engine.clone();
    let run = spawn_blocking(move || {
        engine.run(&request.blueprint, request.inputs, request.labels)
    })
    .await??;

    Ok((Status::Accepted, Json(RunResponse { run })))
}

#[get("/workflows/<run_id>")]
pub async fn get_workflow(state: &State<AppState>, run_id: String) -> ApiResult<Json<RunResponse>> {
    let engine = state.engine.clone();
    let run = spawn_blocking(move || engine.get_run(&run_id)).await??;
    Ok(Json(RunResponse { run }))
}

#[get("/workflows?<limit>")]
pub async fn list_workflows(
    state: &State<AppState>,
    limit: Option<usize>,
) -> ApiResult<Json<RunListResponse>> {
    let engine = state.engine.clone();
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let runs = spawn_blocking(move || engine.list_runs(limit)).await??;
    Ok(Json(RunListResponse { runs }))
}

/// Polls the cloud service for rendering deliverables.
#[post("/workflows/<run_id>/refresh")]
pub async fn refresh_workflow(
    state: &State<AppState>,
    run_id: String,
) -> ApiResult<Json<RunResponse>> {
    let engine = state.engine.clone();
    let run = spawn_blocking(move || engine.refresh_run(&run_id)).await??;
    Ok(Json(RunResponse { run }))
}
