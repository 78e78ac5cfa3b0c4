use rocket::serde::json::Json;
use rocket::{catch, get, Request, State};
use serde::Serialize;
use serde_json::{json, Value};

use mediachain::{BlueprintSummary, Capabilities};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BlueprintListResponse {
    pub blueprints: Vec<BlueprintSummary>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub capabilities: Capabilities,
}

#[get("/blueprints")]
pub fn list_blueprints(state: &State<AppState>) -> Json<BlueprintListResponse> {
    Json(BlueprintListResponse {
        blueprints: state.engine.list_blueprints(),
    })
}

#[get("/health")]
pub fn health(state: &State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        capabilities: state.engine.capabilities().clone(),
    })
}

#[catch(404)]
pub fn not_found(req: &Request<'_>) -> Json<Value> {
    Json(json!({ "error": format!("No route for {} {}", req.method(), req.uri().path()) }))
}

#[catch(422)]
pub fn unprocessable(_req: &Request<'_>) -> Json<Value> {
    Json(json!({ "error": "Request body could not be processed" }))
}

#[catch(default)]
pub fn default_catcher(status: rocket::http::Status, _req: &Request<'_>) -> Json<Value> {
    Json(json!({ "error": status.reason().unwrap_or("Request failed") }))
}
