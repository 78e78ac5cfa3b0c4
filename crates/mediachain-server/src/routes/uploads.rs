use std::path::Path;

use rocket::form::{Errors, Form, FromForm};
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{post, State};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::task::spawn_blocking;
use uuid::Uuid;

use mediachain::{IncomingUpload, UploadedAsset};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Staging area under the uploads directory for multipart payloads. Hidden
/// names never resolve as run sources.
const STAGING_DIR: &str = ".staging";

#[derive(FromForm, Debug)]
pub struct UploadForm<'r> {
    pub file: Option<TempFile<'r>>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub asset: UploadedAsset,
    /// Ready to pass as `inputs` to `POST /workflows/run`.
    pub inputs: Map<String, Value>,
}

/// Removes a staged payload the engine never adopted.
async fn discard(staged: &Path) {
    if let Err(e) = tokio::fs::remove_file(staged).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove staged upload: {}", e);
        }
    }
}

fn original_name(file: &TempFile<'_>) -> Option<String> {
    file.raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string())
}

#[post("/uploads", data = "<form>")]
pub async fn upload(
    state: &State<AppState>,
    form: Result<Form<UploadForm<'_>>, Errors<'_>>,
) -> ApiResult<(Status, Json<UploadResponse>)> {
    let form = match form {
        Ok(form) => form.into_inner(),
        Err(errors) => {
            let message = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ApiError::bad_request(format!(
                "Failed to parse upload form: {}",
                message
            )));
        }
    };

    let engine = state.engine.clone();
    let incoming = match form.file {
        Some(mut file) => {
            let staging = engine.assets().uploads_dir().join(STAGING_DIR);
            tokio::fs::create_dir_all(&staging).await?;
            let staged = staging.join(Uuid::new_v4().simple().to_string());
            let original_name = original_name(&file);
            if let Err(e) = file.move_copy_to(&staged).await {
                discard(&staged).await;
                return Err(e.into());
            }
            Some(IncomingUpload {
                original_name,
                staged,
            })
        }
        None => None,
    };

    let staged = incoming.as_ref().map(|i| i.staged.clone());
    let saved = spawn_blocking(move || {
        engine
            .assets()
            .save(incoming, form.title, form.description)
    })
    .await
    .map_err(ApiError::from)
    .and_then(|result| result.map_err(ApiError::from));
    let saved = match saved {
        Ok(saved) => saved,
        Err(e) => {
            if let Some(staged) = &staged {
                discard(staged).await;
            }
            return Err(e);
        }
    };

    log::info!("Stored upload {}", saved.asset.asset_id);

    let inputs = saved.manifest.to_inputs();
    Ok((
        Status::Created,
        Json(UploadResponse {
            asset: saved.asset,
            inputs,
        }),
    ))
}
