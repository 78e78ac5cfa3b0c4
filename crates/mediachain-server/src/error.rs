//! JSON error responses.

use std::io::Cursor;

use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use serde_json::json;

use mediachain::sanitize::redact_path;
use mediachain::{StoreError, UploadError, WorkflowError};

#[derive(Debug)]
pub struct ApiError {
    pub status: Status,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Status::InternalServerError, message)
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'o> {
        if self.status.code >= 500 {
            log::error!("{} {}", self.status, self.message);
        }

        let body = json!({ "error": self.message }).to_string();
        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        let status = match &err {
            WorkflowError::UnknownBlueprint(_) => Status::BadRequest,
            WorkflowError::RunNotFound(_) => Status::NotFound,
            // Ids that can never name a record.
            WorkflowError::Store(StoreError::InvalidRunId(_)) => Status::NotFound,
            WorkflowError::Store(_) | WorkflowError::Transcode(_) => Status::InternalServerError,
        };
        Self::new(status, err.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidUpload(_) => Self::bad_request(err.to_string()),
            UploadError::NotFound(path) => Self::new(
                Status::NotFound,
                format!("Upload not found: {}", redact_path(&path)),
            ),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Worker task failed: {}", err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(format!("IO error: {}", err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
