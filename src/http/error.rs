use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::error::{CameraError, SessionError};

/// API-level failure, rendered as the structured `{msg, type, code}` payload.
///
/// Lifecycle violations map to distinct status codes so clients can tell
/// "retry later" (429) apart from "bad request" (400) and "nothing to act
/// on" (404).
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            msg: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "ValidationError", msg)
    }

    pub fn camera_busy() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "AlreadyRecording",
            "The camera is busy.",
        )
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        let status = match &e {
            SessionError::AlreadyExists => StatusCode::CONFLICT,
            SessionError::NotExists => StatusCode::NOT_FOUND,
            SessionError::Invalid => StatusCode::BAD_REQUEST,
            SessionError::Camera(CameraError::AlreadyRecording) => StatusCode::TOO_MANY_REQUESTS,
            SessionError::Camera(CameraError::NotRecording) => StatusCode::BAD_REQUEST,
            SessionError::Camera(CameraError::Device(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let msg = match &e {
            SessionError::AlreadyExists => "Running session already exists.".to_string(),
            SessionError::NotExists => "No running session.".to_string(),
            SessionError::Camera(CameraError::AlreadyRecording) => "The camera is busy.".to_string(),
            other => other.to_string(),
        };
        ApiError::new(status, e.kind(), msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "msg": self.msg,
            "type": self.kind,
            "code": self.status.as_u16(),
        });
        (self.status, Json(body)).into_response()
    }
}
