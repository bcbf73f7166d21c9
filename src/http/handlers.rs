use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::error::ApiError;
use super::state::AppState;
use crate::camera::{CameraDevice, CameraSettings, EncodingOptions};
use crate::error::{CameraError, SessionError};
use crate::media::{MediaItem, TIMESTAMP_FORMAT};
use crate::upload::MediaUploader;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub uid: i64,

    /// Digit-string of the form `YYYYmmddHHMMSS` naming the storage entry.
    pub entry_datetime: String,

    /// Seconds to wait before the shutter fires (default from CLI).
    pub delay: Option<f64>,

    /// Recording duration in seconds, video mode only (default from CLI).
    pub timeout: Option<f64>,

    /// "image" or "video" (default "video").
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub cmd: String,
    pub uid: Option<i64>,
    pub entry_datetime: Option<String>,
    pub capture_interval: Option<f64>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /camera — busy flag
pub async fn camera_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "recording": state.camera.is_recording().await }))
}

/// POST /camera — one-shot capture and upload, fire-and-forget
pub async fn capture_once(
    State(state): State<AppState>,
    payload: Result<Json<CaptureRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::validation(e.body_text()))?;

    if state.camera.is_recording().await {
        return Err(ApiError::camera_busy());
    }
    validate_entry_datetime(&req.entry_datetime)?;

    let defaults = &state.defaults;
    let delay = non_negative_secs(req.delay.unwrap_or(defaults.delay), "delay")?;
    let timeout = non_negative_secs(req.timeout.unwrap_or(defaults.timeout), "timeout")?;
    let mode = req.mode.as_deref().unwrap_or("video");

    let ext = match mode {
        "image" => ".jpg",
        "video" => ".mp4",
        other => {
            return Err(ApiError::validation(format!(
                "Unknown 'mode': {other}. should be either 'image' or 'video'."
            )))
        }
    };
    let path = format!(
        "{}/{}/{}-{}{}",
        req.uid,
        req.entry_datetime,
        defaults.module_id,
        Utc::now().format(TIMESTAMP_FORMAT),
        ext
    );

    let camera = Arc::clone(&state.camera);
    let uploader = Arc::clone(&state.uploader);
    let options = EncodingOptions {
        level: "4.2".to_string(),
        bitrate: defaults.bitrate,
        quality: defaults.quality,
    };
    let task_path = path.clone();
    if mode == "image" {
        tokio::spawn(async move {
            if let Err(e) = capture_image_and_upload(camera, uploader, delay, task_path).await {
                error!("One-shot image capture failed: {}", e);
            }
        });
    } else {
        tokio::spawn(async move {
            if let Err(e) =
                capture_video_and_upload(camera, uploader, delay, timeout, options, task_path).await
            {
                error!("One-shot video capture failed: {}", e);
            }
        });
    }

    Ok(Json(json!({ "uri": join_url(&defaults.upload_root, &path) })).into_response())
}

/// GET /camera/settings
pub async fn get_camera_settings(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.camera.settings().await)
}

/// PUT /camera/settings
pub async fn put_camera_settings(
    State(state): State<AppState>,
    payload: Result<Json<CameraSettings>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(settings) = payload.map_err(|e| ApiError::validation(e.body_text()))?;

    if state.camera.is_recording().await {
        return Err(ApiError::camera_busy());
    }
    settings.validate().map_err(ApiError::validation)?;
    state
        .camera
        .apply_settings(settings)
        .await
        .map_err(|e| ApiError::from(SessionError::from(e)))?;

    Ok(Json(state.camera.settings().await).into_response())
}

/// GET /session?cmd=enter|exit|interrupt — session lifecycle
pub async fn session_command(
    State(state): State<AppState>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;
    let defaults = &state.defaults;

    match query.cmd.as_str() {
        "enter" => {
            let uid = query
                .uid
                .ok_or_else(|| ApiError::validation("A required parameter 'uid' is missing."))?;
            let entry_datetime = query.entry_datetime.ok_or_else(|| {
                ApiError::validation("A required parameter 'entry_datetime' is missing.")
            })?;
            validate_entry_datetime(&entry_datetime)?;
            let interval_secs = query.capture_interval.unwrap_or(defaults.capture_interval);
            if !interval_secs.is_finite() || interval_secs <= 0.0 {
                return Err(ApiError::validation(
                    "'capture_interval' should be a positive number of seconds.",
                ));
            }
            let interval = Duration::from_secs_f64(interval_secs);

            let session = state.manager.create(uid, entry_datetime).await?;
            let options = EncodingOptions {
                level: "4.2".to_string(),
                bitrate: defaults.bitrate,
                quality: defaults.quality,
            };
            if let Err(e) = session.start(interval, "jpeg", "h264", &options).await {
                if matches!(e, SessionError::Camera(CameraError::AlreadyRecording)) {
                    // The device was grabbed outside the session; the fresh
                    // session is unusable, throw it away.
                    state.manager.destroy_silently().await;
                }
                return Err(e.into());
            }

            Ok((
                StatusCode::CREATED,
                Json(json!({ "session": session.to_string() })),
            )
                .into_response())
        }
        "exit" => {
            let (session, uploads) = state.manager.destroy(true).await?;
            let prefix = format!("{}/{}/", session.uid(), session.sid());
            info!("{}: Session exited, media handed to uploader", session);
            Ok(Json(json!({
                "session": session.to_string(),
                "uri": join_url(&defaults.upload_root, &prefix),
                "uploads": uploads,
            }))
            .into_response())
        }
        "interrupt" => {
            let (session, _) = state.manager.destroy(false).await?;
            Ok(Json(json!({ "session": session.to_string() })).into_response())
        }
        other => Err(ApiError::validation(format!(
            "Unknown cmd={other}. should be one of [enter, exit, interrupt]."
        ))),
    }
}

// ============================================================================
// One-shot capture helpers
// ============================================================================

async fn capture_image_and_upload(
    camera: Arc<dyn CameraDevice>,
    uploader: Arc<MediaUploader>,
    delay: Duration,
    path: String,
) -> anyhow::Result<()> {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let data = camera.capture_still("jpeg").await?;
    let item = MediaItem::image(data, "image/jpeg".to_string());
    uploader.put(path, item).await?;
    Ok(())
}

async fn capture_video_and_upload(
    camera: Arc<dyn CameraDevice>,
    uploader: Arc<MediaUploader>,
    delay: Duration,
    timeout: Duration,
    options: EncodingOptions,
    path: String,
) -> anyhow::Result<()> {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let started_at = Utc::now();
    camera.start_recording("h264", &options).await?;
    tokio::time::sleep(timeout).await;
    let raw = camera.stop_recording().await?;
    let framerate = camera.framerate().await;
    // Tagged with the delivered container type; the worker repackages the
    // raw stream into MP4 before the POST.
    let item = MediaItem::video(raw, "video/mp4".to_string(), started_at, framerate);
    uploader.put(path, item).await?;
    Ok(())
}

fn non_negative_secs(value: f64, name: &str) -> Result<Duration, ApiError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ApiError::validation(format!(
            "'{name}' should be a non-negative number of seconds."
        )));
    }
    Ok(Duration::from_secs_f64(value))
}

fn validate_entry_datetime(entry: &str) -> Result<(), ApiError> {
    if entry.is_empty() || !entry.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation(
            "'entry_datetime' should be the form of 'YYYYmmddHHMMSS'",
        ));
    }
    Ok(())
}

fn join_url(root: &str, path: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), path)
}
