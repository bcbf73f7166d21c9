use std::sync::Arc;

use crate::camera::CameraDevice;
use crate::session::SessionManager;
use crate::upload::MediaUploader;

/// Request-independent defaults for capture parameters, taken from the CLI
/// options at startup. Individual requests may override the timings.
#[derive(Debug, Clone)]
pub struct ApiDefaults {
    /// Delay before a one-shot capture, in seconds.
    pub delay: f64,
    /// Duration of a one-shot video capture, in seconds.
    pub timeout: f64,
    /// Interval between session stills, in seconds.
    pub capture_interval: f64,
    pub bitrate: u32,
    pub quality: u8,
    pub module_id: String,
    /// Public base URI the storage endpoint serves uploads under.
    pub upload_root: String,
}

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub camera: Arc<dyn CameraDevice>,
    pub manager: Arc<SessionManager>,
    pub uploader: Arc<MediaUploader>,
    pub defaults: Arc<ApiDefaults>,
}
