use chrono::{DateTime, Utc};
use tracing::warn;

/// Timestamp format used in upload filenames (`YYYYmmddHHMMSS`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One captured artifact (image or video) awaiting transformation/upload.
///
/// Immutable once constructed; ownership moves from the `Session` that
/// captured it to the `MediaUploader` at enqueue time.
#[derive(Debug, Clone)]
pub struct MediaItem {
    /// Raw payload bytes as produced by the camera device.
    pub data: Vec<u8>,

    /// MIME type, e.g. `image/jpeg`, `image/png` or `video/H264`.
    pub mime_type: String,

    /// When the artifact was captured (video: when recording started).
    pub captured_at: DateTime<Utc>,

    /// Frame rate of the recording. Required for video items; the
    /// transcoding step needs it to build a valid container.
    pub framerate: Option<f64>,
}

impl MediaItem {
    pub fn image(data: Vec<u8>, mime_type: String) -> Self {
        Self {
            data,
            mime_type,
            captured_at: Utc::now(),
            framerate: None,
        }
    }

    pub fn video(
        data: Vec<u8>,
        mime_type: String,
        captured_at: DateTime<Utc>,
        framerate: f64,
    ) -> Self {
        Self {
            data,
            mime_type,
            captured_at,
            framerate: Some(framerate),
        }
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

/// Infer the upload file extension from a MIME type.
///
/// Video payloads are always delivered as MP4 regardless of the raw codec.
/// Unrecognized types are uploaded with an empty extension.
pub fn extension_for(mime_type: &str) -> &'static str {
    if let Some(subtype) = mime_type.strip_prefix("image/") {
        match subtype.to_ascii_lowercase().as_str() {
            "jpeg" => ".jpg",
            "png" => ".png",
            _ => {
                warn!("No extension known for MIME type '{}'", mime_type);
                ""
            }
        }
    } else if mime_type.starts_with("video/") {
        ".mp4"
    } else {
        warn!("No extension known for MIME type '{}'", mime_type);
        ""
    }
}
