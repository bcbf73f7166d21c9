use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{CameraDevice, CameraSettings, EncodingOptions};
use crate::error::CameraError;

const JPEG_SOI: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];
const JPEG_EOI: &[u8] = &[0xFF, 0xD9];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const H264_START: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x67];

/// Software-simulated camera device.
///
/// Produces deterministic placeholder payloads with the right magic bytes so
/// the rest of the pipeline can be exercised without hardware. Used by the
/// default composition root and by the integration tests.
pub struct SimCamera {
    inner: Mutex<Inner>,
}

struct Inner {
    settings: CameraSettings,
    recording: Option<RecordingState>,
    shots: u64,
}

struct RecordingState {
    format: String,
    frames: u64,
}

impl SimCamera {
    pub fn new(settings: CameraSettings) -> Self {
        info!(
            "Simulated camera initialized ({}x{} @ {} fps)",
            settings.width, settings.height, settings.framerate
        );
        Self {
            inner: Mutex::new(Inner {
                settings,
                recording: None,
                shots: 0,
            }),
        }
    }
}

#[async_trait]
impl CameraDevice for SimCamera {
    async fn capture_still(&self, format: &str) -> Result<Vec<u8>, CameraError> {
        let mut inner = self.inner.lock().await;
        inner.shots += 1;
        let body = format!(
            "frame-{}-{}x{}",
            inner.shots, inner.settings.width, inner.settings.height
        )
        .into_bytes();

        let data = match format {
            "jpeg" => {
                let mut data = JPEG_SOI.to_vec();
                data.extend_from_slice(&body);
                data.extend_from_slice(JPEG_EOI);
                data
            }
            "png" => {
                let mut data = PNG_MAGIC.to_vec();
                data.extend_from_slice(&body);
                data
            }
            other => {
                return Err(CameraError::Device(format!(
                    "unsupported image format: {other}"
                )))
            }
        };

        debug!("Simulated still #{} captured ({} bytes)", inner.shots, data.len());
        Ok(data)
    }

    async fn start_recording(
        &self,
        format: &str,
        options: &EncodingOptions,
    ) -> Result<(), CameraError> {
        let mut inner = self.inner.lock().await;
        if inner.recording.is_some() {
            return Err(CameraError::AlreadyRecording);
        }
        debug!(
            "Simulated recording started (format={}, level={}, bitrate={}, quality={})",
            format, options.level, options.bitrate, options.quality
        );
        inner.recording = Some(RecordingState {
            format: format.to_string(),
            frames: 0,
        });
        Ok(())
    }

    async fn stop_recording(&self) -> Result<Vec<u8>, CameraError> {
        let mut inner = self.inner.lock().await;
        let recording = inner.recording.take().ok_or(CameraError::NotRecording)?;

        let mut data = H264_START.to_vec();
        data.extend_from_slice(
            format!("{}-stream-{}-frames", recording.format, recording.frames).as_bytes(),
        );
        debug!("Simulated recording stopped ({} bytes)", data.len());
        Ok(data)
    }

    async fn is_recording(&self) -> bool {
        self.inner.lock().await.recording.is_some()
    }

    async fn framerate(&self) -> f64 {
        self.inner.lock().await.settings.framerate
    }

    async fn settings(&self) -> CameraSettings {
        self.inner.lock().await.settings.clone()
    }

    async fn apply_settings(&self, settings: CameraSettings) -> Result<(), CameraError> {
        let mut inner = self.inner.lock().await;
        if inner.recording.is_some() {
            return Err(CameraError::AlreadyRecording);
        }
        inner.settings = settings;
        Ok(())
    }
}
