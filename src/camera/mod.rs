//! Camera device abstraction
//!
//! The daemon never talks to hardware directly; everything goes through the
//! `CameraDevice` trait so sessions and one-shot captures can be driven by a
//! real driver or by the simulated device used in development and tests.

mod sim;

pub use sim::SimCamera;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CameraError;

/// Exposure modes accepted by `CameraSettings`.
pub const EXPOSURE_MODES: &[&str] = &[
    "off",
    "auto",
    "night",
    "nightpreview",
    "backlight",
    "spotlight",
    "sports",
    "snow",
    "beach",
    "verylong",
    "fixedfps",
    "antishake",
    "fireworks",
];

/// Tunable device parameters, exposed over `GET/PUT /camera/settings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub framerate: f64,
    pub rotation: u16,
    pub exposure_mode: String,
}

impl CameraSettings {
    /// Range-check settings before they reach the device.
    pub fn validate(&self) -> Result<(), String> {
        if !(640..=3280).contains(&self.width) {
            return Err(format!("'width' out of range: {}", self.width));
        }
        if !(480..=2464).contains(&self.height) {
            return Err(format!("'height' out of range: {}", self.height));
        }
        if !(0.0..=90.0).contains(&self.framerate) {
            return Err(format!("'framerate' out of range: {}", self.framerate));
        }
        if ![0, 90, 180, 270].contains(&self.rotation) {
            return Err("'rotation' must be one of [0, 90, 180, 270]".to_string());
        }
        if !EXPOSURE_MODES.contains(&self.exposure_mode.as_str()) {
            return Err(format!("unknown 'exposure_mode': {}", self.exposure_mode));
        }
        Ok(())
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 1640,
            height: 1232,
            framerate: 40.0,
            rotation: 0,
            exposure_mode: "sports".to_string(),
        }
    }
}

/// Video encoder parameters passed through to the device when recording.
#[derive(Debug, Clone)]
pub struct EncodingOptions {
    /// H.264 level, e.g. "4.2".
    pub level: String,
    pub bitrate: u32,
    pub quality: u8,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            level: "4.2".to_string(),
            bitrate: 6_000_000,
            quality: 17,
        }
    }
}

/// Contract for a camera device.
///
/// Misuse (starting while recording, stopping while idle) must raise the
/// distinguishable `AlreadyRecording` / `NotRecording` conditions.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Trigger the shutter once and return the encoded image bytes.
    async fn capture_still(&self, format: &str) -> Result<Vec<u8>, CameraError>;

    /// Begin recording video in the given raw container format.
    async fn start_recording(
        &self,
        format: &str,
        options: &EncodingOptions,
    ) -> Result<(), CameraError>;

    /// Stop recording and return the accumulated raw video stream.
    async fn stop_recording(&self) -> Result<Vec<u8>, CameraError>;

    async fn is_recording(&self) -> bool;

    async fn framerate(&self) -> f64;

    async fn settings(&self) -> CameraSettings;

    async fn apply_settings(&self, settings: CameraSettings) -> Result<(), CameraError>;
}
