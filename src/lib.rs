pub mod camera;
pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod session;
pub mod upload;

pub use camera::{CameraDevice, CameraSettings, EncodingOptions, SimCamera};
pub use config::Options;
pub use error::{CameraError, SessionError, TranscodeError, UploadError};
pub use http::{create_router, ApiDefaults, AppState};
pub use media::{extension_for, MediaItem, TIMESTAMP_FORMAT};
pub use session::{Event, Session, SessionManager};
pub use upload::{FfmpegTranscoder, MediaUploader, Transcoder, DEFAULT_WORKERS};
