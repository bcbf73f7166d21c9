use thiserror::Error;

/// Errors raised by a camera device on misuse or hardware failure.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("the camera is already recording")]
    AlreadyRecording,

    #[error("the camera is not recording")]
    NotRecording,

    #[error("camera device error: {0}")]
    Device(String),
}

/// Session lifecycle errors. These are expected, recoverable conditions
/// translated to distinct HTTP status codes at the boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a running session already exists")]
    AlreadyExists,

    #[error("no running session")]
    NotExists,

    #[error("the session has already been disposed")]
    Invalid,

    #[error(transparent)]
    Camera(#[from] CameraError),
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("transcoder I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transcoder exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("video item is missing a frame rate")]
    MissingFramerate,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("storage endpoint rejected the upload: {0}")]
    Rejected(reqwest::StatusCode),

    #[error("the upload queue is closed")]
    QueueClosed,
}

impl SessionError {
    /// Short machine-readable name, used in API error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::AlreadyExists => "SessionAlreadyExists",
            SessionError::NotExists => "SessionNotExists",
            SessionError::Invalid => "SessionInvalid",
            SessionError::Camera(CameraError::AlreadyRecording) => "AlreadyRecording",
            SessionError::Camera(CameraError::NotRecording) => "NotRecording",
            SessionError::Camera(CameraError::Device(_)) => "CameraError",
        }
    }
}
