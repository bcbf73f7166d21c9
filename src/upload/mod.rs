//! Asynchronous media-upload pipeline
//!
//! `MediaUploader` owns the FIFO queue and worker pool; `Transcoder` is the
//! seam to the external repackaging step (ffmpeg in production).

mod transcode;
mod uploader;

pub use transcode::{FfmpegTranscoder, Transcoder};
pub use uploader::{MediaUploader, DEFAULT_WORKERS};
