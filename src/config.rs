use clap::Parser;

/// Camera capture daemon: records sessions and ships media to remote storage.
#[derive(Debug, Clone, Parser)]
#[command(name = "shutterd", version)]
pub struct Options {
    /// Image width in pixels
    #[arg(short = 'w', long, default_value_t = 1640)]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 1232)]
    pub height: u32,

    /// Frames per second to record
    #[arg(long = "fps", default_value_t = 40.0)]
    pub framerate: f64,

    /// Image rotation (0, 90, 180 or 270)
    #[arg(long, default_value_t = 0)]
    pub rotation: u16,

    /// Exposure mode
    #[arg(long, default_value = "sports")]
    pub exposure_mode: String,

    /// Video encoder bitrate
    #[arg(short = 'b', long, default_value_t = 6_000_000)]
    pub bitrate: u32,

    /// Quality the encoder should attempt to maintain
    #[arg(short = 'q', long, default_value_t = 17)]
    pub quality: u8,

    /// Default delay before a one-shot capture (seconds)
    #[arg(short = 'd', long, default_value_t = 0.0)]
    pub delay: f64,

    /// Default one-shot video duration (seconds)
    #[arg(short = 't', long, default_value_t = 5.0)]
    pub timeout: f64,

    /// Default image capture interval during a session (seconds)
    #[arg(long, default_value_t = 5.0)]
    pub capture_interval: f64,

    /// Idle timeout after which an abandoned session is destroyed (seconds)
    #[arg(long, default_value_t = 60.0)]
    pub session_timeout: f64,

    /// Storage endpoint accepting multipart uploads
    #[arg(long, default_value = "")]
    pub upload_endpoint: String,

    /// Public base URI the storage endpoint serves uploads under
    #[arg(long, default_value = "")]
    pub upload_root: String,

    /// Authentication token sent with every upload
    #[arg(long, default_value = "")]
    pub token: String,

    /// Identifier of this capture module, used in upload filenames
    #[arg(long, default_value = "01")]
    pub module_id: String,

    /// Number of concurrent upload workers
    #[arg(long, default_value_t = crate::upload::DEFAULT_WORKERS)]
    pub upload_workers: usize,

    /// ffmpeg binary used to repackage raw video into MP4
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg_bin: String,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Port to listen for capture requests
    #[arg(short = 'p', long, default_value_t = 8080)]
    pub port: u16,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}
