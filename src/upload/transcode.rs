use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::TranscodeError;

/// Repackages a raw video byte stream into a deliverable MP4.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn to_mp4(&self, raw: Vec<u8>, framerate: f64) -> Result<Vec<u8>, TranscodeError>;
}

/// Transcoder backed by an `ffmpeg` subprocess.
///
/// The raw stream is piped to stdin and the MP4 read back from stdout
/// (`empty_moov` so the container is valid without seeking). Diagnostics on
/// stderr are logged; only a non-zero exit fails the item.
pub struct FfmpegTranscoder {
    bin: String,
}

impl FfmpegTranscoder {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn to_mp4(&self, raw: Vec<u8>, framerate: f64) -> Result<Vec<u8>, TranscodeError> {
        debug!(
            "Transcoding {} raw bytes to MP4 (framerate: {})",
            raw.len(),
            framerate
        );

        let mut child = Command::new(&self.bin)
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-framerate",
                &framerate.to_string(),
                "-i",
                "-",
                "-an",
                "-c:v",
                "copy",
                "-f",
                "mp4",
                "-movflags",
                "empty_moov",
                "-",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("transcoder stdin not captured"))?;

        // Feed stdin from a separate task; writing and draining stdout from
        // the same task can deadlock once either pipe buffer fills up.
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&raw).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await?;

        if let Ok(Err(e)) = writer.await {
            // Usually a broken pipe after an early encoder exit; the exit
            // status below carries the real failure.
            debug!("Write to transcoder stdin failed: {}", e);
        }

        if !output.stderr.is_empty() {
            warn!(
                "Transcoder diagnostics: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        if !output.status.success() {
            return Err(TranscodeError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        debug!("Transcode complete ({} bytes)", output.stdout.len());
        Ok(output.stdout)
    }
}
