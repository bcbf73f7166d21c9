use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::hooks::Event;
use crate::camera::{CameraDevice, EncodingOptions};
use crate::error::{CameraError, SessionError};
use crate::media::MediaItem;

/// State held only while the session is recording.
struct ActiveRecording {
    started_at: DateTime<Utc>,
    video_mime: String,
    cancel: watch::Sender<bool>,
    capture_task: JoinHandle<()>,
}

/// One exclusive, time-bounded capture run.
///
/// Lifecycle: constructed poised to start, `start()` begins video recording
/// plus periodic still capture, `stop()` tears both down and returns the
/// captured items with the video last, `dispose()` is the idempotent terminal
/// operation. Exclusivity (at most one live session) is enforced by the
/// owning `SessionManager`, not here.
pub struct Session {
    uid: i64,
    sid: String,
    camera: Arc<dyn CameraDevice>,
    in_progress: AtomicBool,
    disposed: AtomicBool,
    items: Arc<Mutex<Vec<MediaItem>>>,
    active: Mutex<Option<ActiveRecording>>,

    /// Fired at the very beginning of the stop sequence, before any teardown.
    pub on_stopping: Event,

    /// Fired exactly once when the session reaches its terminal state.
    pub on_disposed: Event,
}

impl Session {
    pub fn new(camera: Arc<dyn CameraDevice>, uid: i64, sid: String) -> Self {
        Self {
            uid,
            sid,
            camera,
            in_progress: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            items: Arc::new(Mutex::new(Vec::new())),
            active: Mutex::new(None),
            on_stopping: Event::new(),
            on_disposed: Event::new(),
        }
    }

    pub fn uid(&self) -> i64 {
        self.uid
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Start video recording and periodic image capture.
    ///
    /// The first still is taken one full `image_interval` after the call, and
    /// captures never overlap: each shot is awaited inline before the next
    /// tick is observed.
    pub async fn start(
        &self,
        image_interval: Duration,
        image_format: &str,
        video_format: &str,
        options: &EncodingOptions,
    ) -> Result<(), SessionError> {
        info!("{}: Attempting to start", self);
        if self.disposed.load(Ordering::SeqCst) {
            return Err(SessionError::Invalid);
        }
        if self.in_progress.load(Ordering::SeqCst) {
            return Err(CameraError::AlreadyRecording.into());
        }

        let video_mime = format!("video/{}", video_format.to_uppercase());
        let started_at = Utc::now();
        self.camera.start_recording(video_format, options).await?;
        debug!(
            "{}: Video recording started at {} (MIME type: {})",
            self,
            started_at.to_rfc3339(),
            video_mime
        );

        let image_mime = format!("image/{}", image_format);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let capture_task = tokio::spawn(capture_images(
            Arc::clone(&self.camera),
            Arc::clone(&self.items),
            image_interval,
            image_format.to_string(),
            image_mime.clone(),
            cancel_rx,
        ));
        debug!(
            "{}: Continuous image capturing started (MIME type: {})",
            self, image_mime
        );

        *self.active.lock().await = Some(ActiveRecording {
            started_at,
            video_mime,
            cancel: cancel_tx,
            capture_task,
        });
        self.in_progress.store(true, Ordering::SeqCst);
        info!("{}: Session has started", self);
        Ok(())
    }

    /// Stop recording and return the captured items.
    ///
    /// Order matters: the "stopping" hooks complete first (the manager uses
    /// this to cancel the watchdog), then video recording stops, then the
    /// capture task is cancelled and joined, and only then is the video item
    /// appended, so it is always last in the returned list.
    pub async fn stop(&self) -> Result<Vec<MediaItem>, SessionError> {
        info!("{}: Attempting to stop", self);
        if self.disposed.load(Ordering::SeqCst) {
            return Err(SessionError::Invalid);
        }
        // Claim the stop; a concurrent stop or dispose loses here and never
        // runs the teardown sequence twice.
        if self
            .in_progress
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CameraError::NotRecording.into());
        }
        let Some(recording) = self.active.lock().await.take() else {
            return Err(CameraError::NotRecording.into());
        };

        self.on_stopping.fire().await;

        let video_stop = self.camera.stop_recording().await;

        // Cancel and join the capture loop before acting on the device
        // result; a failed video stop must not leak the loop.
        let _ = recording.cancel.send(true);
        if let Err(e) = recording.capture_task.await {
            error!("{}: Image capture task panicked: {}", self, e);
        }
        let raw_stream = video_stop?;

        let framerate = self.camera.framerate().await;
        let mut items = {
            let mut items = self.items.lock().await;
            std::mem::take(&mut *items)
        };
        items.push(MediaItem::video(
            raw_stream,
            recording.video_mime,
            recording.started_at,
            framerate,
        ));

        self.finalize().await;
        info!("{}: Stopped with {} items", self, items.len());
        Ok(items)
    }

    /// Idempotent terminal operation. Delegates to `stop()` while recording;
    /// items captured on that path are discarded.
    pub async fn dispose(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if self.in_progress.load(Ordering::SeqCst) {
            match self.stop().await {
                Ok(items) => debug!("{}: Discarded {} items on dispose", self, items.len()),
                Err(e) => warn!("{}: Stop during dispose failed: {}", self, e),
            }
            return;
        }
        self.finalize().await;
    }

    /// The `disposed` swap is the linearization point: exactly one caller
    /// sets the flag and fires the "disposed" hooks.
    async fn finalize(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.on_disposed.fire().await;
        info!("{} has been disposed", self);
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session(uid={}, sid='{}', in_progress={}, disposed={})",
            self.uid,
            self.sid,
            self.in_progress.load(Ordering::SeqCst),
            self.disposed.load(Ordering::SeqCst)
        )
    }
}

/// Periodic still-capture loop.
///
/// Cancellation is cooperative: the watch channel is observed at the select
/// point, and the caller joins the task before continuing, so an in-flight
/// shot always finishes before the session reports the capture loop stopped.
async fn capture_images(
    camera: Arc<dyn CameraDevice>,
    items: Arc<Mutex<Vec<MediaItem>>>,
    interval: Duration,
    image_format: String,
    image_mime: String,
    mut cancel: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.changed() => break,
            _ = ticker.tick() => {
                match camera.capture_still(&image_format).await {
                    Ok(data) => {
                        let item = MediaItem::image(data, image_mime.clone());
                        debug!(
                            "New image captured at {} ({} bytes)",
                            item.captured_at.to_rfc3339(),
                            item.data.len()
                        );
                        items.lock().await.push(item);
                    }
                    Err(e) => warn!("Still capture failed: {}", e),
                }
            }
        }
    }

    debug!(
        "Image capturing task finished ({} images)",
        items.lock().await.len()
    );
}
