use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::session::Session;
use crate::camera::CameraDevice;
use crate::error::{CameraError, SessionError};
use crate::media::{extension_for, MediaItem, TIMESTAMP_FORMAT};
use crate::upload::MediaUploader;

/// Holds zero or one `Session` plus its watchdog timer.
///
/// Constructed once at process start and handed around as an `Arc`; the held
/// session is replaced across create/destroy cycles. The single-session
/// invariant is enforced here: creating a second session while one exists is
/// rejected, not queued.
pub struct SessionManager {
    camera: Arc<dyn CameraDevice>,
    uploader: Arc<MediaUploader>,
    current: Arc<Mutex<Option<Arc<Session>>>>,
    watchdog: Arc<Mutex<Option<JoinHandle<()>>>>,
    timeout: Duration,
    module_id: String,
}

impl SessionManager {
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        uploader: Arc<MediaUploader>,
        timeout: Duration,
        module_id: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            camera,
            uploader,
            current: Arc::new(Mutex::new(None)),
            watchdog: Arc::new(Mutex::new(None)),
            timeout,
            module_id,
        })
    }

    /// Create a new session and arm the watchdog.
    ///
    /// The returned session is not yet started; the caller must call
    /// `Session::start`. Fails if a session is already held.
    pub async fn create(
        self: &Arc<Self>,
        uid: i64,
        sid: String,
    ) -> Result<Arc<Session>, SessionError> {
        let mut current = self.current.lock().await;
        if current.is_some() {
            return Err(SessionError::AlreadyExists);
        }

        // A session destroyed before it ever started skips the stop sequence
        // and its stopping hook, leaving its watchdog armed. With the slot
        // empty any armed watchdog is stale; disarm it before arming a new
        // one so it can never fire against the successor.
        if let Some(stale) = self.watchdog.lock().await.take() {
            stale.abort();
            let _ = stale.await;
            debug!("Stale watchdog disarmed");
        }

        let session = Arc::new(Session::new(Arc::clone(&self.camera), uid, sid));

        // Cancel the watchdog as the first step of any stop sequence, so a
        // stale timer can never fire after a caller-initiated teardown.
        let watchdog_slot = Arc::downgrade(&self.watchdog);
        session
            .on_stopping
            .subscribe(move || {
                let watchdog_slot = watchdog_slot.clone();
                Box::pin(async move {
                    let Some(slot) = watchdog_slot.upgrade() else {
                        return;
                    };
                    let handle = slot.lock().await.take();
                    if let Some(handle) = handle {
                        handle.abort();
                        let _ = handle.await;
                        debug!("Watchdog cancelled");
                    }
                })
            })
            .await;

        // Release the slot once the session reaches its terminal state.
        let current_slot = Arc::downgrade(&self.current);
        session
            .on_disposed
            .subscribe(move || {
                let current_slot = current_slot.clone();
                Box::pin(async move {
                    if let Some(slot) = current_slot.upgrade() {
                        slot.lock().await.take();
                    }
                })
            })
            .await;

        let manager = Arc::downgrade(self);
        let timeout = self.timeout;
        let watchdog = tokio::spawn(async move {
            debug!(
                "Timeout watchdog armed; the session will be destroyed in {:.1}s",
                timeout.as_secs_f64()
            );
            tokio::time::sleep(timeout).await;
            let Some(manager) = manager.upgrade() else {
                return;
            };
            // Remove our own handle first so the stopping hook fired by the
            // destroy below finds the slot empty instead of aborting us
            // mid-teardown.
            manager.watchdog.lock().await.take();
            if manager.destroy_silently().await {
                warn!("Watchdog invoked. The session has been destroyed");
            }
        });
        *self.watchdog.lock().await = Some(watchdog);

        *current = Some(Arc::clone(&session));
        info!("{} created (timeout: {:.1}s)", session, self.timeout.as_secs_f64());
        Ok(session)
    }

    /// Current session, if any.
    pub async fn session(&self) -> Result<Arc<Session>, SessionError> {
        self.current
            .lock()
            .await
            .clone()
            .ok_or(SessionError::NotExists)
    }

    /// Stop and dispose the held session.
    ///
    /// Exactly one of several concurrent destroyers (callers or the watchdog)
    /// takes the session out of the slot and runs the stop sequence; the rest
    /// observe `NotExists`. With `upload` set, every captured item is handed
    /// to the uploader under a destination path derived from the owner id,
    /// session id, capture timestamp and inferred extension.
    pub async fn destroy(
        &self,
        upload: bool,
    ) -> Result<(Arc<Session>, Vec<String>), SessionError> {
        let session = self
            .current
            .lock()
            .await
            .take()
            .ok_or(SessionError::NotExists)?;

        let items = match session.stop().await {
            Ok(items) => items,
            Err(SessionError::Camera(CameraError::NotRecording)) => {
                // Created but never started; nothing was captured.
                session.dispose().await;
                Vec::new()
            }
            Err(e) => {
                session.dispose().await;
                return Err(e);
            }
        };

        let mut paths = Vec::new();
        if upload {
            for item in items {
                let path = self.destination_path(&session, &item);
                if let Err(e) = self.uploader.put(path.clone(), item).await {
                    warn!("Failed to enqueue {}: {}", path, e);
                }
                paths.push(path);
            }
            info!("{}: {} items queued for upload", session, paths.len());
        }

        Ok((session, paths))
    }

    /// `destroy(false)`, swallowing the no-session case. Returns whether a
    /// session was actually destroyed. This is the watchdog's path: a race
    /// it loses must be a silent no-op, never a double-dispose.
    pub async fn destroy_silently(&self) -> bool {
        match self.destroy(false).await {
            Ok(_) => true,
            Err(SessionError::NotExists) => false,
            Err(e) => {
                warn!("Silent destroy failed: {}", e);
                true
            }
        }
    }

    fn destination_path(&self, session: &Session, item: &MediaItem) -> String {
        format!(
            "{}/{}/{}-{}{}",
            session.uid(),
            session.sid(),
            self.module_id,
            item.captured_at.format(TIMESTAMP_FORMAT),
            extension_for(&item.mime_type)
        )
    }
}
