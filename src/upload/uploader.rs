use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::transcode::Transcoder;
use crate::error::{TranscodeError, UploadError};
use crate::media::MediaItem;

/// Default number of upload workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Asynchronous media-upload pipeline.
///
/// A fixed pool of workers drains one FIFO queue of
/// `(destination_path, MediaItem)` pairs: video payloads are transcoded to
/// MP4, then everything is shipped to the storage endpoint as a multipart
/// POST. The queue is unbounded on purpose; producers are capture sessions
/// that must never stall on upload. Failed items are logged and dropped,
/// never retried, and never take a worker down with them.
pub struct MediaUploader {
    tx: Mutex<Option<mpsc::UnboundedSender<(String, MediaItem)>>>,
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// Everything a worker needs, cloned once per worker at construction.
#[derive(Clone)]
struct WorkerContext {
    endpoint: String,
    token: String,
    client: reqwest::Client,
    transcoder: Arc<dyn Transcoder>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<(String, MediaItem)>>>,
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl MediaUploader {
    /// Start `workers` worker tasks sharing one queue.
    pub fn new(
        endpoint: String,
        token: String,
        transcoder: Arc<dyn Transcoder>,
        workers: usize,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(Mutex::new(rx));
        let pending = Arc::new(AtomicUsize::new(0));
        let drained = Arc::new(Notify::new());
        let client = reqwest::Client::new();

        let workers = workers.max(1);
        let handles = (0..workers)
            .map(|id| {
                let ctx = WorkerContext {
                    endpoint: endpoint.clone(),
                    token: token.clone(),
                    client: client.clone(),
                    transcoder: Arc::clone(&transcoder),
                    rx: Arc::clone(&rx),
                    pending: Arc::clone(&pending),
                    drained: Arc::clone(&drained),
                };
                tokio::spawn(worker_loop(id, ctx))
            })
            .collect();

        info!("Media uploader started with {} workers", workers);

        Self {
            tx: Mutex::new(Some(tx)),
            pending,
            drained,
            workers: Mutex::new(handles),
        }
    }

    /// Enqueue one item for upload. Non-blocking; ownership of the item
    /// transfers to the uploader.
    pub async fn put(&self, path: String, item: MediaItem) -> Result<(), UploadError> {
        let tx = self.tx.lock().await;
        let Some(tx) = tx.as_ref() else {
            return Err(UploadError::QueueClosed);
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        if tx.send((path, item)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(UploadError::QueueClosed);
        }
        Ok(())
    }

    /// Wait for the queue to fully drain, then shut the workers down.
    ///
    /// The queue is only closed once every previously enqueued item has been
    /// processed, so in-flight uploads are never dropped; idle workers then
    /// observe the close and exit, and all of them are joined.
    pub async fn dispose(&self) {
        loop {
            if self.pending.load(Ordering::SeqCst) == 0 {
                break;
            }
            self.drained.notified().await;
        }

        self.tx.lock().await.take();

        let mut workers = self.workers.lock().await;
        for handle in workers.drain(..) {
            if let Err(e) = handle.await {
                error!("Upload worker panicked: {}", e);
            }
        }
        info!("Media uploader disposed");
    }
}

async fn worker_loop(id: usize, ctx: WorkerContext) {
    debug!("worker-{}: started", id);
    loop {
        let next = {
            let mut rx = ctx.rx.lock().await;
            rx.recv().await
        };
        let Some((path, item)) = next else {
            break;
        };

        if let Err(e) = process_item(&ctx, &path, item).await {
            error!("worker-{}: Upload of '{}' failed, item dropped: {}", id, path, e);
        }

        if ctx.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            ctx.drained.notify_one();
        }
    }
    debug!("worker-{}: stopped", id);
}

async fn process_item(
    ctx: &WorkerContext,
    path: &str,
    item: MediaItem,
) -> Result<(), UploadError> {
    let MediaItem {
        mut data,
        mime_type,
        framerate,
        ..
    } = item;

    if mime_type.starts_with("video/") {
        let framerate = framerate.ok_or(TranscodeError::MissingFramerate)?;
        data = ctx.transcoder.to_mp4(data, framerate).await?;
    }

    let filename = path.rsplit('/').next().unwrap_or(path).to_string();
    let upload_path = format!("/{}", path.trim_start_matches('/'));
    let size = data.len();

    let part = Part::bytes(data)
        .file_name(filename.clone())
        .mime_str(&mime_type)?;
    let form = Form::new()
        .text("token", ctx.token.clone())
        .text("upload_path", upload_path.clone())
        .part("upload", part);

    info!(
        "Uploading {} ({} bytes) to {}",
        filename, size, upload_path
    );

    let response = ctx
        .client
        .post(&ctx.endpoint)
        .multipart(form)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(UploadError::Rejected(response.status()));
    }

    debug!("Upload of {} acknowledged: {}", filename, response.status());
    Ok(())
}
