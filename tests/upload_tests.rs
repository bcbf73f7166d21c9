// Integration tests for the MediaUploader worker pool
//
// A small axum server stands in for the remote storage endpoint and records
// every multipart POST it receives, so the tests can verify exactly-once
// delivery, the transcode-before-upload ordering for video, and that a
// failing item never takes its worker or unrelated items down.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{header, Request, StatusCode};
use axum::routing::post;
use axum::Router;
use serde_json::json;
use tokio::sync::Mutex;
use tower::ServiceExt;

use shutterd::camera::{CameraDevice, CameraSettings, EncodingOptions, SimCamera};
use shutterd::error::{TranscodeError, UploadError};
use shutterd::http::{create_router, ApiDefaults, AppState};
use shutterd::media::MediaItem;
use shutterd::session::SessionManager;
use shutterd::upload::{MediaUploader, Transcoder};

// ============================================================================
// In-test storage endpoint
// ============================================================================

#[derive(Debug, Default, Clone)]
struct ReceivedUpload {
    token: String,
    upload_path: String,
    filename: String,
    content_type: String,
    data: Vec<u8>,
}

#[derive(Clone, Default)]
struct Storage {
    uploads: Arc<Mutex<Vec<ReceivedUpload>>>,
}

async fn handle_upload(State(storage): State<Storage>, mut multipart: Multipart) -> StatusCode {
    let mut upload = ReceivedUpload::default();
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name().unwrap_or("") {
            "token" => upload.token = field.text().await.unwrap(),
            "upload_path" => upload.upload_path = field.text().await.unwrap(),
            "upload" => {
                upload.filename = field.file_name().unwrap_or("").to_string();
                upload.content_type = field.content_type().unwrap_or("").to_string();
                upload.data = field.bytes().await.unwrap().to_vec();
            }
            _ => {}
        }
    }
    storage.uploads.lock().await.push(upload);
    StatusCode::OK
}

async fn spawn_storage() -> (Storage, String) {
    let storage = Storage::default();
    let app = Router::new()
        .route("/upload", post(handle_upload))
        .with_state(storage.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/upload", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (storage, endpoint)
}

// ============================================================================
// Test transcoders
// ============================================================================

/// Prefixes the payload so tests can prove the transform ran before the POST.
struct TagTranscoder;

#[async_trait]
impl Transcoder for TagTranscoder {
    async fn to_mp4(&self, raw: Vec<u8>, _framerate: f64) -> Result<Vec<u8>, TranscodeError> {
        Ok([b"MP4:".as_slice(), &raw].concat())
    }
}

struct FailingTranscoder;

#[async_trait]
impl Transcoder for FailingTranscoder {
    async fn to_mp4(&self, _raw: Vec<u8>, _framerate: f64) -> Result<Vec<u8>, TranscodeError> {
        Err(TranscodeError::Io(std::io::Error::other("encoder exploded")))
    }
}

fn image_item(n: usize) -> MediaItem {
    MediaItem::image(format!("image-{n}").into_bytes(), "image/jpeg".to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn every_enqueued_item_is_uploaded_exactly_once() {
    let (storage, endpoint) = spawn_storage().await;
    let uploader = MediaUploader::new(
        endpoint,
        "secret-token".to_string(),
        Arc::new(TagTranscoder),
        4,
    );

    for n in 0..12 {
        uploader
            .put(format!("42/20240101120000/01-{n:02}.jpg"), image_item(n))
            .await
            .expect("put should succeed");
    }

    // dispose() must not return before the queue is fully drained.
    uploader.dispose().await;

    let uploads = storage.uploads.lock().await;
    assert_eq!(uploads.len(), 12);

    let mut paths: Vec<_> = uploads.iter().map(|u| u.upload_path.clone()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 12, "duplicate or lost uploads");

    for upload in uploads.iter() {
        assert_eq!(upload.token, "secret-token");
        assert!(upload.upload_path.starts_with('/'), "path must be absolute");
        assert_eq!(upload.content_type, "image/jpeg");
    }
}

#[tokio::test]
async fn video_items_are_transcoded_before_upload() {
    let (storage, endpoint) = spawn_storage().await;
    let uploader = MediaUploader::new(
        endpoint,
        "secret-token".to_string(),
        Arc::new(TagTranscoder),
        2,
    );

    let video = MediaItem::video(
        b"raw-h264-stream".to_vec(),
        "video/H264".to_string(),
        chrono::Utc::now(),
        30.0,
    );
    uploader
        .put("42/20240101120000/01-20240101120500.mp4".to_string(), video)
        .await
        .expect("put should succeed");
    uploader.dispose().await;

    let uploads = storage.uploads.lock().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].data, b"MP4:raw-h264-stream");
    assert_eq!(uploads[0].content_type, "video/H264");
    assert_eq!(uploads[0].filename, "01-20240101120500.mp4");
    assert_eq!(
        uploads[0].upload_path,
        "/42/20240101120000/01-20240101120500.mp4"
    );
}

#[tokio::test]
async fn transcode_failure_drops_only_the_affected_item() {
    let (storage, endpoint) = spawn_storage().await;
    // Single worker so the failing video is dequeued first.
    let uploader = MediaUploader::new(
        endpoint,
        "secret-token".to_string(),
        Arc::new(FailingTranscoder),
        1,
    );

    let video = MediaItem::video(
        b"raw".to_vec(),
        "video/H264".to_string(),
        chrono::Utc::now(),
        30.0,
    );
    uploader
        .put("42/s/video.mp4".to_string(), video)
        .await
        .expect("put should succeed");
    uploader
        .put("42/s/a.jpg".to_string(), image_item(0))
        .await
        .expect("put should succeed");
    uploader
        .put("42/s/b.jpg".to_string(), image_item(1))
        .await
        .expect("put should succeed");

    uploader.dispose().await;

    let uploads = storage.uploads.lock().await;
    let paths: Vec<_> = uploads.iter().map(|u| u.upload_path.as_str()).collect();
    assert_eq!(paths, vec!["/42/s/a.jpg", "/42/s/b.jpg"]);
}

#[tokio::test]
async fn video_without_framerate_is_dropped() {
    let (storage, endpoint) = spawn_storage().await;
    let uploader = MediaUploader::new(
        endpoint,
        "secret-token".to_string(),
        Arc::new(TagTranscoder),
        1,
    );

    let mut video = MediaItem::video(
        b"raw".to_vec(),
        "video/H264".to_string(),
        chrono::Utc::now(),
        30.0,
    );
    video.framerate = None;
    uploader
        .put("42/s/broken.mp4".to_string(), video)
        .await
        .expect("put should succeed");
    uploader
        .put("42/s/ok.jpg".to_string(), image_item(0))
        .await
        .expect("put should succeed");

    uploader.dispose().await;

    let uploads = storage.uploads.lock().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].upload_path, "/42/s/ok.jpg");
}

#[tokio::test]
async fn put_after_dispose_fails_with_queue_closed() {
    let (_storage, endpoint) = spawn_storage().await;
    let uploader = MediaUploader::new(
        endpoint,
        "secret-token".to_string(),
        Arc::new(TagTranscoder),
        2,
    );

    uploader.dispose().await;

    let result = uploader.put("42/s/late.jpg".to_string(), image_item(0)).await;
    assert!(matches!(result, Err(UploadError::QueueClosed)));
}

// One-shot POST /camera in video mode: the part shipped to storage must be
// tagged with the delivered container type, not the raw codec.
#[tokio::test]
async fn one_shot_video_uploads_as_mp4() {
    let (storage, endpoint) = spawn_storage().await;
    let camera: Arc<dyn CameraDevice> = Arc::new(SimCamera::new(CameraSettings::default()));
    let uploader = Arc::new(MediaUploader::new(
        endpoint,
        "secret-token".to_string(),
        Arc::new(TagTranscoder),
        2,
    ));
    let manager = SessionManager::new(
        Arc::clone(&camera),
        Arc::clone(&uploader),
        Duration::from_secs(300),
        "01".to_string(),
    );
    let app = create_router(AppState {
        camera,
        manager,
        uploader,
        defaults: Arc::new(ApiDefaults {
            delay: 0.0,
            timeout: 0.05,
            capture_interval: 5.0,
            bitrate: 6_000_000,
            quality: 17,
            module_id: "01".to_string(),
            upload_root: "http://storage.local/files".to_string(),
        }),
    });

    let body = json!({ "uid": 42, "entry_datetime": "20240101120000", "mode": "video" });
    let request = Request::builder()
        .method("POST")
        .uri("/camera")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The capture runs in the background; wait for the upload to land.
    let mut uploads = Vec::new();
    for _ in 0..100 {
        uploads = storage.uploads.lock().await.clone();
        if !uploads.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].content_type, "video/mp4");
    assert!(uploads[0].data.starts_with(b"MP4:"));
    assert!(uploads[0].upload_path.ends_with(".mp4"));
}

// End-to-end: session capture -> manager destroy(upload) -> storage endpoint.
#[tokio::test]
async fn session_media_reaches_the_storage_endpoint() {
    let (storage, endpoint) = spawn_storage().await;
    let camera = Arc::new(SimCamera::new(CameraSettings::default()));
    let uploader = Arc::new(MediaUploader::new(
        endpoint,
        "secret-token".to_string(),
        Arc::new(TagTranscoder),
        4,
    ));
    let manager = SessionManager::new(
        Arc::clone(&camera) as Arc<dyn CameraDevice>,
        Arc::clone(&uploader),
        Duration::from_secs(300),
        "07".to_string(),
    );

    let session = manager
        .create(42, "20240101120000".to_string())
        .await
        .expect("create should succeed");
    session
        .start(
            Duration::from_millis(200),
            "jpeg",
            "h264",
            &EncodingOptions::default(),
        )
        .await
        .expect("start should succeed");

    // Captures land at ~200ms and ~400ms.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let (_, paths) = manager.destroy(true).await.expect("destroy should succeed");
    assert_eq!(paths.len(), 3);

    uploader.dispose().await;

    let uploads = storage.uploads.lock().await;
    assert_eq!(uploads.len(), 3);

    let jpgs = uploads
        .iter()
        .filter(|u| u.upload_path.ends_with(".jpg"))
        .count();
    let mp4s: Vec<_> = uploads
        .iter()
        .filter(|u| u.upload_path.ends_with(".mp4"))
        .collect();
    assert_eq!(jpgs, 2);
    assert_eq!(mp4s.len(), 1);
    assert!(mp4s[0].data.starts_with(b"MP4:"));
    for upload in uploads.iter() {
        assert!(upload.upload_path.starts_with("/42/20240101120000/07-"));
    }
}
