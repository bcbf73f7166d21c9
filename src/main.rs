use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use shutterd::camera::{CameraDevice, CameraSettings, SimCamera};
use shutterd::config::Options;
use shutterd::http::{create_router, ApiDefaults, AppState};
use shutterd::session::SessionManager;
use shutterd::upload::{FfmpegTranscoder, MediaUploader};

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Options::parse();

    if opt.debug {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    info!("shutterd v{}", env!("CARGO_PKG_VERSION"));

    let camera: Arc<dyn CameraDevice> = Arc::new(SimCamera::new(CameraSettings {
        width: opt.width,
        height: opt.height,
        framerate: opt.framerate,
        rotation: opt.rotation,
        exposure_mode: opt.exposure_mode.clone(),
    }));

    let transcoder = Arc::new(FfmpegTranscoder::new(opt.ffmpeg_bin.clone()));
    let uploader = Arc::new(MediaUploader::new(
        opt.upload_endpoint.clone(),
        opt.token.clone(),
        transcoder,
        opt.upload_workers,
    ));
    let manager = SessionManager::new(
        Arc::clone(&camera),
        Arc::clone(&uploader),
        Duration::from_secs_f64(opt.session_timeout),
        opt.module_id.clone(),
    );

    let state = AppState {
        camera,
        manager: Arc::clone(&manager),
        uploader: Arc::clone(&uploader),
        defaults: Arc::new(ApiDefaults {
            delay: opt.delay,
            timeout: opt.timeout,
            capture_interval: opt.capture_interval,
            bitrate: opt.bitrate,
            quality: opt.quality,
            module_id: opt.module_id.clone(),
            upload_root: opt.upload_root.clone(),
        }),
    };

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind((opt.bind.as_str(), opt.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    // Tear down an active session and let the upload queue drain before exit.
    manager.destroy_silently().await;
    uploader.dispose().await;

    Ok(())
}
