//! HTTP control surface
//!
//! Thin routing and parameter validation over the session/upload core:
//! - GET  /camera                — busy flag
//! - POST /camera                — one-shot capture + upload (fire-and-forget)
//! - GET/PUT /camera/settings    — device parameters
//! - GET  /session?cmd=enter|exit|interrupt — session lifecycle
//! - GET  /health                — health check
//!
//! Failures are rendered as `{msg, type, code}` with distinct status codes
//! (201 created, 400 malformed, 404 no session, 409 exists, 429 busy).

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{ApiDefaults, AppState};
