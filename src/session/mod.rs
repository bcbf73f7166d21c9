//! Capture-session lifecycle
//!
//! This module provides:
//! - `Session`: the state machine for one exclusive recording run
//!   (continuous image capture plus a video recording)
//! - `SessionManager`: the single-session gate and watchdog timer
//! - `Event`: ordered async lifecycle hooks used by the stop sequence

mod hooks;
mod manager;
mod session;

pub use hooks::Event;
pub use manager::SessionManager;
pub use session::Session;
