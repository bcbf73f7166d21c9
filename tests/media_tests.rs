// Unit tests for media item construction and extension inference.

use chrono::{TimeZone, Utc};
use shutterd::media::{extension_for, MediaItem, TIMESTAMP_FORMAT};

#[test]
fn extension_inference() {
    assert_eq!(extension_for("image/jpeg"), ".jpg");
    assert_eq!(extension_for("image/JPEG"), ".jpg");
    assert_eq!(extension_for("image/png"), ".png");
    assert_eq!(extension_for("video/H264"), ".mp4");
    assert_eq!(extension_for("video/mp4"), ".mp4");

    // Unknown types upload with an empty extension.
    assert_eq!(extension_for("image/gif"), "");
    assert_eq!(extension_for("application/pdf"), "");
}

#[test]
fn image_items_carry_no_framerate() {
    let item = MediaItem::image(vec![0xFF, 0xD8], "image/jpeg".to_string());
    assert_eq!(item.mime_type, "image/jpeg");
    assert!(item.framerate.is_none());
    assert!(!item.is_video());
}

#[test]
fn video_items_require_framerate_and_keep_their_start_time() {
    let started = Utc.with_ymd_and_hms(2024, 1, 1, 12, 5, 0).unwrap();
    let item = MediaItem::video(vec![0, 0, 0, 1], "video/H264".to_string(), started, 40.0);
    assert!(item.is_video());
    assert_eq!(item.framerate, Some(40.0));
    assert_eq!(item.captured_at, started);
}

#[test]
fn timestamp_format_is_compact() {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    assert_eq!(at.format(TIMESTAMP_FORMAT).to_string(), "20240101120000");
}
