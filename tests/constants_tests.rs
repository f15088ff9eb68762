// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use rpicam_panel::backends::camera::{CameraVariant, max_shutter_index};
use rpicam_panel::constants::{
    DEFAULT_MANUAL_SHUTTER_INDEX, SHUTTERS, options, preview, shutter_label, shutter_micros,
    shutter_seconds, timing, video, zoom,
};

#[test]
fn test_shutter_table_is_ascending() {
    assert_eq!(SHUTTERS.len(), 75);
    for index in 1..SHUTTERS.len() {
        assert!(
            shutter_seconds(index) > shutter_seconds(index - 1),
            "shutter {} is not longer than shutter {}",
            index,
            index - 1
        );
    }
}

#[test]
fn test_shutter_lookups_clamp_index() {
    assert_eq!(shutter_seconds(500), 670.0);
    assert_eq!(shutter_label(500), "670");
    assert_eq!(shutter_micros(74), 670_000_000);
}

#[test]
fn test_default_manual_shutter() {
    assert_eq!(shutter_label(DEFAULT_MANUAL_SHUTTER_INDEX as usize), "1/144");
}

#[test]
fn test_max_shutter_per_variant() {
    let v2 = max_shutter_index(CameraVariant::V2.max_shutter_secs());
    assert_eq!(v2, 52);
    assert_eq!(shutter_label(v2 as usize), "11");

    // No sensor may reach past the end of the table
    for variant in CameraVariant::ALL {
        let index = max_shutter_index(variant.max_shutter_secs());
        assert!((0..SHUTTERS.len() as i32).contains(&index), "{variant:?}");
        assert!(shutter_seconds(index as usize) <= variant.max_shutter_secs().max(1.0 / 3.0));
    }
}

#[test]
fn test_option_tables() {
    assert_eq!(options::MODES[0], "manual");
    assert_eq!(options::STILL_ENCODINGS.len(), options::STILL_EXTENSIONS.len());
    assert_eq!(options::CODECS.len(), options::CODEC_EXTENSIONS.len());
    assert_eq!(options::CODECS[0], "h264");
    assert_eq!(options::AWB[1], "auto");
    assert_eq!(options::HISTOGRAMS[0], "OFF");
}

#[test]
fn test_video_tables_line_up() {
    assert_eq!(video::WIDTHS.len(), video::HEIGHTS.len());
    assert_eq!(video::WIDTHS.len(), video::MAX_FPS.len());
    assert_eq!(video::WIDTHS.len(), video::V3_MAX_FPS.len());
    assert_eq!((video::WIDTHS[10], video::HEIGHTS[10]), (1920, 1080));
    assert!(video::MAX_FPS.iter().all(|fps| *fps > 0));
}

#[test]
fn test_zoom_tables() {
    assert_eq!(zoom::WIDTHS.len(), zoom::HEIGHTS.len());
    for row in zoom::STILL_CROPS {
        // Innermost crop first
        for pair in row.windows(2) {
            assert!(pair[0].0 < pair[1].0 && pair[0].1 < pair[1].1);
        }
    }
}

#[test]
fn test_preview_and_timing_defaults() {
    assert!(preview::MIN_MANUAL_FPS <= preview::MAX_MANUAL_FPS as f64);
    assert!(preview::FRAME_PATTERN.contains("%d"));
    assert!(timing::RESTART_SETTLE < timing::POLL_INTERVAL * 10);
    assert_eq!(timing::SEGMENT_SENTINEL_SECS, 5);
}
