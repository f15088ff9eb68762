// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the parameter store

use rpicam_panel::backends::camera::{CameraProfile, CameraVariant};
use rpicam_panel::constants::{self, DEFAULT_MANUAL_SHUTTER_INDEX, timing};
use rpicam_panel::pipelines::{CaptureIntent, CompileEnv, compile};
use rpicam_panel::{CaptureConfig, Field, ParameterStore};
use std::path::PathBuf;

const VARIANTS: [CameraVariant; 8] = [
    CameraVariant::Unknown,
    CameraVariant::V1,
    CameraVariant::V2,
    CameraVariant::V3,
    CameraVariant::Hq,
    CameraVariant::Arducam16,
    CameraVariant::Arducam64,
    CameraVariant::GlobalShutter,
];

fn store(variant: CameraVariant) -> ParameterStore {
    ParameterStore::new(CaptureConfig::default(), CameraProfile::for_variant(variant, 0))
}

fn assert_in_bounds(store: &ParameterStore) {
    for field in Field::ALL {
        let (min, max) = store.bounds(field);
        let value = store.get(field);
        assert!(
            (min..=max).contains(&value),
            "{} = {} outside [{}, {}]",
            field,
            value,
            min,
            max
        );
    }
}

#[test]
fn test_clamping_is_idempotent() {
    for variant in VARIANTS {
        let mut store = store(variant);
        for field in Field::ALL {
            for raw in [i32::MIN, -1000, -1, 0, 1, 7, 50, 999, 100_000, i32::MAX] {
                store.set(field, raw);
                let once = store.snapshot();
                store.set(field, store.get(field));
                assert_eq!(store.snapshot(), once, "{} drifted on {:?}", field, variant);
            }
        }
        assert_in_bounds(&store);
    }
}

#[test]
fn test_recompute_bounds_is_stable() {
    for from in VARIANTS {
        for to in VARIANTS {
            let mut store = store(from);
            store.set(Field::Speed, 74);
            store.set(Field::Codec, 2);
            store.set(Field::Vformat, 21);
            store.set(Field::Fps, 120);

            let profile = CameraProfile::for_variant(to, 1);
            store.recompute_bounds(&profile);
            let once = store.snapshot();
            store.recompute_bounds(&profile);
            assert_eq!(store.snapshot(), once, "{:?} -> {:?}", from, to);
            assert_in_bounds(&store);
        }
    }
}

#[test]
fn test_timelapse_triple_stays_consistent() {
    let mut store = store(CameraVariant::Hq);
    let edits = [
        (Field::Tinterval, 30),
        (Field::Tshots, 50),
        (Field::Tduration, 3000),
        (Field::Tinterval, 7),
        (Field::Tshots, 999),
        (Field::Tinterval, 999),
        (Field::Tduration, 1),
        (Field::Speed, 60),
    ];
    for (field, value) in edits {
        store.set(field, value);
        let c = store.config();
        if c.tinterval > 0 {
            assert_eq!(c.tshots * c.tinterval, c.tduration, "after {} = {}", field, value);
            assert!(c.tduration <= rpicam_panel::app::state::MAX_TIMELAPSE_SECS);
        }
    }
}

#[test]
fn test_fps_follows_format_and_codec() {
    for variant in VARIANTS {
        let mut store = store(variant);
        store.set(Field::Fps, 1000);
        for codec in 0..3 {
            store.set(Field::Codec, codec);
            for vformat in [0, 5, 10, 15, 21] {
                store.set(Field::Vformat, vformat);
                store.set(Field::Fps, 1000);
                let c = store.config();
                let profile = store.profile();
                assert!(c.vformat <= profile.max_vformat(c.codec));
                assert!(c.fps <= profile.max_fps(c.vformat, c.codec, c.profile, c.vpreview != 0));
            }
        }
    }
}

#[test]
fn test_scenario_a_shutter_clamped_to_camera() {
    let mut store = store(CameraVariant::V2);
    let max_index = store.profile().max_shutter_index;
    assert!(max_index < 74);

    let value = store.set(Field::Speed, 74);
    assert_eq!(value, max_index);
    assert_eq!(
        store.shutter_label(),
        constants::shutter_label(max_index as usize),
        "label must follow the clamped index"
    );
    assert!(constants::shutter_seconds(max_index as usize) <= store.profile().max_shutter_secs);
    assert!(constants::shutter_seconds(max_index as usize + 1) > store.profile().max_shutter_secs);
}

#[test]
fn test_scenario_b_mode_switch() {
    let mut store = store(CameraVariant::V2);
    store.set(Field::Mode, 0);
    store.set(Field::Gain, 0);
    assert_eq!(store.get(Field::Gain), 0);

    store.set(Field::Mode, 1);
    assert_eq!(store.gain_label(), "Auto");
    assert_eq!(store.exposure_field(), Field::Ev);

    store.set(Field::Tinterval, 0);
    store.set(Field::Speed, 40);
    store.set(Field::Mode, 0);
    assert_eq!(store.exposure_field(), Field::Speed);
    assert_eq!(store.get(Field::Speed), DEFAULT_MANUAL_SHUTTER_INDEX);
    assert_eq!(
        store.config().shutter_micros(),
        constants::shutter_micros(DEFAULT_MANUAL_SHUTTER_INDEX as usize)
    );
    assert_ne!(store.gain_label(), "Auto");
}

#[test]
fn test_scenario_c_continuous_timelapse_sentinel() {
    for shots in [1, 10, 999] {
        let mut store = store(CameraVariant::V3);
        store.set(Field::Tshots, shots);
        store.set(Field::Tinterval, 0);
        assert_eq!(store.get(Field::Tduration), timing::SEGMENT_SENTINEL_SECS);
        assert_eq!(store.get(Field::Tduration), 5);
    }
}

#[test]
fn test_scenario_d_codec_change_reclamps_format() {
    let mut store = store(CameraVariant::V2);
    let h264_max = store.profile().max_vformat(0);
    let mjpeg_max = store.profile().max_vformat(1);
    assert!(mjpeg_max > h264_max);

    // mjpeg unlocks the larger formats
    store.set(Field::Codec, 1);
    assert_eq!(store.set(Field::Vformat, 99), mjpeg_max);
    store.set(Field::Fps, 1000);

    // and going back to h264 pulls the format and its frame rate back down
    store.set(Field::Codec, 0);
    let c = store.config();
    assert_eq!(c.vformat, h264_max);
    assert!(c.fps <= store.profile().max_fps(c.vformat, 0, c.profile, c.vpreview != 0));
}

#[test]
fn test_scenario_e_zoom_roi_is_centred() {
    let mut store = store(CameraVariant::V3);
    store.set(Field::V3FocusMode, 2);
    store.set(Field::Zoom, 3);

    let env = CompileEnv {
        preview_size: (800, 600),
        pictures_dir: PathBuf::from("/home/pi/Pictures"),
        videos_dir: PathBuf::from("/home/pi/Videos"),
        preview_dir: PathBuf::from("/run/shm"),
        stream_port: 5000,
        arducam_autofocus: false,
        tool_dir: None,
        timestamp: "240307090502".to_string(),
    };
    let plan = compile(store.config(), store.profile(), &CaptureIntent::Preview, &env);
    let roi: Vec<f64> = plan
        .arg_value("--roi")
        .expect("zoomed preview carries a region of interest")
        .split(',')
        .map(|v| v.parse().unwrap())
        .collect();

    assert_eq!(roi.len(), 4);
    assert!(roi.iter().all(|v| (0.0..=1.0).contains(v)));
    assert!(roi[2] < 1.0 && roi[3] < 1.0);
    assert!((roi[0] + roi[2] / 2.0 - 0.5).abs() < 1e-9);
    assert!((roi[1] + roi[3] / 2.0 - 0.5).abs() < 1e-9);
}

#[test]
fn test_zoom_clears_focus_window() {
    let mut store = store(CameraVariant::V3);
    assert!(store.set_focus_spot(200, 150, (800, 600)));
    assert!(store.config().focus_window.is_some());
    store.set(Field::Zoom, 1);
    assert!(store.config().focus_window.is_none());
    assert!(!store.set_focus_spot(200, 150, (800, 600)));
}
