// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the command compiler

use rpicam_panel::backends::camera::{CameraProfile, CameraVariant};
use rpicam_panel::pipelines::{CaptureIntent, CompileEnv, Completion, compile};
use rpicam_panel::{CaptureConfig, Field, ParameterStore};
use std::path::PathBuf;
use std::time::Duration;

const TIMESTAMP: &str = "240307090502";

fn env() -> CompileEnv {
    CompileEnv {
        preview_size: (800, 600),
        pictures_dir: PathBuf::from("/home/pi/Pictures"),
        videos_dir: PathBuf::from("/home/pi/Videos"),
        preview_dir: PathBuf::from("/run/shm"),
        stream_port: 5000,
        arducam_autofocus: false,
        tool_dir: None,
        timestamp: TIMESTAMP.to_string(),
    }
}

fn store(variant: CameraVariant) -> ParameterStore {
    ParameterStore::new(CaptureConfig::default(), CameraProfile::for_variant(variant, 0))
}

const INTENTS: [CaptureIntent; 6] = [
    CaptureIntent::Preview,
    CaptureIntent::Still { binned: false },
    CaptureIntent::Video,
    CaptureIntent::Stream,
    CaptureIntent::Timelapse {
        binned: false,
        shot: 0,
    },
    CaptureIntent::Timelapse {
        binned: false,
        shot: 3,
    },
];

#[test]
fn test_compile_is_deterministic() {
    for variant in [CameraVariant::V2, CameraVariant::V3, CameraVariant::Hq, CameraVariant::Arducam64] {
        let mut store = store(variant);
        for (field, value) in [(Field::Mode, 0), (Field::Speed, 30), (Field::Zoom, 2), (Field::Awb, 0)] {
            store.set(field, value);
            for intent in INTENTS {
                let first = compile(store.config(), store.profile(), &intent, &env());
                let second = compile(store.config(), store.profile(), &intent, &env());
                assert_eq!(first, second);
                assert_eq!(first.command_line(), second.command_line());
            }
        }
    }
}

#[test]
fn test_still_plan() {
    let store = store(CameraVariant::Hq);
    let plan = compile(
        store.config(),
        store.profile(),
        &CaptureIntent::Still { binned: false },
        &env(),
    );

    let expected = PathBuf::from("/home/pi/Pictures/240307090502.jpg");
    assert_eq!(plan.program, "rpicam-still");
    assert_eq!(plan.arg_value("--camera"), Some("0"));
    assert_eq!(plan.arg_value("-e"), Some("jpg"));
    assert_eq!(plan.arg_value("-o"), Some("/home/pi/Pictures/240307090502.jpg"));
    assert_eq!(plan.output.as_deref(), Some(expected.as_path()));
    assert_eq!(plan.completion, Completion::FileExists(expected));
    assert!(plan.capture_stdout);
    assert!(plan.has_flag("--metadata"));
    assert_eq!(plan.arg_value("--contrast"), Some("0.7"));
    assert_eq!(plan.arg_value("--brightness"), Some("0.0"));
    assert!(plan.command_line().starts_with("rpicam-still --camera 0 "));
}

#[test]
fn test_video_plan() {
    let mut store = store(CameraVariant::V2);
    store.set(Field::Vlen, 20);
    let plan = compile(store.config(), store.profile(), &CaptureIntent::Video, &env());

    assert_eq!(plan.program, "rpicam-vid");
    assert_eq!(plan.arg_value("-t"), Some("20000"));
    assert_eq!(plan.arg_value("-o"), Some("/home/pi/Videos/240307090502.h264"));
    assert_eq!(plan.completion, Completion::After(Duration::from_secs(20)));
    assert_eq!(plan.expected_duration(), Some(Duration::from_secs(20)));
    assert!(plan.is_bounded());

    store.set(Field::Codec, 1);
    let plan = compile(store.config(), store.profile(), &CaptureIntent::Video, &env());
    assert_eq!(plan.arg_value("--codec"), Some("mjpeg"));
    assert!(plan.arg_value("-o").is_some_and(|o| o.ends_with(".mjpeg")));
}

#[test]
fn test_stream_plan() {
    let mut store = store(CameraVariant::V3);
    store.set(Field::Vlen, 0);
    let plan = compile(store.config(), store.profile(), &CaptureIntent::Stream, &env());

    assert_eq!(plan.program, "rpicam-vid");
    assert!(plan.has_flag("--listen"));
    assert!(plan.has_flag("--inline"));
    assert_eq!(plan.arg_value("-o"), Some("tcp://0.0.0.0:5000"));
    assert_eq!(plan.arg_value("-t"), Some("0"));
    assert_eq!(plan.output, None);
    assert_eq!(plan.completion, Completion::UntilStopped);
    assert!(!plan.is_bounded());
}

#[test]
fn test_timelapse_sub_modes() {
    // automatic exposure with an interval: one signalled still process
    let mut store = store(CameraVariant::Hq);
    store.set(Field::Tinterval, 10);
    store.set(Field::Tshots, 6);
    let intent = CaptureIntent::Timelapse {
        binned: false,
        shot: 0,
    };
    let plan = compile(store.config(), store.profile(), &intent, &env());
    assert_eq!(plan.program, "rpicam-still");
    assert!(plan.has_flag("-s"));
    assert_eq!(plan.arg_value("-o"), Some("/home/pi/Pictures/240307090502_%04d.jpg"));
    assert_eq!(plan.trigger_interval, Some(Duration::from_secs(10)));
    assert!(matches!(plan.completion, Completion::FileCount { count: 6, .. }));

    // manual exposure: one process per shot, named by shot number
    store.set(Field::Mode, 0);
    let intent = CaptureIntent::Timelapse {
        binned: false,
        shot: 4,
    };
    let plan = compile(store.config(), store.profile(), &intent, &env());
    assert_eq!(plan.program, "rpicam-still");
    assert!(!plan.has_flag("-s"));
    assert_eq!(plan.arg_value("-o"), Some("/home/pi/Pictures/240307090502_4.jpg"));
    assert_eq!(plan.trigger_interval, None);

    // zero interval: one video process cutting a frame per segment
    store.set(Field::Tinterval, 0);
    let plan = compile(store.config(), store.profile(), &intent, &env());
    assert_eq!(plan.program, "rpicam-vid");
    assert_eq!(plan.arg_value("--segment"), Some("1"));
    assert_eq!(plan.arg_value("-t"), Some("5000"));
    assert_eq!(plan.completion, Completion::After(Duration::from_secs(6)));
}

#[test]
fn test_preview_plan_writes_frames_to_scratch() {
    let store = store(CameraVariant::V2);
    let plan = compile(store.config(), store.profile(), &CaptureIntent::Preview, &env());
    assert_eq!(plan.program, "rpicam-vid");
    assert_eq!(plan.arg_value("--codec"), Some("mjpeg"));
    assert_eq!(plan.arg_value("-t"), Some("0"));
    assert_eq!(plan.arg_value("-o"), Some("/run/shm/test%d.jpg"));
    assert_eq!(plan.completion, Completion::UntilStopped);
}

#[test]
fn test_fps_over_ceiling_is_clamped_not_rejected() {
    let mut store = store(CameraVariant::V2);
    store.set(Field::Vformat, 10);
    store.set(Field::Fps, 500);
    let plan = compile(store.config(), store.profile(), &CaptureIntent::Video, &env());
    let fps: i32 = plan.arg_value("--framerate").unwrap().parse().unwrap();
    let c = store.config();
    assert!(fps <= store.profile().max_fps(c.vformat, c.codec, c.profile, c.vpreview != 0));
}

#[test]
fn test_camera_slot_is_passed_through() {
    let store = ParameterStore::new(
        CaptureConfig::default(),
        CameraProfile::for_variant(CameraVariant::V2, 1),
    );
    let mut config = store.snapshot();
    config.camera = 1;
    for intent in INTENTS {
        let plan = compile(&config, store.profile(), &intent, &env());
        assert_eq!(plan.arg_value("--camera"), Some("1"), "{:?}", intent);
    }
}
