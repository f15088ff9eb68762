// SPDX-License-Identifier: GPL-3.0-only

//! Flag rules
//!
//! Each capture kind has an ordered table of rules. A rule is a named
//! condition plus an emitter; evaluating a table appends the flags of every
//! rule whose condition holds, in table order. Flag order is stable, so the
//! same snapshot always compiles to the same command line.

use super::format::{Roi, decimal, ratio};
use super::{CaptureIntent, CompileEnv, PlanKind};
use crate::app::state::{CaptureConfig, FocusWindow};
use crate::backends::camera::{CameraProfile, CameraVariant};
use crate::constants::{long_exposure, options, preview, timing, video, zoom};
use std::path::PathBuf;
use tracing::trace;

/// Everything a rule may look at
#[derive(Debug, Clone)]
pub struct CompileContext<'a> {
    pub config: &'a CaptureConfig,
    pub profile: &'a CameraProfile,
    pub intent: CaptureIntent,
    pub env: &'a CompileEnv,
    /// Output file or pattern chosen for this plan
    pub output: Option<PathBuf>,
}

impl<'a> CompileContext<'a> {
    pub fn new(
        config: &'a CaptureConfig,
        profile: &'a CameraProfile,
        intent: CaptureIntent,
        env: &'a CompileEnv,
        output: Option<PathBuf>,
    ) -> Self {
        Self {
            config,
            profile,
            intent,
            env,
            output,
        }
    }

    fn variant(&self) -> CameraVariant {
        self.profile.variant
    }

    fn is_v3(&self) -> bool {
        self.variant() == CameraVariant::V3
    }

    fn is_arducam(&self) -> bool {
        self.variant().is_arducam()
    }

    fn manual(&self) -> bool {
        self.config.is_manual_exposure()
    }

    fn shutter(&self) -> u64 {
        self.config.shutter_micros()
    }

    fn binned(&self) -> bool {
        matches!(
            self.intent,
            CaptureIntent::Still { binned: true } | CaptureIntent::Timelapse { binned: true, .. }
        )
    }

    fn output_arg(&self) -> String {
        self.output
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default()
    }

    fn small_preview(&self) -> bool {
        self.env.preview_size == (640, 480)
    }

    fn video_format(&self) -> (u32, u32) {
        let index = (self.config.vformat.max(0) as usize).min(video::WIDTHS.len() - 1);
        (video::WIDTHS[index], video::HEIGHTS[index])
    }

    fn codec(&self) -> &'static str {
        options::CODECS[self.config.codec.clamp(0, 3) as usize]
    }

    fn still_encoding(&self) -> &'static str {
        options::STILL_ENCODINGS[self.config.extn.clamp(0, 5) as usize]
    }
}

/// One named flag rule
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&CompileContext) -> bool,
    pub emit: fn(&CompileContext, &mut Vec<String>),
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

const fn rule(
    name: &'static str,
    applies: fn(&CompileContext) -> bool,
    emit: fn(&CompileContext, &mut Vec<String>),
) -> Rule {
    Rule {
        name,
        applies,
        emit,
    }
}

/// Apply a table to a context
pub fn evaluate(table: &[Rule], ctx: &CompileContext) -> Vec<String> {
    let mut args = Vec::new();
    for rule in table {
        if (rule.applies)(ctx) {
            let before = args.len();
            (rule.emit)(ctx, &mut args);
            trace!(rule = rule.name, flags = ?&args[before..], "Rule applied");
        }
    }
    args
}

/// Rule table for a plan kind
pub fn table(kind: PlanKind) -> &'static [Rule] {
    match kind {
        PlanKind::Preview => PREVIEW,
        PlanKind::Still => STILL,
        PlanKind::Video => VIDEO,
        PlanKind::Stream => STREAM,
        PlanKind::TimelapseTriggered => TIMELAPSE_TRIGGERED,
        PlanKind::TimelapseShot => TIMELAPSE_SHOT,
        PlanKind::TimelapseSegment => TIMELAPSE_SEGMENT,
    }
}

fn push(args: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    args.push(flag.to_string());
    args.push(value.into());
}

fn push_all(args: &mut Vec<String>, items: &[&str]) {
    args.extend(items.iter().map(|item| item.to_string()));
}

fn always(_: &CompileContext) -> bool {
    true
}

pub static PREVIEW: &[Rule] = &[
    rule("preview-base", always, preview_base),
    rule("brightness-contrast", always, brightness_contrast),
    rule("preview-exposure", always, preview_exposure),
    rule("preview-framerate", always, preview_framerate),
    rule("ev", has_ev, ev),
    rule("preview-gain-awb", always, preview_gain_awb),
    rule("metering", always, metering),
    rule("saturation", always, saturation),
    rule("sharpness", always, sharpness),
    rule("denoise", always, denoise),
    rule("quality", always, quality),
    rule("arducam-autofocus", arducam_continuous_af, arducam_autofocus),
    rule("autofocus-mode", autofocus_mode_applies, autofocus_mode),
    rule("autofocus-window", touch_window_applies, autofocus_window),
    rule("autofocus-speed", v3_speed_applies, autofocus_speed),
    rule("autofocus-range", v3_range_applies, autofocus_range),
    rule("hdr", hdr_applies, hdr),
    rule("scientific-tuning", scientific_applies, scientific_tuning),
    rule("manual-focus-tuning", preview_manual_tuning_applies, manual_focus_tuning),
    rule("preview-zoom-roi", preview_zoom_applies, preview_zoom_roi),
    rule("window-roi", window_zoom_applies, window_roi),
];

pub static STILL: &[Rule] = &[
    rule("still-base", always, still_base),
    rule("brightness-contrast", always, brightness_contrast),
    rule("jpg-rawfull", still_rawfull_applies, jpg_rawfull),
    rule("exposure", always, exposure),
    rule("ev", has_ev, ev),
    rule("still-gain-awb", always, still_gain_awb),
    rule("metering", always, metering),
    rule("saturation", always, saturation),
    rule("sharpness", always, sharpness),
    rule("quality", always, quality),
    rule("denoise", always, denoise),
    rule("arducam-autofocus", arducam_continuous_af, arducam_autofocus),
    rule("manual-focus-tuning", manual_tuning_applies, manual_focus_tuning),
    rule("autofocus-mode", autofocus_mode_applies, autofocus_mode),
    rule("autofocus-on-capture", on_capture_applies, autofocus_on_capture),
    rule("autofocus-window", still_window_applies, autofocus_window),
    rule("hdr", hdr_applies, hdr),
    rule("sensor-mode", is_arducam_64mp, sensor_mode),
    rule("still-zoom-roi", still_zoom_applies, still_zoom_roi),
    rule("window-roi", window_zoom_applies, window_roi),
    rule("metadata", always, metadata),
];

pub static VIDEO: &[Rule] = &[
    rule("video-base", always, video_base),
    rule("no-preview", video_preview_off, no_preview),
    rule("brightness-contrast", always, brightness_contrast),
    rule("video-size", always, video_size),
    rule("exposure", always, exposure),
    rule("gain", always, gain),
    rule("ev", has_ev, ev),
    rule("awb", always, awb),
    rule("metering", always, metering),
    rule("saturation", always, saturation),
    rule("sharpness", always, sharpness),
    rule("denoise", always, denoise),
    rule("arducam-autofocus", arducam_continuous_af, arducam_autofocus),
    rule("manual-focus-tuning", manual_tuning_applies, manual_focus_tuning),
    rule("autofocus-mode", autofocus_mode_applies, autofocus_mode),
    rule("autofocus-window", touch_window_applies, autofocus_window),
    rule("autofocus-speed", v3_speed_applies, autofocus_speed),
    rule("autofocus-range", v3_range_applies, autofocus_range),
    rule("hdr", hdr_applies, hdr),
    rule("preview-window", always, preview_window),
    rule("video-zoom-roi", video_zoom_applies, video_zoom_roi),
    rule("window-roi", window_zoom_applies, window_roi),
];

pub static STREAM: &[Rule] = &[
    rule("stream-base", always, stream_base),
    rule("no-preview", video_preview_off, no_preview),
    rule("brightness-contrast", always, brightness_contrast),
    rule("video-size", always, video_size),
    rule("exposure", always, exposure),
    rule("gain", always, gain),
    rule("ev", has_ev, ev),
    rule("awb", always, awb),
    rule("metering", always, metering),
    rule("saturation", always, saturation),
    rule("sharpness", always, sharpness),
    rule("denoise", always, denoise),
    rule("arducam-autofocus", arducam_continuous_af, arducam_autofocus),
    rule("manual-focus-tuning", manual_tuning_applies, manual_focus_tuning),
    rule("autofocus-mode", autofocus_mode_applies, autofocus_mode),
    rule("autofocus-window", touch_window_applies, autofocus_window),
    rule("autofocus-speed", v3_speed_applies, autofocus_speed),
    rule("autofocus-range", v3_range_applies, autofocus_range),
    rule("hdr", hdr_applies, hdr),
    rule("preview-window", always, preview_window),
    rule("video-zoom-roi", video_zoom_applies, video_zoom_roi),
    rule("window-roi", window_zoom_applies, window_roi),
];

pub static TIMELAPSE_TRIGGERED: &[Rule] = &[
    rule("triggered-base", always, triggered_base),
    rule("brightness-contrast", always, brightness_contrast),
    rule("jpg-rawfull", timelapse_rawfull_applies, jpg_rawfull),
    rule("exposure", always, exposure),
    rule("ev", has_ev, ev),
    rule("still-gain-awb", always, still_gain_awb),
    rule("metering", always, metering),
    rule("saturation", always, saturation),
    rule("sharpness", always, sharpness),
    rule("quality", always, quality),
    rule("denoise", always, denoise),
    rule("arducam-autofocus", arducam_continuous_af, arducam_autofocus),
    rule("manual-focus-tuning", manual_tuning_applies, manual_focus_tuning),
    rule("autofocus-mode", autofocus_mode_applies, autofocus_mode),
    rule("autofocus-on-capture", on_capture_applies, autofocus_on_capture),
    rule("autofocus-window", still_window_applies, autofocus_window),
    rule("hdr", hdr_applies, hdr),
    rule("sensor-mode", is_arducam_64mp, sensor_mode),
    rule("still-zoom-roi", still_zoom_applies, still_zoom_roi),
    rule("window-roi", window_zoom_applies, window_roi),
];

pub static TIMELAPSE_SHOT: &[Rule] = &[
    rule("shot-base", always, shot_base),
    rule("brightness-contrast", always, brightness_contrast),
    rule("jpg-rawfull", timelapse_rawfull_applies, jpg_rawfull),
    rule("exposure", always, exposure),
    rule("ev", has_ev, ev),
    rule("still-gain-awb", always, still_gain_awb),
    rule("metering", always, metering),
    rule("saturation", always, saturation),
    rule("sharpness", always, sharpness),
    rule("quality", always, quality),
    rule("denoise", always, denoise),
    rule("arducam-autofocus", arducam_continuous_af, arducam_autofocus),
    rule("manual-focus-tuning", manual_tuning_applies, manual_focus_tuning),
    rule("autofocus-mode", autofocus_mode_applies, autofocus_mode),
    rule("autofocus-on-capture", on_capture_applies, autofocus_on_capture),
    rule("autofocus-window", still_window_applies, autofocus_window),
    rule("hdr", hdr_applies, hdr),
    rule("sensor-mode", is_arducam_64mp, sensor_mode),
    rule("still-zoom-roi", still_zoom_applies, still_zoom_roi),
    rule("window-roi", window_zoom_applies, window_roi),
];

pub static TIMELAPSE_SEGMENT: &[Rule] = &[
    rule("segment-base", always, segment_base),
    rule("segment-size", always, segment_size),
    rule("brightness-contrast", always, brightness_contrast),
    rule("segment-exposure", always, segment_exposure),
    rule("ev", has_ev, ev),
    rule("segment-gain-awb", always, segment_gain_awb),
    rule("metering", always, metering),
    rule("saturation", always, saturation),
    rule("sharpness", always, sharpness),
    rule("denoise", always, denoise),
    rule("arducam-autofocus", arducam_continuous_af, arducam_autofocus),
    rule("manual-focus-tuning", manual_tuning_applies, manual_focus_tuning),
    rule("autofocus-mode", autofocus_mode_applies, autofocus_mode),
    rule("autofocus-window", segment_window_applies, autofocus_window),
    rule("hdr", hdr_applies, hdr),
    rule("segment-zoom-roi", segment_zoom_applies, segment_zoom_roi),
    rule("window-roi", window_zoom_applies, window_roi),
];

// Base invocations

fn preview_base(c: &CompileContext, args: &mut Vec<String>) {
    let (width, height) = preview_frame(c);
    push(args, "--camera", c.config.camera.to_string());
    push_all(args, &["-n", "--codec", "mjpeg", "-t", "0", "--segment", "1"]);
    push(args, "--width", width.to_string());
    push(args, "--height", height.to_string());
    push(args, "-o", c.output_arg());
}

/// Frame size the preview stream is captured at
fn preview_frame(c: &CompileContext) -> (u32, u32) {
    let config = c.config;
    match c.variant() {
        v if v.is_arducam() && (config.focus_mode || config.zoom > 0) => (3280, 2464),
        CameraVariant::GlobalShutter => (1456, 1088),
        CameraVariant::V3 => (2304, 1296),
        v if v.is_arducam() || config.focus_mode => (1920, 1440),
        _ if c.env.preview_size == (600, 480) => (720, 540),
        _ => zoom::REFERENCE,
    }
}

fn still_base(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--camera", c.config.camera.to_string());
    let warmup = timing::STILL_WARMUP_MS.to_string();
    if c.still_encoding() == "raw" {
        push_all(args, &["-r", "-n", "-t", &warmup]);
        push(args, "-o", c.output_arg());
        if c.small_preview() && c.config.zoom == 4 {
            args.push("--rawfull".to_string());
        }
    } else {
        push(args, "-e", c.still_encoding());
        push_all(args, &["-n", "-t", &warmup]);
        push(args, "-o", c.output_arg());
    }
}

fn triggered_base(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--camera", c.config.camera.to_string());
    if c.still_encoding() == "raw" {
        push_all(args, &["-r", "-s", "-n", "-t", "0"]);
        push(args, "-o", c.output_arg());
        if c.small_preview() && c.config.zoom >= 4 {
            args.push("--rawfull".to_string());
        }
    } else {
        push(args, "-e", c.still_encoding());
        push_all(args, &["-s", "-n", "-t", "0"]);
        push(args, "-o", c.output_arg());
    }
}

fn shot_base(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--camera", c.config.camera.to_string());
    let window = timing::TIMELAPSE_SHOT_MS.to_string();
    if c.still_encoding() == "raw" {
        push_all(args, &["-r", "-n", "-t", &window]);
        push(args, "-o", c.output_arg());
        if c.small_preview() && c.config.zoom >= 4 {
            args.push("--rawfull".to_string());
        }
    } else {
        push(args, "-e", c.still_encoding());
        push_all(args, &["-n", "-t", &window]);
        push(args, "-o", c.output_arg());
    }
}

fn video_base(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--camera", c.config.camera.to_string());
    push(args, "-t", (c.config.vlen.max(0) * 1000).to_string());
    push(args, "-o", c.output_arg());
    if c.codec() == "raw" {
        push(args, "--framerate", c.config.fps.to_string());
        return;
    }
    push(args, "--framerate", video_framerate(c));
    if c.codec() != "h264" {
        push(args, "--codec", c.codec());
    } else {
        push(args, "--level", h264_level(c));
    }
}

fn stream_base(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--camera", c.config.camera.to_string());
    push(args, "-t", (c.config.vlen.max(0) * 1000).to_string());
    push_all(args, &["--inline", "--listen"]);
    push(args, "-o", format!("tcp://0.0.0.0:{}", c.env.stream_port));
    push(args, "--framerate", video_framerate(c));
    push(args, "--level", h264_level(c));
}

fn segment_base(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--camera", c.config.camera.to_string());
    args.push("-n".to_string());
    if c.codec() != "raw" {
        push_all(args, &["--codec", "mjpeg"]);
    }
    push(args, "-t", (c.config.tduration.max(1) * 1000).to_string());
    push_all(args, &["--segment", "1"]);
    push(args, "-o", c.output_arg());
}

fn h264_level(c: &CompileContext) -> &'static str {
    options::h264_level(c.config.profile.max(0) as usize)
}

/// Recording frame rate; manual exposure caps it by the shutter time
fn video_framerate(c: &CompileContext) -> String {
    if !c.manual() {
        return c.config.fps.to_string();
    }
    let frame_micros = ((1.0 / c.config.fps.max(1) as f64) * 1_000_000.0) as u64;
    let period = c.shutter().max(frame_micros).max(1);
    (((1.0 / period as f64) * 1_000_000.0) as u64).to_string()
}

// Size

fn video_size(c: &CompileContext, args: &mut Vec<String>) {
    let (width, height) = c.video_format();
    let h264 = c.config.codec == 0;
    if c.config.zoom > 0 {
        let (pw, ph) = c.env.preview_size;
        push(args, "--width", pw.to_string());
        push(args, "--height", ph.to_string());
        return;
    }
    match c.variant() {
        CameraVariant::Hq if width == 2028 => push(args, "--mode", "2028:1520:12"),
        CameraVariant::V3 if width == 2304 && h264 => {
            push(args, "--mode", "2304:1296:10");
            push_all(args, &["--width", "2304", "--height", "1296"]);
        }
        CameraVariant::V3 if width == 2028 && h264 => {
            push(args, "--mode", "2028:1520:10");
            push_all(args, &["--width", "2028", "--height", "1520"]);
        }
        _ => {
            push(args, "--width", width.to_string());
            push(args, "--height", height.to_string());
        }
    }
}

fn segment_size(c: &CompileContext, args: &mut Vec<String>) {
    let (width, height) = if c.config.zoom > 0 {
        c.env.preview_size
    } else {
        c.video_format()
    };
    push(args, "--width", width.to_string());
    push(args, "--height", height.to_string());
}

fn is_arducam_64mp(c: &CompileContext) -> bool {
    c.variant() == CameraVariant::Arducam64
}

/// 64MP sensor: full resolution, or 2x2 binned for manual binned stills
fn sensor_mode(c: &CompileContext, args: &mut Vec<String>) {
    if c.manual() && c.binned() {
        push_all(args, &["--width", "4624", "--height", "3472"]);
    } else {
        push_all(args, &["--width", "9152", "--height", "6944"]);
    }
}

fn video_preview_off(c: &CompileContext) -> bool {
    c.config.vpreview == 0
}

fn no_preview(_: &CompileContext, args: &mut Vec<String>) {
    args.push("-n".to_string());
}

fn preview_window(c: &CompileContext, args: &mut Vec<String>) {
    let (width, height) = c.env.preview_size;
    push(args, "-p", format!("0,0,{},{}", width, height));
}

// Exposure

fn brightness_contrast(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--brightness", ratio(c.config.brightness, 100));
    push(args, "--contrast", ratio(c.config.contrast, 100));
}

fn exposure(c: &CompileContext, args: &mut Vec<String>) {
    if c.manual() {
        push(args, "--shutter", c.shutter().to_string());
    } else {
        push(args, "--exposure", c.config.mode_name());
    }
}

/// Preview shutter is capped so the stream keeps moving
fn preview_shutter(c: &CompileContext) -> u64 {
    c.shutter().min(preview::MAX_SHUTTER_MICROS).max(1)
}

fn preview_exposure(c: &CompileContext, args: &mut Vec<String>) {
    if c.manual() {
        push(args, "--shutter", preview_shutter(c).to_string());
    } else {
        push(args, "--exposure", c.config.mode_name());
    }
}

fn preview_framerate(c: &CompileContext, args: &mut Vec<String>) {
    let variant = c.variant();
    let zoom = c.config.zoom;
    let rate = if c.manual() {
        let fps = 1_000_000.0 / preview_shutter(c) as f64;
        if fps > preview::MAX_MANUAL_FPS as f64 {
            preview::MAX_MANUAL_FPS.to_string()
        } else {
            decimal(fps.max(preview::MIN_MANUAL_FPS))
        }
    } else if zoom > 4 && !variant.is_arducam() && variant != CameraVariant::V3 {
        preview::FOCUS_FPS.to_string()
    } else {
        preview::PREVIEW_FPS.to_string()
    };
    push(args, "--framerate", rate);
}

fn segment_exposure(c: &CompileContext, args: &mut Vec<String>) {
    if c.manual() {
        let shutter = c.shutter().max(1);
        push(args, "--shutter", shutter.to_string());
        push(args, "--framerate", decimal(1_000_000.0 / shutter as f64));
    } else {
        push(args, "--exposure", c.config.mode_name());
        push(args, "--framerate", c.config.fps.to_string());
    }
}

fn has_ev(c: &CompileContext) -> bool {
    c.config.ev != 0
}

fn ev(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--ev", c.config.ev.to_string());
}

fn gain(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--gain", c.config.gain.to_string());
}

fn awb_gains(c: &CompileContext) -> String {
    format!("{},{}", ratio(c.config.red, 10), ratio(c.config.blue, 10))
}

fn awb(c: &CompileContext, args: &mut Vec<String>) {
    if c.config.awb == 0 {
        push(args, "--awbgains", awb_gains(c));
    } else {
        push(args, "--awb", options::AWB[c.config.awb.clamp(0, 7) as usize]);
    }
}

/// Long preview exposures run at unity gain with fixed white balance
fn preview_gain_awb(c: &CompileContext, args: &mut Vec<String>) {
    if c.manual() && c.shutter() > long_exposure::PREVIEW_MICROS {
        push(args, "--gain", "1");
        push(args, "--awbgains", awb_gains(c));
    } else {
        gain(c, args);
        awb(c, args);
    }
}

/// Sensors that cannot hold a long exposure across frames need `--immediate`
fn long_still(c: &CompileContext, threshold: u64) -> bool {
    c.manual() && c.shutter() > threshold && !c.is_arducam()
}

fn still_gain_awb(c: &CompileContext, args: &mut Vec<String>) {
    if long_still(c, long_exposure::STILL_MICROS) {
        gain(c, args);
        args.push("--immediate".to_string());
        push(args, "--awbgains", awb_gains(c));
    } else {
        gain(c, args);
        awb(c, args);
    }
}

fn segment_gain_awb(c: &CompileContext, args: &mut Vec<String>) {
    if long_still(c, long_exposure::PREVIEW_MICROS) {
        push(args, "--gain", "1");
        args.push("--immediate".to_string());
        push(args, "--awbgains", awb_gains(c));
    } else {
        gain(c, args);
        awb(c, args);
    }
}

// Image

fn metering(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--metering", options::METERING[c.config.meter.clamp(0, 2) as usize]);
}

fn saturation(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--saturation", ratio(c.config.saturation, 10));
}

fn sharpness(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--sharpness", ratio(c.config.sharpness, 10));
}

fn denoise(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--denoise", options::DENOISE[c.config.denoise.clamp(0, 3) as usize]);
}

fn quality(c: &CompileContext, args: &mut Vec<String>) {
    push(args, "--quality", c.config.quality.to_string());
}

fn still_rawfull_applies(c: &CompileContext) -> bool {
    c.still_encoding() == "jpg" && c.small_preview() && c.config.zoom == 4
}

fn timelapse_rawfull_applies(c: &CompileContext) -> bool {
    c.still_encoding() == "jpg" && c.small_preview() && c.config.zoom >= 4
}

fn jpg_rawfull(_: &CompileContext, args: &mut Vec<String>) {
    push_all(args, &["-r", "--rawfull"]);
}

fn metadata(_: &CompileContext, args: &mut Vec<String>) {
    push_all(args, &["--metadata", "-", "--metadata-format", "txt"]);
}

// Focus

fn arducam_continuous_af(c: &CompileContext) -> bool {
    c.is_arducam() && !c.config.manual_focus && c.env.arducam_autofocus
}

fn arducam_autofocus(_: &CompileContext, args: &mut Vec<String>) {
    args.push("--autofocus".to_string());
}

fn preview_manual_tuning_applies(c: &CompileContext) -> bool {
    c.is_arducam() && c.config.manual_focus && c.profile.manual_focus_tuning.is_some()
}

fn manual_tuning_applies(c: &CompileContext) -> bool {
    preview_manual_tuning_applies(c) && !c.env.arducam_autofocus
}

fn manual_focus_tuning(c: &CompileContext, args: &mut Vec<String>) {
    if let Some(path) = &c.profile.manual_focus_tuning {
        push(args, "--tuning-file", path.display().to_string());
    }
}

fn scientific_applies(c: &CompileContext) -> bool {
    c.variant() == CameraVariant::Hq
        && c.config.scientific == 1
        && c.profile.scientific_tuning.is_some()
}

fn scientific_tuning(c: &CompileContext, args: &mut Vec<String>) {
    if let Some(path) = &c.profile.scientific_tuning {
        push(args, "--tuning-file", path.display().to_string());
    }
}

/// Explicit autofocus mode: v3 without a touch window, or Arducam lenses
/// the sensor is not focusing by itself
fn autofocus_mode_applies(c: &CompileContext) -> bool {
    (c.is_v3() && c.config.v3_f_mode > 0 && c.config.focus_window.is_none())
        || (c.is_arducam() && !c.config.manual_focus && !c.env.arducam_autofocus)
}

fn autofocus_mode(c: &CompileContext, args: &mut Vec<String>) {
    let mode = c.config.v3_f_mode.clamp(0, 2);
    push(args, "--autofocus-mode", options::AF_MODES[mode as usize]);
    if mode == 1 {
        push(args, "--lens-position", ratio(c.config.v3_focus, 100));
    }
}

fn touch_window_applies(c: &CompileContext) -> bool {
    !autofocus_mode_applies(c)
        && c.is_v3()
        && c.config.zoom == 0
        && c.config.focus_window.is_some()
        && c.config.v3_f_mode != 1
}

fn on_capture_applies(c: &CompileContext) -> bool {
    !autofocus_mode_applies(c)
        && c.is_v3()
        && c.config.v3_f_mode == 0
        && c.config.focus_window.is_none()
}

fn autofocus_on_capture(_: &CompileContext, args: &mut Vec<String>) {
    push_all(args, &["--autofocus-mode", "auto", "--autofocus-on-capture"]);
}

fn still_window_applies(c: &CompileContext) -> bool {
    !autofocus_mode_applies(c) && !on_capture_applies(c) && c.is_v3() && c.config.zoom == 0
}

fn segment_window_applies(c: &CompileContext) -> bool {
    !autofocus_mode_applies(c) && c.is_v3() && c.config.zoom == 0
}

fn autofocus_window(c: &CompileContext, args: &mut Vec<String>) {
    let window = c
        .config
        .focus_window
        .as_ref()
        .map(FocusWindow::to_arg)
        .unwrap_or_else(|| "0,0,1,1".to_string());
    push(args, "--autofocus-window", window);
}

fn v3_speed_applies(c: &CompileContext) -> bool {
    c.is_v3() && c.config.v3_f_speed != 0
}

fn autofocus_speed(c: &CompileContext, args: &mut Vec<String>) {
    let speed = c.config.v3_f_speed.clamp(0, 1) as usize;
    push(args, "--autofocus-speed", options::AF_SPEEDS[speed]);
}

fn v3_range_applies(c: &CompileContext) -> bool {
    c.is_v3() && c.config.v3_f_range != 0
}

fn autofocus_range(c: &CompileContext, args: &mut Vec<String>) {
    let range = c.config.v3_f_range.clamp(0, 2) as usize;
    push(args, "--autofocus-range", options::AF_RANGES[range]);
}

fn hdr_applies(c: &CompileContext) -> bool {
    c.is_v3() && c.config.v3_hdr == 1
}

fn hdr(_: &CompileContext, args: &mut Vec<String>) {
    args.push("--hdr".to_string());
}

// Zoom

/// Preview crop for a zoom level, measured against the reference frame
fn preview_crop(level: i32) -> (u32, u32) {
    let step = (4 - level.clamp(1, 4)) as usize;
    (zoom::WIDTHS[step], zoom::HEIGHTS[step])
}

fn preview_zoom_applies(c: &CompileContext) -> bool {
    (2..=4).contains(&c.config.zoom)
}

fn preview_zoom_roi(c: &CompileContext, args: &mut Vec<String>) {
    let roi = Roi::centered(preview_crop(c.config.zoom), zoom::REFERENCE);
    push(args, "--roi", roi.to_arg());
}

fn video_zoom_applies(c: &CompileContext) -> bool {
    (1..=4).contains(&c.config.zoom)
}

fn video_zoom_roi(c: &CompileContext, args: &mut Vec<String>) {
    let roi = Roi::centered(preview_crop(c.config.zoom), zoom::REFERENCE);
    push(args, "--mode", "1920:1440:10");
    push(args, "--roi", roi.to_arg());
}

fn still_zoom_applies(c: &CompileContext) -> bool {
    (1..=4).contains(&c.config.zoom)
}

fn still_zoom_roi(c: &CompileContext, args: &mut Vec<String>) {
    let roi = Roi::centered(c.profile.still_crop(c.config.zoom), c.profile.active_area);
    push(args, "--roi", roi.to_arg());
}

fn segment_zoom_applies(c: &CompileContext) -> bool {
    (1..=4).contains(&c.config.zoom)
}

fn segment_zoom_roi(c: &CompileContext, args: &mut Vec<String>) {
    let roi = Roi::centered(c.profile.still_crop(c.config.zoom), c.profile.active_area);
    push(args, "--mode", "1920:1440:10");
    push(args, "--roi", roi.to_arg());
}

fn window_zoom_applies(c: &CompileContext) -> bool {
    c.config.zoom == zoom::MAX_LEVEL
}

/// Pixel-for-pixel window at the sensor centre
fn window_roi(c: &CompileContext, args: &mut Vec<String>) {
    let roi = Roi::centered(c.env.preview_size, c.profile.active_area);
    push(args, "--roi", roi.to_arg());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> CompileEnv {
        CompileEnv {
            preview_size: (800, 600),
            pictures_dir: PathBuf::from("/home/pi/Pictures"),
            videos_dir: PathBuf::from("/home/pi/Videos"),
            preview_dir: PathBuf::from("/run/shm"),
            stream_port: 5000,
            arducam_autofocus: false,
            tool_dir: None,
            timestamp: "240307090502".to_string(),
        }
    }

    fn run(table: &[Rule], config: &CaptureConfig, profile: &CameraProfile, env: &CompileEnv) -> Vec<String> {
        let ctx = CompileContext::new(config, profile, CaptureIntent::Preview, env, None);
        evaluate(table, &ctx)
    }

    fn value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_rule_names_unique_per_table() {
        for kind in [
            PlanKind::Preview,
            PlanKind::Still,
            PlanKind::Video,
            PlanKind::Stream,
            PlanKind::TimelapseTriggered,
            PlanKind::TimelapseShot,
            PlanKind::TimelapseSegment,
        ] {
            let names: Vec<_> = table(kind).iter().map(|rule| rule.name).collect();
            let mut sorted = names.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(names.len(), sorted.len(), "duplicate rule in {:?}", kind);
        }
    }

    #[test]
    fn test_preview_manual_framerate() {
        let profile = CameraProfile::for_variant(CameraVariant::V2, 0);
        let mut config = CaptureConfig::default();
        config.mode = 0;

        // 1/4000 s would run at 4000 fps; capped
        config.speed = 0;
        let args = run(PREVIEW, &config, &profile, &env());
        assert_eq!(value(&args, "--framerate"), Some("25"));

        // 3 s is capped at 2 s, and the rate floors at one frame per second
        config.speed = 44;
        let args = run(PREVIEW, &config, &profile, &env());
        assert_eq!(value(&args, "--framerate"), Some("1.0"));
        assert_eq!(value(&args, "--shutter"), Some("2000000"));
    }

    #[test]
    fn test_preview_focus_aid_framerate() {
        let profile = CameraProfile::for_variant(CameraVariant::Hq, 0);
        let mut config = CaptureConfig::default();
        config.zoom = 5;
        let args = run(PREVIEW, &config, &profile, &env());
        assert_eq!(value(&args, "--framerate"), Some("25"));

        let v3 = CameraProfile::for_variant(CameraVariant::V3, 0);
        let args = run(PREVIEW, &config, &v3, &env());
        assert_eq!(value(&args, "--framerate"), Some("10"));
    }

    #[test]
    fn test_autofocus_window_excludes_mode() {
        let profile = CameraProfile::for_variant(CameraVariant::V3, 0);
        let mut config = CaptureConfig::default();
        config.v3_f_mode = 2;
        config.focus_window = Some(FocusWindow {
            x: 0.25,
            y: 0.5,
            size: 0.0625,
        });
        let args = run(PREVIEW, &config, &profile, &env());
        assert!(!args.iter().any(|arg| arg == "--autofocus-mode"));
        assert_eq!(value(&args, "--autofocus-window"), Some("0.25,0.5,0.0625,0.0625"));

        config.focus_window = None;
        let args = run(PREVIEW, &config, &profile, &env());
        assert_eq!(value(&args, "--autofocus-mode"), Some("continuous"));
        assert!(!args.iter().any(|arg| arg == "--autofocus-window"));
    }

    #[test]
    fn test_manual_lens_position() {
        let profile = CameraProfile::for_variant(CameraVariant::V3, 0);
        let mut config = CaptureConfig::default();
        config.v3_f_mode = 1;
        config.v3_focus = 480;
        let args = run(VIDEO, &config, &profile, &env());
        assert_eq!(value(&args, "--autofocus-mode"), Some("manual"));
        assert_eq!(value(&args, "--lens-position"), Some("4.8"));
    }

    #[test]
    fn test_still_long_exposure_immediate() {
        let profile = CameraProfile::for_variant(CameraVariant::Hq, 0);
        let mut config = CaptureConfig::default();
        config.mode = 0;
        config.speed = 43;
        config.gain = 4;
        let args = run(STILL, &config, &profile, &env());
        assert!(args.iter().any(|arg| arg == "--immediate"));
        assert_eq!(value(&args, "--gain"), Some("4"));
        assert_eq!(value(&args, "--awbgains"), Some("1.5,1.2"));
        assert!(!args.iter().any(|arg| arg == "--awb"));
    }

    #[test]
    fn test_segment_long_exposure_unity_gain() {
        let profile = CameraProfile::for_variant(CameraVariant::Hq, 0);
        let mut config = CaptureConfig::default();
        config.mode = 0;
        config.speed = 50;
        config.gain = 8;
        let args = run(TIMELAPSE_SEGMENT, &config, &profile, &env());
        assert_eq!(value(&args, "--gain"), Some("1"));
        assert!(args.iter().any(|arg| arg == "--immediate"));
    }

    #[test]
    fn test_scientific_tuning_only_for_hq() {
        let mut profile = CameraProfile::for_variant(CameraVariant::Hq, 0);
        profile.scientific_tuning = Some(PathBuf::from("/tuning/imx477_scientific.json"));
        let mut config = CaptureConfig::default();
        config.scientific = 1;
        let args = run(PREVIEW, &config, &profile, &env());
        assert_eq!(value(&args, "--tuning-file"), Some("/tuning/imx477_scientific.json"));

        let args = run(STILL, &config, &profile, &env());
        assert!(!args.iter().any(|arg| arg == "--tuning-file"));
    }

    #[test]
    fn test_arducam_autofocus_choice() {
        let profile = CameraProfile::for_variant(CameraVariant::Arducam16, 0);
        let config = CaptureConfig::default();
        let args = run(PREVIEW, &config, &profile, &env());
        assert_eq!(value(&args, "--autofocus-mode"), Some("auto"));
        assert!(!args.iter().any(|arg| arg == "--autofocus"));

        let mut continuous = env();
        continuous.arducam_autofocus = true;
        let args = run(PREVIEW, &config, &profile, &continuous);
        assert!(args.iter().any(|arg| arg == "--autofocus"));
        assert!(!args.iter().any(|arg| arg == "--autofocus-mode"));
    }

    #[test]
    fn test_preview_frame_sizes() {
        let config = CaptureConfig::default();
        let gs = CameraProfile::for_variant(CameraVariant::GlobalShutter, 0);
        let args = run(PREVIEW, &config, &gs, &env());
        assert_eq!(value(&args, "--width"), Some("1456"));

        let v2 = CameraProfile::for_variant(CameraVariant::V2, 0);
        let mut square = env();
        square.preview_size = (600, 480);
        let args = run(PREVIEW, &config, &v2, &square);
        assert_eq!(value(&args, "--width"), Some("720"));
        assert_eq!(value(&args, "--height"), Some("540"));

        // Only the square display gets the small stream
        let mut small = env();
        small.preview_size = (640, 480);
        let args = run(PREVIEW, &config, &v2, &small);
        assert_eq!(value(&args, "--width"), Some("1920"));
        assert_eq!(value(&args, "--height"), Some("1440"));
    }
}
