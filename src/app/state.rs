// SPDX-License-Identifier: GPL-3.0-only

//! Capture parameter store
//!
//! [`CaptureConfig`] is the single copy of every user adjustable camera
//! parameter. [`ParameterStore`] owns it together with the active
//! [`CameraProfile`] and is the only place values change: every write is
//! clamped to the field's current bounds and the cross-field rules are
//! applied before the write returns.

use crate::backends::camera::{CameraProfile, CameraVariant};
use crate::constants::{self, options, timing, zoom};
use crate::pipelines::command::format::decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Longest timelapse the duration field accepts, in seconds
pub const MAX_TIMELAPSE_SECS: i32 = 9999;

/// Adjustable parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Mode,
    Speed,
    Gain,
    Brightness,
    Contrast,
    Ev,
    Blue,
    Red,
    Saturation,
    Sharpness,
    Denoise,
    Quality,
    Extn,
    Meter,
    Awb,
    Histogram,
    HistArea,
    Vlen,
    Fps,
    Vformat,
    Codec,
    Profile,
    VideoPreview,
    Tinterval,
    Tshots,
    Tduration,
    Zoom,
    Focus,
    V3Focus,
    V3FocusMode,
    V3FocusRange,
    V3FocusSpeed,
    V3Hdr,
    Scientific,
    Rotate,
}

impl Field {
    pub const ALL: [Field; 35] = [
        Field::Mode,
        Field::Speed,
        Field::Gain,
        Field::Brightness,
        Field::Contrast,
        Field::Ev,
        Field::Blue,
        Field::Red,
        Field::Saturation,
        Field::Sharpness,
        Field::Denoise,
        Field::Quality,
        Field::Extn,
        Field::Meter,
        Field::Awb,
        Field::Histogram,
        Field::HistArea,
        Field::Vlen,
        Field::Fps,
        Field::Vformat,
        Field::Codec,
        Field::Profile,
        Field::VideoPreview,
        Field::Tinterval,
        Field::Tshots,
        Field::Tduration,
        Field::Zoom,
        Field::Focus,
        Field::V3Focus,
        Field::V3FocusMode,
        Field::V3FocusRange,
        Field::V3FocusSpeed,
        Field::V3Hdr,
        Field::Scientific,
        Field::Rotate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Mode => "mode",
            Field::Speed => "speed",
            Field::Gain => "gain",
            Field::Brightness => "brightness",
            Field::Contrast => "contrast",
            Field::Ev => "ev",
            Field::Blue => "blue",
            Field::Red => "red",
            Field::Saturation => "saturation",
            Field::Sharpness => "sharpness",
            Field::Denoise => "denoise",
            Field::Quality => "quality",
            Field::Extn => "extn",
            Field::Meter => "meter",
            Field::Awb => "awb",
            Field::Histogram => "histogram",
            Field::HistArea => "histarea",
            Field::Vlen => "vlen",
            Field::Fps => "fps",
            Field::Vformat => "vformat",
            Field::Codec => "codec",
            Field::Profile => "profile",
            Field::VideoPreview => "vpreview",
            Field::Tinterval => "tinterval",
            Field::Tshots => "tshots",
            Field::Tduration => "tduration",
            Field::Zoom => "zoom",
            Field::Focus => "focus",
            Field::V3Focus => "v3_focus",
            Field::V3FocusMode => "v3_f_mode",
            Field::V3FocusRange => "v3_f_range",
            Field::V3FocusSpeed => "v3_f_speed",
            Field::V3Hdr => "v3_hdr",
            Field::Scientific => "scientific",
            Field::Rotate => "rotate",
        }
    }

    /// Bounds that never depend on the camera or other fields
    fn fixed_bounds(&self) -> (i32, i32) {
        match self {
            Field::Mode => (0, options::MODES.len() as i32 - 1),
            Field::Brightness => (-100, 100),
            Field::Contrast => (0, 200),
            Field::Ev => (-10, 10),
            Field::Blue | Field::Red => (1, 80),
            Field::Saturation => (0, 20),
            Field::Sharpness => (0, 30),
            Field::Denoise => (0, options::DENOISE.len() as i32 - 1),
            Field::Quality => (0, 100),
            Field::Extn => (0, options::STILL_ENCODINGS.len() as i32 - 1),
            Field::Meter => (0, options::METERING.len() as i32 - 1),
            Field::Awb => (0, options::AWB.len() as i32 - 1),
            Field::Histogram => (0, options::HISTOGRAMS.len() as i32 - 1),
            Field::HistArea => (10, 50),
            Field::Vlen => (0, 3600),
            Field::Codec => (0, options::CODECS.len() as i32 - 1),
            Field::Profile => (0, options::H264_PROFILES.len() as i32 - 1),
            Field::VideoPreview => (0, 1),
            Field::Tinterval => (0, 999),
            Field::Tshots => (1, 999),
            Field::Tduration => (1, MAX_TIMELAPSE_SECS),
            Field::Zoom => (0, zoom::MAX_LEVEL),
            Field::Focus => (0, 4096),
            Field::V3Focus => (0, 1023),
            Field::V3FocusMode => (0, options::AF_MODES.len() as i32 - 1),
            Field::V3FocusRange => (0, options::AF_RANGES.len() as i32 - 1),
            Field::V3FocusSpeed => (0, options::AF_SPEEDS.len() as i32 - 1),
            Field::Rotate => (0, 3),
            // Camera dependent, see ParameterStore::bounds
            Field::Speed
            | Field::Gain
            | Field::Fps
            | Field::Vformat
            | Field::V3Hdr
            | Field::Scientific => (0, 0),
        }
    }

    /// Whether the live preview command line depends on the field
    pub fn affects_preview(&self) -> bool {
        !matches!(
            self,
            Field::Extn
                | Field::Quality
                | Field::Histogram
                | Field::HistArea
                | Field::Vlen
                | Field::Fps
                | Field::Vformat
                | Field::Codec
                | Field::Profile
                | Field::VideoPreview
                | Field::Tinterval
                | Field::Tshots
                | Field::Tduration
                | Field::Focus
                | Field::Rotate
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown field: {}", s))
    }
}

/// Normalised autofocus window picked by touching the preview
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusWindow {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl FocusWindow {
    /// Window centred on a touch point of a `width`x`height` preview
    pub fn from_touch(x: i32, y: i32, width: u32, height: u32) -> Self {
        let width = width.max(1) as f64;
        let height = height.max(1) as f64;
        Self {
            x: (x as f64 - 25.0) / width,
            y: ((y as f64 - 20.0) * 1.3333) / height,
            size: 50.0 / width,
        }
    }

    /// `--autofocus-window` argument
    pub fn to_arg(&self) -> String {
        format!(
            "{},{},{},{}",
            decimal(self.x),
            decimal(self.y),
            decimal(self.size),
            decimal(self.size)
        )
    }
}

/// Every capture parameter
///
/// Integer fields hold option-table indices or raw slider values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub mode: i32,
    pub speed: i32,
    pub gain: i32,
    pub brightness: i32,
    pub contrast: i32,
    pub ev: i32,
    pub blue: i32,
    pub red: i32,
    pub saturation: i32,
    pub sharpness: i32,
    pub denoise: i32,
    pub quality: i32,
    pub extn: i32,
    pub meter: i32,
    pub awb: i32,
    pub histogram: i32,
    pub histarea: i32,
    pub vlen: i32,
    pub fps: i32,
    pub vformat: i32,
    pub codec: i32,
    pub profile: i32,
    pub vpreview: i32,
    pub tinterval: i32,
    pub tshots: i32,
    pub tduration: i32,
    pub zoom: i32,
    /// Arducam motor position
    pub focus: i32,
    /// v3 lens position in hundredths of a dioptre
    pub v3_focus: i32,
    pub v3_f_mode: i32,
    pub v3_f_range: i32,
    pub v3_f_speed: i32,
    pub v3_hdr: i32,
    pub scientific: i32,
    pub rotate: i32,
    /// Show the window frame (persisted, display only)
    pub frame: i32,
    /// Legacy h264 level slot (persisted, unused)
    pub level: i32,
    /// Zoom centre on the preview (persisted)
    pub zoom_x: i32,
    pub zoom_y: i32,
    pub camera: u32,
    /// Fixed-focus cameras: zoomed focusing aid active
    pub focus_mode: bool,
    /// Lens driven by hand rather than by autofocus
    pub manual_focus: bool,
    pub focus_window: Option<FocusWindow>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode: 1,
            speed: 16,
            gain: 0,
            brightness: 0,
            contrast: 70,
            ev: 0,
            blue: 12,
            red: 15,
            saturation: 10,
            sharpness: 15,
            denoise: 1,
            quality: 93,
            extn: 0,
            meter: 2,
            awb: 1,
            histogram: 0,
            histarea: 50,
            vlen: 10,
            fps: 25,
            vformat: 10,
            codec: 0,
            profile: 0,
            vpreview: 1,
            tinterval: 60,
            tshots: 10,
            tduration: 600,
            zoom: 0,
            focus: 2000,
            v3_focus: 480,
            v3_f_mode: 0,
            v3_f_range: 0,
            v3_f_speed: 0,
            v3_hdr: 0,
            scientific: 0,
            rotate: 0,
            frame: 1,
            level: 0,
            zoom_x: 400,
            zoom_y: 300,
            camera: 0,
            focus_mode: false,
            manual_focus: false,
            focus_window: None,
        }
    }
}

impl CaptureConfig {
    pub fn get(&self, field: Field) -> i32 {
        match field {
            Field::Mode => self.mode,
            Field::Speed => self.speed,
            Field::Gain => self.gain,
            Field::Brightness => self.brightness,
            Field::Contrast => self.contrast,
            Field::Ev => self.ev,
            Field::Blue => self.blue,
            Field::Red => self.red,
            Field::Saturation => self.saturation,
            Field::Sharpness => self.sharpness,
            Field::Denoise => self.denoise,
            Field::Quality => self.quality,
            Field::Extn => self.extn,
            Field::Meter => self.meter,
            Field::Awb => self.awb,
            Field::Histogram => self.histogram,
            Field::HistArea => self.histarea,
            Field::Vlen => self.vlen,
            Field::Fps => self.fps,
            Field::Vformat => self.vformat,
            Field::Codec => self.codec,
            Field::Profile => self.profile,
            Field::VideoPreview => self.vpreview,
            Field::Tinterval => self.tinterval,
            Field::Tshots => self.tshots,
            Field::Tduration => self.tduration,
            Field::Zoom => self.zoom,
            Field::Focus => self.focus,
            Field::V3Focus => self.v3_focus,
            Field::V3FocusMode => self.v3_f_mode,
            Field::V3FocusRange => self.v3_f_range,
            Field::V3FocusSpeed => self.v3_f_speed,
            Field::V3Hdr => self.v3_hdr,
            Field::Scientific => self.scientific,
            Field::Rotate => self.rotate,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut i32 {
        match field {
            Field::Mode => &mut self.mode,
            Field::Speed => &mut self.speed,
            Field::Gain => &mut self.gain,
            Field::Brightness => &mut self.brightness,
            Field::Contrast => &mut self.contrast,
            Field::Ev => &mut self.ev,
            Field::Blue => &mut self.blue,
            Field::Red => &mut self.red,
            Field::Saturation => &mut self.saturation,
            Field::Sharpness => &mut self.sharpness,
            Field::Denoise => &mut self.denoise,
            Field::Quality => &mut self.quality,
            Field::Extn => &mut self.extn,
            Field::Meter => &mut self.meter,
            Field::Awb => &mut self.awb,
            Field::Histogram => &mut self.histogram,
            Field::HistArea => &mut self.histarea,
            Field::Vlen => &mut self.vlen,
            Field::Fps => &mut self.fps,
            Field::Vformat => &mut self.vformat,
            Field::Codec => &mut self.codec,
            Field::Profile => &mut self.profile,
            Field::VideoPreview => &mut self.vpreview,
            Field::Tinterval => &mut self.tinterval,
            Field::Tshots => &mut self.tshots,
            Field::Tduration => &mut self.tduration,
            Field::Zoom => &mut self.zoom,
            Field::Focus => &mut self.focus,
            Field::V3Focus => &mut self.v3_focus,
            Field::V3FocusMode => &mut self.v3_f_mode,
            Field::V3FocusRange => &mut self.v3_f_range,
            Field::V3FocusSpeed => &mut self.v3_f_speed,
            Field::V3Hdr => &mut self.v3_hdr,
            Field::Scientific => &mut self.scientific,
            Field::Rotate => &mut self.rotate,
        }
    }

    pub fn is_manual_exposure(&self) -> bool {
        self.mode == 0
    }

    /// Exposure time of the selected shutter index
    pub fn shutter_micros(&self) -> u64 {
        constants::shutter_micros(self.speed.max(0) as usize)
    }

    pub fn mode_name(&self) -> &'static str {
        options::MODES[self.mode.clamp(0, 2) as usize]
    }
}

/// What a focus toggle did, so the caller can drive the lens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusToggle {
    /// Fixed-focus camera: zoomed focusing aid switched on or off
    FocusAid { enabled: bool },
    /// v3 autofocus mode advanced
    AutofocusMode { mode: i32 },
    /// Arducam manual override switched on or off
    ManualMotor { enabled: bool },
}

/// Owner of the capture parameters
#[derive(Debug, Clone)]
pub struct ParameterStore {
    config: CaptureConfig,
    profile: CameraProfile,
}

impl ParameterStore {
    /// Store over `config`, immediately clamped to `profile`
    pub fn new(config: CaptureConfig, profile: CameraProfile) -> Self {
        let mut store = Self {
            config,
            profile: profile.clone(),
        };
        store.recompute_bounds(&profile);
        store
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn profile(&self) -> &CameraProfile {
        &self.profile
    }

    pub fn snapshot(&self) -> CaptureConfig {
        self.config.clone()
    }

    pub fn get(&self, field: Field) -> i32 {
        self.config.get(field)
    }

    /// Current legal range of a field
    pub fn bounds(&self, field: Field) -> (i32, i32) {
        let c = &self.config;
        let p = &self.profile;
        match field {
            Field::Speed => (0, p.max_shutter_index),
            Field::Gain => (0, p.max_gain),
            Field::Vformat => (0, p.max_vformat(c.codec)),
            Field::Fps => (1, p.max_fps(c.vformat, c.codec, c.profile, c.vpreview != 0)),
            Field::V3Hdr => (0, i32::from(p.variant == CameraVariant::V3)),
            Field::Scientific => (0, i32::from(p.has_scientific_tuning())),
            other => other.fixed_bounds(),
        }
    }

    /// Write a field, clamped, then apply the rules that depend on it
    ///
    /// Returns the value the field holds afterwards.
    pub fn set(&mut self, field: Field, raw: i32) -> i32 {
        let (min, max) = self.bounds(field);
        let value = raw.clamp(min, max);
        if value != raw {
            debug!(field = %field, raw, value, "Clamped parameter");
        }
        *self.config.slot_mut(field) = value;
        self.apply_rules(field);
        self.get(field)
    }

    /// Move a field by `delta`
    pub fn step(&mut self, field: Field, delta: i32) -> i32 {
        let current = self.get(field);
        self.set(field, current.saturating_add(delta))
    }

    fn apply_rules(&mut self, field: Field) {
        match field {
            Field::Mode => {
                if self.config.mode == 0 {
                    if self.config.gain == 0 {
                        self.config.gain = 1;
                    }
                } else {
                    self.config.gain = 0;
                }
                if self.config.tinterval > 0 {
                    self.sync_timelapse_duration();
                }
                if self.config.mode == 0 && self.config.tinterval == 0 {
                    self.reset_manual_shutter();
                }
            }
            Field::Speed => {
                if self.config.tinterval > 0 {
                    let exposure_secs = (self.config.shutter_micros() / 1_000_000) as i32;
                    self.config.tinterval = exposure_secs.clamp(1, Field::Tinterval.fixed_bounds().1);
                    self.sync_timelapse_duration();
                }
            }
            Field::Codec | Field::Profile | Field::Vformat | Field::VideoPreview => {
                self.clamp_video_format();
            }
            Field::Tinterval => {
                if self.config.tinterval > 0 {
                    self.sync_timelapse_duration();
                } else {
                    self.config.tduration = timing::SEGMENT_SENTINEL_SECS;
                    if self.config.mode == 0 {
                        self.reset_manual_shutter();
                    }
                }
            }
            Field::Tshots => {
                if self.config.tinterval > 0 {
                    self.sync_timelapse_duration();
                }
            }
            Field::Tduration => {
                if self.config.tinterval > 0 {
                    self.config.tshots = (self.config.tduration / self.config.tinterval).clamp(1, 999);
                    self.sync_timelapse_duration();
                }
            }
            Field::Zoom => {
                if self.config.zoom > 0 {
                    self.config.focus_window = None;
                }
            }
            _ => {}
        }
    }

    /// Keep `tduration == tinterval * tshots`, trimming shots to fit
    fn sync_timelapse_duration(&mut self) {
        let interval = self.config.tinterval;
        if interval <= 0 {
            return;
        }
        let max_shots = (MAX_TIMELAPSE_SECS / interval).max(1);
        self.config.tshots = self.config.tshots.clamp(1, max_shots);
        self.config.tduration = interval * self.config.tshots;
    }

    fn reset_manual_shutter(&mut self) {
        self.config.speed = constants::DEFAULT_MANUAL_SHUTTER_INDEX.min(self.profile.max_shutter_index);
    }

    fn clamp_video_format(&mut self) {
        let (_, max_vformat) = self.bounds(Field::Vformat);
        self.config.vformat = self.config.vformat.clamp(0, max_vformat);
        let (min_fps, max_fps) = self.bounds(Field::Fps);
        self.config.fps = self.config.fps.clamp(min_fps, max_fps);
    }

    /// Adopt a new camera profile and clamp everything that depends on it
    ///
    /// Format is clamped before frame rate since the rate ceiling depends on
    /// the format.
    pub fn recompute_bounds(&mut self, profile: &CameraProfile) {
        self.profile = profile.clone();
        self.config.camera = profile.slot;

        for field in [Field::Vformat, Field::Fps] {
            let (min, max) = self.bounds(field);
            *self.config.slot_mut(field) = self.config.get(field).clamp(min, max);
        }
        for field in Field::ALL {
            let (min, max) = self.bounds(field);
            let value = self.config.get(field);
            if !(min..=max).contains(&value) {
                debug!(field = %field, value, min, max, "Clamped after profile change");
                *self.config.slot_mut(field) = value.clamp(min, max);
            }
        }
        self.sync_timelapse_duration();

        if !profile.variant.has_autofocus() {
            self.config.manual_focus = false;
        }
    }

    /// Control currently bound to the exposure slot
    pub fn exposure_field(&self) -> Field {
        if self.config.is_manual_exposure() {
            Field::Speed
        } else {
            Field::Ev
        }
    }

    /// Fields shown in the two white balance slots
    pub fn white_balance_fields(&self) -> [Field; 2] {
        if self.config.awb == 0 {
            [Field::Blue, Field::Red]
        } else {
            [Field::Denoise, Field::Sharpness]
        }
    }

    pub fn shutter_label(&self) -> String {
        constants::shutter_label(self.config.speed.max(0) as usize)
    }

    /// "Auto", or analogue/digital split such as `"20 :  16/1.2"`
    pub fn gain_label(&self) -> String {
        let gain = self.config.gain;
        if gain == 0 {
            return "Auto".to_string();
        }
        let step = self.profile.gain_step();
        if gain <= step {
            format!("{} :  {}/1", gain, gain)
        } else {
            let digital: String = decimal(gain as f64 / step as f64).chars().take(3).collect();
            format!("{} :  {}/{}", gain, step, digital)
        }
    }

    /// Value of a field as shown on the panel
    pub fn display_value(&self, field: Field) -> String {
        let c = &self.config;
        let pick = |table: &[&str], index: i32| {
            table
                .get(index.max(0) as usize)
                .copied()
                .unwrap_or("?")
                .to_string()
        };
        match field {
            Field::Mode => pick(&options::MODES, c.mode),
            Field::Speed => self.shutter_label(),
            Field::Gain => self.gain_label(),
            Field::Extn => pick(&options::STILL_ENCODINGS, c.extn),
            Field::Meter => pick(&options::METERING, c.meter),
            Field::Awb => pick(&options::AWB, c.awb),
            Field::Denoise => pick(&options::DENOISE, c.denoise),
            Field::Histogram => pick(&options::HISTOGRAMS, c.histogram),
            Field::Codec => pick(&options::CODECS, c.codec),
            Field::Profile => pick(&options::H264_PROFILES, c.profile),
            Field::V3FocusMode => pick(&options::AF_MODES, c.v3_f_mode),
            Field::V3FocusRange => pick(&options::AF_RANGES, c.v3_f_range),
            Field::V3FocusSpeed => pick(&options::AF_SPEEDS, c.v3_f_speed),
            Field::Vformat => {
                let format = self.profile.video_format(c.vformat);
                format!("{}x{}", format.width, format.height)
            }
            Field::Blue | Field::Red | Field::Saturation | Field::Sharpness => {
                decimal(c.get(field) as f64 / 10.0)
            }
            Field::V3Focus => decimal(c.v3_focus as f64 / 100.0),
            Field::Tinterval if c.tinterval == 0 => "continuous".to_string(),
            other => c.get(other).to_string(),
        }
    }

    /// Autofocus on the touched point of the preview
    ///
    /// Only the v3 supports windows, and only when not zoomed.
    pub fn set_focus_spot(&mut self, x: i32, y: i32, preview: (u32, u32)) -> bool {
        if self.profile.variant != CameraVariant::V3 || self.config.zoom > 0 {
            return false;
        }
        self.config.focus_window = Some(FocusWindow::from_touch(x, y, preview.0, preview.1));
        true
    }

    pub fn clear_focus_spot(&mut self) {
        self.config.focus_window = None;
    }

    /// Cycle the focus mode for the attached camera
    pub fn toggle_focus_mode(&mut self) -> FocusToggle {
        let c = &mut self.config;
        match self.profile.variant {
            CameraVariant::V3 => {
                match c.v3_f_mode {
                    0 => {
                        c.v3_f_mode = 1;
                        c.focus_mode = true;
                        c.manual_focus = true;
                    }
                    1 => {
                        c.v3_f_mode = 2;
                        c.focus_mode = false;
                        c.manual_focus = false;
                        c.zoom = 0;
                        c.focus_window = None;
                    }
                    _ => {
                        c.v3_f_mode = 0;
                        c.focus_mode = false;
                        c.manual_focus = false;
                        c.zoom = 0;
                        c.focus_window = None;
                    }
                }
                FocusToggle::AutofocusMode { mode: c.v3_f_mode }
            }
            variant if variant.is_arducam() => {
                if c.manual_focus {
                    c.manual_focus = false;
                    c.focus_mode = false;
                    c.zoom = 0;
                } else {
                    c.manual_focus = true;
                    c.focus_mode = true;
                }
                FocusToggle::ManualMotor {
                    enabled: c.manual_focus,
                }
            }
            _ => {
                if c.focus_mode {
                    c.focus_mode = false;
                    c.zoom = 0;
                } else {
                    c.focus_mode = true;
                    c.zoom = 4;
                    c.focus_window = None;
                }
                FocusToggle::FocusAid {
                    enabled: c.focus_mode,
                }
            }
        }
    }

    /// Record a motor position read back from the device
    pub fn sync_motor_focus(&mut self, position: i32) {
        let (min, max) = self.bounds(Field::Focus);
        self.config.focus = position.clamp(min, max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(variant: CameraVariant) -> ParameterStore {
        ParameterStore::new(CaptureConfig::default(), CameraProfile::for_variant(variant, 0))
    }

    #[test]
    fn test_set_clamps_to_static_bounds() {
        let mut store = store(CameraVariant::V2);
        assert_eq!(store.set(Field::Brightness, 500), 100);
        assert_eq!(store.set(Field::Brightness, -500), -100);
        assert_eq!(store.set(Field::Blue, 0), 1);
    }

    #[test]
    fn test_focus_window_arg_keeps_decimals() {
        let window = FocusWindow::from_touch(25, 20, 800, 600);
        assert_eq!(window.to_arg(), "0.0,0.0,0.0625,0.0625");
    }

    #[test]
    fn test_gain_bounded_by_camera() {
        let mut store = store(CameraVariant::V2);
        assert_eq!(store.set(Field::Gain, 200), 40);
        store.recompute_bounds(&CameraProfile::for_variant(CameraVariant::V1, 0));
        assert_eq!(store.set(Field::Gain, 200), 200);
    }

    #[test]
    fn test_hdr_only_on_v3() {
        let mut hq = store(CameraVariant::Hq);
        assert_eq!(hq.set(Field::V3Hdr, 1), 0);
        let mut v3 = store(CameraVariant::V3);
        assert_eq!(v3.set(Field::V3Hdr, 1), 1);
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>(), Ok(field));
        }
        assert!("nonsense".parse::<Field>().is_err());
    }

    #[test]
    fn test_gain_label() {
        let mut store = store(CameraVariant::Hq);
        assert_eq!(store.gain_label(), "Auto");
        store.set(Field::Gain, 10);
        assert_eq!(store.gain_label(), "10 :  10/1");
        store.set(Field::Gain, 33);
        assert_eq!(store.gain_label(), "33 :  22/1.5");
    }

    #[test]
    fn test_zoom_clears_focus_window() {
        let mut store = store(CameraVariant::V3);
        assert!(store.set_focus_spot(400, 300, (800, 600)));
        assert!(store.config().focus_window.is_some());
        store.set(Field::Zoom, 2);
        assert!(store.config().focus_window.is_none());
        assert!(!store.set_focus_spot(400, 300, (800, 600)));
    }

    #[test]
    fn test_v3_focus_cycle() {
        let mut store = store(CameraVariant::V3);
        assert_eq!(store.toggle_focus_mode(), FocusToggle::AutofocusMode { mode: 1 });
        assert!(store.config().manual_focus);
        assert_eq!(store.toggle_focus_mode(), FocusToggle::AutofocusMode { mode: 2 });
        assert_eq!(store.toggle_focus_mode(), FocusToggle::AutofocusMode { mode: 0 });
        assert!(!store.config().manual_focus);
    }

    #[test]
    fn test_fixed_focus_aid_zooms() {
        let mut store = store(CameraVariant::Hq);
        assert_eq!(store.toggle_focus_mode(), FocusToggle::FocusAid { enabled: true });
        assert_eq!(store.get(Field::Zoom), 4);
        assert_eq!(store.toggle_focus_mode(), FocusToggle::FocusAid { enabled: false });
        assert_eq!(store.get(Field::Zoom), 0);
    }
}
