// SPDX-License-Identifier: GPL-3.0-only

//! Hardware capability table
//!
//! Static per-sensor limits. Everything the parameter store clamps against
//! that depends on the attached camera is derived from a [`CameraProfile`].

use crate::constants::{SHUTTERS, options, video, zoom};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Supported camera modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CameraVariant {
    #[default]
    Unknown,
    /// Pi camera v1 (OV5647)
    V1,
    /// Pi camera v2 (IMX219)
    V2,
    /// Pi camera v3 (IMX708), autofocus lens
    V3,
    /// Pi HQ camera (IMX477)
    Hq,
    /// Arducam 16MP (IMX519), motorised focus
    Arducam16,
    /// Arducam 64MP (Hawkeye), motorised focus
    Arducam64,
    /// Pi global shutter camera (IMX296)
    GlobalShutter,
}

impl CameraVariant {
    pub const ALL: [CameraVariant; 8] = [
        CameraVariant::Unknown,
        CameraVariant::V1,
        CameraVariant::V2,
        CameraVariant::V3,
        CameraVariant::Hq,
        CameraVariant::Arducam16,
        CameraVariant::Arducam64,
        CameraVariant::GlobalShutter,
    ];

    /// Match a sensor id reported by the enumeration tool
    ///
    /// Ids are compared by prefix since the tool may append mode suffixes
    /// (`imx708_wide`, `imx708_noir`).
    pub fn from_sensor_id(id: &str) -> Self {
        let id = id.trim().to_ascii_lowercase();
        if id.is_empty() {
            return CameraVariant::Unknown;
        }
        CameraVariant::ALL
            .into_iter()
            .skip(1)
            .find(|variant| id.starts_with(variant.sensor_id()))
            .unwrap_or(CameraVariant::Unknown)
    }

    pub fn sensor_id(&self) -> &'static str {
        match self {
            CameraVariant::Unknown => "",
            CameraVariant::V1 => "ov5647",
            CameraVariant::V2 => "imx219",
            CameraVariant::V3 => "imx708",
            CameraVariant::Hq => "imx477",
            CameraVariant::Arducam16 => "imx519",
            CameraVariant::Arducam64 => "arducam",
            CameraVariant::GlobalShutter => "imx296",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CameraVariant::Unknown => "Unknown",
            CameraVariant::V1 => "Pi v1",
            CameraVariant::V2 => "Pi v2",
            CameraVariant::V3 => "Pi v3",
            CameraVariant::Hq => "Pi HQ",
            CameraVariant::Arducam16 => "Arducam 16MP",
            CameraVariant::Arducam64 => "Arducam 64MP",
            CameraVariant::GlobalShutter => "Pi GS",
        }
    }

    /// Analogue gain ceiling
    pub fn max_gain(&self) -> i32 {
        match self {
            CameraVariant::Unknown => 64,
            CameraVariant::V1 => 255,
            CameraVariant::V2 => 40,
            CameraVariant::V3 => 64,
            CameraVariant::Hq => 88,
            CameraVariant::Arducam16 => 64,
            CameraVariant::Arducam64 => 64,
            CameraVariant::GlobalShutter => 64,
        }
    }

    /// Longest exposure the sensor supports, in seconds
    ///
    /// An unrecognised sensor gets the longest table entry.
    pub fn max_shutter_secs(&self) -> f64 {
        match self {
            CameraVariant::Unknown => SHUTTERS[SHUTTERS.len() - 1],
            CameraVariant::V1 => 1.0,
            CameraVariant::V2 => 11.0,
            CameraVariant::V3 => 112.0,
            CameraVariant::Hq => 650.0,
            CameraVariant::Arducam16 => 200.0,
            CameraVariant::Arducam64 => 435.0,
            CameraVariant::GlobalShutter => 15.0,
        }
    }

    /// Full active pixel area, used as the reference for crop rectangles
    pub fn active_area(&self) -> (u32, u32) {
        match self {
            CameraVariant::Unknown | CameraVariant::V1 => (2592, 1944),
            CameraVariant::V2 => (3280, 2464),
            CameraVariant::V3 => (4608, 2592),
            CameraVariant::Hq => (4056, 3040),
            CameraVariant::Arducam16 => (4656, 3496),
            CameraVariant::Arducam64 => (9152, 6944),
            CameraVariant::GlobalShutter => (1456, 1088),
        }
    }

    pub fn is_arducam(&self) -> bool {
        matches!(self, CameraVariant::Arducam16 | CameraVariant::Arducam64)
    }

    /// Lens focus can be driven by the ISP (v3) or a motor (Arducam)
    pub fn has_autofocus(&self) -> bool {
        self.is_arducam() || *self == CameraVariant::V3
    }

    /// Row into [`zoom::STILL_CROPS`], if the sensor has one
    fn still_crop_row(&self) -> Option<usize> {
        match self {
            CameraVariant::V1 => Some(0),
            CameraVariant::V2 => Some(1),
            CameraVariant::V3 => Some(2),
            CameraVariant::Hq => Some(3),
            CameraVariant::Arducam16 => Some(4),
            CameraVariant::Arducam64 => Some(5),
            CameraVariant::Unknown | CameraVariant::GlobalShutter => None,
        }
    }
}

impl fmt::Display for CameraVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Highest shutter table index whose exposure does not exceed `max_secs`
pub fn max_shutter_index(max_secs: f64) -> i32 {
    SHUTTERS
        .iter()
        .enumerate()
        .filter(|(_, value)| **value < 0.0 || **value <= max_secs)
        .map(|(index, _)| index as i32)
        .max()
        .unwrap_or(0)
}

/// A row of the video format table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub max_fps: u32,
}

/// Limits of the attached camera
///
/// Built by the detector and read-only for everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraProfile {
    pub slot: u32,
    pub variant: CameraVariant,
    /// Sensor id exactly as reported, empty when nothing was detected
    pub sensor_id: String,
    pub max_gain: i32,
    pub max_shutter_secs: f64,
    pub max_shutter_index: i32,
    /// Native resolution, from the enumeration output when it reports one
    pub active_area: (u32, u32),
    /// Scientific colour tuning file (HQ camera only)
    pub scientific_tuning: Option<PathBuf>,
    /// Tuning file for manual focus on Arducam sensors (Pi 5 only)
    pub manual_focus_tuning: Option<PathBuf>,
    /// Boot config reserves 512MB of CMA, unlocking larger Arducam formats
    pub extended_cma: bool,
    pub is_pi5: bool,
}

impl Default for CameraProfile {
    fn default() -> Self {
        Self::for_variant(CameraVariant::Unknown, 0)
    }
}

impl CameraProfile {
    /// Table defaults for a variant, with no optional capabilities
    pub fn for_variant(variant: CameraVariant, slot: u32) -> Self {
        let max_shutter_secs = variant.max_shutter_secs();
        Self {
            slot,
            variant,
            sensor_id: variant.sensor_id().to_string(),
            max_gain: variant.max_gain(),
            max_shutter_secs,
            max_shutter_index: max_shutter_index(max_shutter_secs),
            active_area: variant.active_area(),
            scientific_tuning: None,
            manual_focus_tuning: None,
            extended_cma: false,
            is_pi5: false,
        }
    }

    pub fn display_name(&self) -> &'static str {
        self.variant.display_name()
    }

    /// Gain at which the label switches from whole-number to fractional
    pub fn gain_step(&self) -> i32 {
        (self.max_gain / 4).max(1)
    }

    pub fn has_scientific_tuning(&self) -> bool {
        self.scientific_tuning.is_some()
    }

    /// Highest legal `vformat` for a codec
    ///
    /// Compressed codecs (h264) are limited by the hardware encoder; raw and
    /// mjpeg output can use larger sensor modes.
    pub fn max_vformat(&self, codec: i32) -> i32 {
        let uncompressed = codec > 0;
        match self.variant {
            v if uncompressed && v.is_arducam() && self.extended_cma => 20,
            v if uncompressed && v.is_arducam() => 14,
            CameraVariant::GlobalShutter => 7,
            CameraVariant::Hq if uncompressed => 18,
            CameraVariant::V3 if uncompressed => 19,
            CameraVariant::V2 if uncompressed => 15,
            CameraVariant::V1 if uncompressed => 14,
            CameraVariant::Hq => 12,
            _ => 10,
        }
    }

    /// Frame rate ceiling for a video format
    ///
    /// The v3 sensor has its own column and runs faster at 1920 and 1536
    /// wide when encoding h264 at level 4.2.
    pub fn max_fps(&self, vformat: i32, codec: i32, h264_profile: i32, video_preview: bool) -> i32 {
        let index = (vformat.max(0) as usize).min(video::WIDTHS.len() - 1);
        if self.variant != CameraVariant::V3 {
            return video::MAX_FPS[index] as i32;
        }

        let level_42 = codec == 0 && options::h264_level(h264_profile.max(0) as usize) == "4.2";
        match video::WIDTHS[index] {
            1920 if level_42 => {
                if video_preview {
                    45
                } else {
                    60
                }
            }
            1536 if level_42 => {
                if video_preview {
                    60
                } else {
                    90
                }
            }
            _ => video::V3_MAX_FPS[index] as i32,
        }
    }

    /// Format table row as seen by this camera
    pub fn video_format(&self, vformat: i32) -> VideoFormat {
        let index = (vformat.max(0) as usize).min(video::WIDTHS.len() - 1);
        let max_fps = if self.variant == CameraVariant::V3 {
            video::V3_MAX_FPS[index]
        } else {
            video::MAX_FPS[index]
        };
        VideoFormat {
            width: video::WIDTHS[index],
            height: video::HEIGHTS[index],
            max_fps,
        }
    }

    /// Formats reachable with a codec
    pub fn video_formats(&self, codec: i32) -> Vec<VideoFormat> {
        (0..=self.max_vformat(codec))
            .map(|index| self.video_format(index))
            .collect()
    }

    /// Crop size for a still at zoom levels 1 to 4
    ///
    /// Sensors without a dedicated crop table fall back to the preview crops.
    pub fn still_crop(&self, zoom_level: i32) -> (u32, u32) {
        let step = (4 - zoom_level.clamp(1, 4)) as usize;
        match self.variant.still_crop_row() {
            Some(row) => zoom::STILL_CROPS[row][step],
            None => (zoom::WIDTHS[step], zoom::HEIGHTS[step]),
        }
    }
}
