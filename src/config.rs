// SPDX-License-Identifier: GPL-3.0-only

//! Configuration
//!
//! Two files are involved. The capture parameters live in a flat file of
//! newline separated integers whose line order is fixed, so files written
//! by older panels keep loading. Panel settings that are not capture
//! parameters (directories, preview size, timeouts) live in a JSON file in
//! the user config directory.

use crate::app::state::CaptureConfig;
use crate::constants::timing;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// File name of the capture parameter file in the home directory
pub const PARAMETER_FILE_NAME: &str = "PiLCConfig12.txt";

/// Number of lines in the capture parameter file
pub const PERSISTED_FIELD_COUNT: usize = 32;

const APP_DIR: &str = "rpicam-panel";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Panel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    /// Preview window width in pixels
    pub preview_width: u32,
    /// Preview window height in pixels
    pub preview_height: u32,
    /// Where stills and timelapse frames go
    pub pictures_dir: PathBuf,
    /// Where videos go
    pub videos_dir: PathBuf,
    /// Scratch directory for preview frames (tmpfs)
    pub preview_dir: PathBuf,
    /// Capture parameter file
    pub parameter_file: PathBuf,
    /// TCP port for network streaming
    pub stream_port: u16,
    /// Let Arducam sensors run their own continuous autofocus
    pub arducam_autofocus: bool,
    /// Program used for camera enumeration
    pub list_program: String,
    /// Directory holding rpicam-still/vid/raw, unset to search `PATH`
    pub tool_dir: Option<PathBuf>,
    /// Seconds a still may take before it is reported as failed
    pub still_timeout_secs: u64,
    /// Quiet period before a changed preview is restarted
    pub debounce_ms: u64,
    /// Time a stopped job gets before it is killed
    pub stop_grace_ms: u64,
}

impl Default for PanelSettings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
        Self {
            preview_width: 800,
            preview_height: 600,
            pictures_dir: dirs::picture_dir().unwrap_or_else(|| home.join("Pictures")),
            videos_dir: dirs::video_dir().unwrap_or_else(|| home.join("Videos")),
            preview_dir: PathBuf::from("/run/shm"),
            parameter_file: home.join(PARAMETER_FILE_NAME),
            stream_port: 5000,
            arducam_autofocus: false,
            list_program: crate::backends::camera::DEFAULT_LIST_PROGRAM.to_string(),
            tool_dir: None,
            still_timeout_secs: timing::DEFAULT_STILL_TIMEOUT_SECS,
            debounce_ms: timing::DEFAULT_DEBOUNCE_MS,
            stop_grace_ms: timing::DEFAULT_STOP_GRACE_MS,
        }
    }
}

impl PanelSettings {
    /// Default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE_NAME))
    }

    /// Load settings, falling back to defaults when missing or unreadable
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                debug!(path = %path.display(), "No settings file, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable settings");
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn preview_size(&self) -> (u32, u32) {
        (self.preview_width, self.preview_height)
    }

    pub fn still_timeout(&self) -> Duration {
        Duration::from_secs(self.still_timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

/// Capture parameters in file order
pub fn to_values(config: &CaptureConfig) -> [i32; PERSISTED_FIELD_COUNT] {
    [
        config.mode,
        config.speed,
        config.gain,
        config.brightness,
        config.contrast,
        config.frame,
        config.red,
        config.blue,
        config.ev,
        config.vlen,
        config.fps,
        config.vformat,
        config.codec,
        config.tinterval,
        config.tshots,
        config.extn,
        config.zoom_x,
        config.zoom_y,
        config.zoom,
        config.saturation,
        config.meter,
        config.awb,
        config.sharpness,
        config.denoise,
        config.quality,
        config.profile,
        config.level,
        config.histogram,
        config.histarea,
        config.v3_f_speed,
        config.v3_f_range,
        config.rotate,
    ]
}

/// Build capture parameters from file order values
///
/// Missing trailing values keep their defaults. Zoom always starts at 0
/// and the timelapse duration is derived rather than stored.
pub fn from_values(values: &[i32]) -> CaptureConfig {
    let mut config = CaptureConfig::default();
    let slots: [&mut i32; PERSISTED_FIELD_COUNT] = [
        &mut config.mode,
        &mut config.speed,
        &mut config.gain,
        &mut config.brightness,
        &mut config.contrast,
        &mut config.frame,
        &mut config.red,
        &mut config.blue,
        &mut config.ev,
        &mut config.vlen,
        &mut config.fps,
        &mut config.vformat,
        &mut config.codec,
        &mut config.tinterval,
        &mut config.tshots,
        &mut config.extn,
        &mut config.zoom_x,
        &mut config.zoom_y,
        &mut config.zoom,
        &mut config.saturation,
        &mut config.meter,
        &mut config.awb,
        &mut config.sharpness,
        &mut config.denoise,
        &mut config.quality,
        &mut config.profile,
        &mut config.level,
        &mut config.histogram,
        &mut config.histarea,
        &mut config.v3_f_speed,
        &mut config.v3_f_range,
        &mut config.rotate,
    ];
    for (slot, value) in slots.into_iter().zip(values.iter()) {
        *slot = *value;
    }

    config.zoom = 0;
    config.tduration = if config.tinterval > 0 {
        config.tinterval * config.tshots
    } else {
        timing::SEGMENT_SENTINEL_SECS
    };
    config
}

/// Parse the flat parameter file
pub fn parse_parameters(text: &str) -> Result<CaptureConfig, ConfigError> {
    let mut values = Vec::with_capacity(PERSISTED_FIELD_COUNT);
    for (index, line) in text.lines().enumerate().take(PERSISTED_FIELD_COUNT) {
        let line = line.trim();
        let value = line.parse::<i32>().map_err(|_| ConfigError::Parse {
            line: index + 1,
            value: line.to_string(),
        })?;
        values.push(value);
    }
    Ok(from_values(&values))
}

/// Render the flat parameter file
pub fn render_parameters(config: &CaptureConfig) -> String {
    let mut text = String::new();
    for value in to_values(config) {
        text.push_str(&value.to_string());
        text.push('\n');
    }
    text
}

pub fn load_parameters(path: &Path) -> Result<Option<CaptureConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    parse_parameters(&text).map(Some)
}

pub fn save_parameters(path: &Path, config: &CaptureConfig) -> Result<(), ConfigError> {
    fs::write(path, render_parameters(config))?;
    info!(path = %path.display(), "Saved capture parameters");
    Ok(())
}

/// Load parameters, writing defaults on first run
pub fn load_or_init_parameters(path: &Path) -> Result<CaptureConfig, ConfigError> {
    match load_parameters(path)? {
        Some(config) => {
            debug!(path = %path.display(), "Loaded capture parameters");
            Ok(config)
        }
        None => {
            let config = CaptureConfig::default();
            save_parameters(path, &config)?;
            info!(path = %path.display(), "Created default capture parameters");
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_order() {
        let mut config = CaptureConfig::default();
        config.mode = 0;
        config.brightness = -20;
        config.rotate = 3;
        let values = to_values(&config);
        assert_eq!(values.len(), PERSISTED_FIELD_COUNT);
        assert_eq!(values[0], 0);
        assert_eq!(values[3], -20);
        assert_eq!(values[5], 1);
        assert_eq!(values[31], 3);
    }

    #[test]
    fn test_zoom_not_restored() {
        let mut config = CaptureConfig::default();
        config.zoom = 3;
        let loaded = parse_parameters(&render_parameters(&config)).unwrap();
        assert_eq!(loaded.zoom, 0);
    }

    #[test]
    fn test_short_file_keeps_defaults() {
        let loaded = parse_parameters("0\n30\n").unwrap();
        assert_eq!(loaded.mode, 0);
        assert_eq!(loaded.speed, 30);
        assert_eq!(loaded.contrast, 70);
    }

    #[test]
    fn test_garbage_line_is_an_error() {
        let err = parse_parameters("1\n16\nx\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 3, .. }));
    }
}
