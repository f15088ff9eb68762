// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Lookup tables shared by the parameter store and the command compiler.
//! Indices into these tables are what the persisted configuration stores,
//! so their order is part of the on-disk format.

use std::time::Duration;

/// Exposure time table
///
/// Negative entries are fractions (`-4000` is 1/4000 s), positive entries
/// are whole or decimal seconds.
pub const SHUTTERS: [f64; 75] = [
    -4000.0, -2000.0, -1600.0, -1250.0, -1000.0, -800.0, -640.0, -500.0, -400.0, -320.0, -288.0,
    -250.0, -240.0, -200.0, -160.0, -144.0, -125.0, -120.0, -100.0, -96.0, -80.0, -60.0, -50.0,
    -48.0, -40.0, -30.0, -25.0, -20.0, -15.0, -13.0, -10.0, -8.0, -6.0, -5.0, -4.0, -3.0, 0.4,
    0.5, 0.6, 0.8, 1.0, 1.1, 1.2, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 15.0, 20.0,
    25.0, 30.0, 40.0, 50.0, 60.0, 75.0, 100.0, 112.0, 120.0, 150.0, 200.0, 220.0, 230.0, 239.0,
    435.0, 500.0, 600.0, 650.0, 660.0, 670.0,
];

/// Shutter index selected when returning to manual exposure (1/144 s)
pub const DEFAULT_MANUAL_SHUTTER_INDEX: i32 = 15;

/// Exposure time in seconds for a shutter table index
pub fn shutter_seconds(index: usize) -> f64 {
    let value = SHUTTERS[index.min(SHUTTERS.len() - 1)];
    if value < 0.0 { 1.0 / value.abs() } else { value }
}

/// Exposure time in microseconds for a shutter table index
///
/// Truncates, then rounds up when the dropped fraction is above one half.
pub fn shutter_micros(index: usize) -> u64 {
    let exact = shutter_seconds(index) * 1_000_000.0;
    let whole = exact as u64;
    if exact - whole as f64 > 0.5 { whole + 1 } else { whole }
}

/// Human readable exposure label ("1/125" or "11")
pub fn shutter_label(index: usize) -> String {
    let value = SHUTTERS[index.min(SHUTTERS.len() - 1)];
    if value < 0.0 {
        format!("1/{}", value.abs() as u32)
    } else if value.fract() == 0.0 {
        format!("{}", value as u32)
    } else {
        format!("{}", value)
    }
}

/// Enumerated option names passed verbatim to the capture tools
pub mod options {
    /// Exposure modes; index 0 is manual shutter
    pub const MODES: [&str; 3] = ["manual", "normal", "sport"];
    /// Still encodings (`-e` values)
    pub const STILL_ENCODINGS: [&str; 6] = ["jpg", "png", "bmp", "rgb", "yuv420", "raw"];
    /// File extensions written for each still encoding
    pub const STILL_EXTENSIONS: [&str; 6] = ["jpg", "png", "bmp", "data", "data", "dng"];
    /// Video codecs (`--codec` values)
    pub const CODECS: [&str; 4] = ["h264", "mjpeg", "yuv420", "raw"];
    /// File extensions written for each video codec
    pub const CODEC_EXTENSIONS: [&str; 4] = ["h264", "mjpeg", "data", "raw"];
    /// h264 profile and level pairs
    pub const H264_PROFILES: [&str; 9] = [
        "baseline 4",
        "baseline 4.1",
        "baseline 4.2",
        "main 4",
        "main 4.1",
        "main 4.2",
        "high 4",
        "high 4.1",
        "high 4.2",
    ];
    pub const METERING: [&str; 3] = ["centre", "spot", "average"];
    pub const AWB: [&str; 8] = [
        "off",
        "auto",
        "incandescent",
        "tungsten",
        "fluorescent",
        "indoor",
        "daylight",
        "cloudy",
    ];
    pub const DENOISE: [&str; 4] = ["off", "cdn_off", "cdn_fast", "cdn_hq"];
    pub const AF_MODES: [&str; 3] = ["auto", "manual", "continuous"];
    pub const AF_RANGES: [&str; 3] = ["normal", "macro", "full"];
    pub const AF_SPEEDS: [&str; 2] = ["normal", "fast"];
    pub const HISTOGRAMS: [&str; 6] = ["OFF", "Red", "Green", "Blue", "Lum", "ALL"];

    /// Level part of an h264 profile entry ("high 4.2" -> "4.2")
    pub fn h264_level(profile: usize) -> &'static str {
        let entry = H264_PROFILES[profile.min(H264_PROFILES.len() - 1)];
        entry.rsplit(' ').next().unwrap_or(entry)
    }
}

/// Video format table
pub mod video {
    /// Format widths, indexed by `vformat`
    pub const WIDTHS: [u32; 22] = [
        640, 720, 800, 1280, 1280, 1296, 1332, 1456, 1536, 1640, 1920, 2028, 2028, 2304, 2592, 3280,
        3840, 4032, 4056, 4608, 4656, 9152,
    ];
    /// Format heights, indexed by `vformat`
    pub const HEIGHTS: [u32; 22] = [
        480, 540, 600, 720, 960, 972, 990, 1088, 864, 1232, 1080, 1080, 1520, 1296, 1944, 2464,
        2160, 3024, 3040, 2592, 3496, 6944,
    ];
    /// Frame rate ceilings for every sensor except the v3
    pub const MAX_FPS: [u32; 22] = [
        200, 120, 40, 40, 40, 30, 30, 30, 30, 30, 30, 40, 40, 25, 20, 20, 20, 20, 10, 20, 20, 20,
    ];
    /// Frame rate ceilings for the v3 sensor
    pub const V3_MAX_FPS: [u32; 22] = [
        200, 120, 125, 66, 50, 46, 30, 30, 47, 30, 30, 30, 25, 25, 20, 20, 20, 20, 20, 15, 20, 20,
    ];
}

/// Digital zoom crop tables
pub mod zoom {
    /// Preview and video crop widths over a 1920x1440 reference frame
    pub const WIDTHS: [u32; 8] = [640, 800, 1280, 2592, 3280, 4056, 4656, 9152];
    /// Preview and video crop heights over a 1920x1440 reference frame
    pub const HEIGHTS: [u32; 8] = [480, 600, 960, 1944, 2464, 3040, 3496, 6944];
    /// Reference frame the preview and video crops are expressed against
    pub const REFERENCE: (u32, u32) = (1920, 1440);

    /// Still crop sizes per sensor, innermost crop first.
    ///
    /// Rows are v1, v2, v3, HQ, Arducam 16MP, Arducam 64MP.
    pub const STILL_CROPS: [[(u32, u32); 4]; 6] = [
        [(864, 648), (1080, 810), (1728, 1296), (2592, 1944)],
        [(1093, 821), (1367, 1027), (2187, 1643), (3280, 2464)],
        [(1536, 864), (1920, 1080), (3072, 1728), (4608, 2592)],
        [(1352, 1013), (1690, 1267), (2704, 2027), (4056, 3040)],
        [(1552, 1165), (1940, 1457), (3104, 2331), (4656, 3496)],
        [(3050, 2288), (3813, 2860), (6101, 4576), (9152, 6944)],
    ];

    /// Highest zoom level; this one crops to the preview window size
    pub const MAX_LEVEL: i32 = 5;
}

/// Preview stream constants
pub mod preview {
    /// Frame rate used while zoomed in for focusing
    pub const FOCUS_FPS: u32 = 25;
    /// Frame rate used in automatic exposure modes
    pub const PREVIEW_FPS: u32 = 10;
    /// Upper bound for the preview rate in manual exposure
    pub const MAX_MANUAL_FPS: u32 = 25;
    /// Lower bound for the preview rate in manual exposure
    pub const MIN_MANUAL_FPS: f64 = 1.0;
    /// Longest shutter the preview stream is run at
    pub const MAX_SHUTTER_MICROS: u64 = 2_000_000;
    /// Frame file pattern inside the scratch directory
    pub const FRAME_PATTERN: &str = "test%d.jpg";
}

/// Exposure thresholds where automatic gain and white balance stop converging
pub mod long_exposure {
    /// Preview, video and segment timelapse pin gain above this
    pub const PREVIEW_MICROS: u64 = 5_000_000;
    /// Stills pin gain above this
    pub const STILL_MICROS: u64 = 1_000_000;
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Poll cadence while waiting for a job to finish
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Pause between stopping and restarting the preview
    pub const RESTART_SETTLE: Duration = Duration::from_millis(250);

    /// Default quiet period before a dirty preview is restarted
    pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

    /// Default time a still capture may take before it is reported as failed
    pub const DEFAULT_STILL_TIMEOUT_SECS: u64 = 30;

    /// Default grace period between SIGTERM and SIGKILL
    pub const DEFAULT_STOP_GRACE_MS: u64 = 1_000;

    /// Still capture warm-up passed as `-t`
    pub const STILL_WARMUP_MS: u32 = 5_000;

    /// Per-shot warm-up for manual exposure timelapse
    pub const TIMELAPSE_SHOT_MS: u32 = 1_000;

    /// Duration the continuous timelapse falls back to with no interval
    pub const SEGMENT_SENTINEL_SECS: i32 = 5;
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutter_micros_rounds_fractions() {
        // 1/144 s is 6944.44 us
        assert_eq!(shutter_micros(15), 6944);
        assert_eq!(shutter_micros(16), 8000);
        // 1/3 s is 333333.33 us
        assert_eq!(shutter_micros(35), 333_333);
        assert_eq!(shutter_micros(52), 11_000_000);
    }

    #[test]
    fn test_shutter_labels() {
        assert_eq!(shutter_label(0), "1/4000");
        assert_eq!(shutter_label(36), "0.4");
        assert_eq!(shutter_label(40), "1");
        assert_eq!(shutter_label(74), "670");
    }

    #[test]
    fn test_h264_level() {
        assert_eq!(options::h264_level(0), "4");
        assert_eq!(options::h264_level(8), "4.2");
        assert_eq!(options::h264_level(4), "4.1");
    }
}
