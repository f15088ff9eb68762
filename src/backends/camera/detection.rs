// SPDX-License-Identifier: GPL-3.0-only

//! Camera detection
//!
//! Runs the rpicam enumeration command, parses its camera list and turns the
//! sensor found in the requested slot into a [`CameraProfile`]. Detection
//! never fails: anything unparseable yields the permissive unknown profile.

use super::capabilities::{CameraProfile, CameraVariant};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Default enumeration program
pub const DEFAULT_LIST_PROGRAM: &str = "rpicam-vid";

/// Directory holding the libcamera Raspberry Pi tuning files
pub const TUNING_ROOT: &str = "/usr/share/libcamera/ipa/rpi";

/// Boot config locations, newest layout first
pub const BOOT_CONFIGS: [&str; 2] = ["/boot/firmware/config.txt", "/boot/config.txt"];

const EXTENDED_CMA_OVERLAY: &str = "dtoverlay=vc4-kms-v3d,cma-512";

/// One populated camera connector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEntry {
    pub slot: u32,
    pub sensor_id: String,
    /// Native resolution from the `[WxH ...]` part of the line
    pub resolution: Option<(u32, u32)>,
}

/// Everything the enumeration command reported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraInventory {
    pub slots: Vec<SlotEntry>,
    /// Highest populated slot
    pub max_camera: u32,
    /// Two cameras with the same sensor; switching needs no re-detection
    pub same_cams: bool,
}

impl CameraInventory {
    pub fn slot(&self, slot: u32) -> Option<&SlotEntry> {
        self.slots.iter().find(|entry| entry.slot == slot)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot after `current`, wrapping past the highest populated one
    pub fn next_slot(&self, current: u32) -> u32 {
        if current >= self.max_camera {
            0
        } else {
            current + 1
        }
    }
}

/// Parse `rpicam-vid --list-cameras` output
///
/// Camera lines look like
/// `0 : imx708 [4608x2592 10-bit RGGB] (/base/soc/i2c0mux/i2c@1/imx708@1a)`.
/// Indented mode listings also contain ` : ` but never start with a digit.
pub fn parse_camera_list(output: &str) -> CameraInventory {
    let mut slots = Vec::new();

    for line in output.lines() {
        if !line.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let Some((slot_part, rest)) = line.split_once(" : ") else {
            continue;
        };
        let Ok(slot) = slot_part.trim().parse::<u32>() else {
            continue;
        };

        let mut tokens = rest.split_whitespace();
        let Some(sensor_id) = tokens.next() else {
            continue;
        };
        let resolution = tokens
            .next()
            .and_then(|token| token.strip_prefix('['))
            .and_then(parse_resolution);

        debug!(slot, sensor = %sensor_id, ?resolution, "Found camera slot");
        slots.push(SlotEntry {
            slot,
            sensor_id: sensor_id.to_string(),
            resolution,
        });
    }

    let max_camera = slots.iter().map(|entry| entry.slot).max().unwrap_or(0);
    let same_cams = max_camera == 1
        && match (
            slots.iter().find(|e| e.slot == 0),
            slots.iter().find(|e| e.slot == 1),
        ) {
            (Some(a), Some(b)) => a.sensor_id == b.sensor_id,
            _ => false,
        };

    CameraInventory {
        slots,
        max_camera,
        same_cams,
    }
}

/// Parse "4608x2592" (trailing punctuation allowed)
fn parse_resolution(token: &str) -> Option<(u32, u32)> {
    let (width, height) = token.split_once('x')?;
    let height: String = height.chars().take_while(|c| c.is_ascii_digit()).collect();
    Some((width.parse().ok()?, height.parse().ok()?))
}

/// True when a `/proc/cpuinfo` dump comes from a Raspberry Pi 5
pub fn is_pi5(cpuinfo: &str) -> bool {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("Model"))
        .filter_map(|line| line.split_once(':'))
        .any(|(_, model)| model.split_whitespace().nth(2) == Some("5"))
}

/// True when a boot config enables the 512MB CMA overlay
pub fn has_extended_cma(boot_config: &str) -> bool {
    boot_config
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .any(|line| line.contains(EXTENDED_CMA_OVERLAY))
}

/// Facts about the host that shape a profile beyond the sensor table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostFacts {
    pub scientific_tuning: Option<PathBuf>,
    pub manual_focus_tuning: Option<PathBuf>,
    pub extended_cma: bool,
    pub is_pi5: bool,
}

/// Combine a slot from the inventory with host facts
pub fn build_profile(inventory: &CameraInventory, slot: u32, host: &HostFacts) -> CameraProfile {
    let entry = inventory.slot(slot);
    let variant = entry
        .map(|e| CameraVariant::from_sensor_id(&e.sensor_id))
        .unwrap_or_default();

    let mut profile = CameraProfile::for_variant(variant, slot);
    if let Some(entry) = entry {
        profile.sensor_id = entry.sensor_id.clone();
        if let Some(area) = entry.resolution {
            profile.active_area = area;
        }
    }

    profile.is_pi5 = host.is_pi5;
    profile.extended_cma = host.extended_cma && variant.is_arducam();
    if variant == CameraVariant::Hq {
        profile.scientific_tuning = host.scientific_tuning.clone();
    }
    if variant.is_arducam() && host.is_pi5 {
        profile.manual_focus_tuning = host.manual_focus_tuning.clone();
    }
    profile
}

/// Runs the enumeration command and owns the current profile
pub struct CameraDetector {
    program: String,
    tuning_root: PathBuf,
    boot_configs: Vec<PathBuf>,
    cpuinfo: PathBuf,
    inventory: CameraInventory,
    profile: CameraProfile,
}

impl Default for CameraDetector {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_PROGRAM)
    }
}

impl CameraDetector {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            tuning_root: PathBuf::from(TUNING_ROOT),
            boot_configs: BOOT_CONFIGS.iter().map(PathBuf::from).collect(),
            cpuinfo: PathBuf::from("/proc/cpuinfo"),
            inventory: CameraInventory::default(),
            profile: CameraProfile::default(),
        }
    }

    /// Look for tuning files somewhere other than the system location
    pub fn with_tuning_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.tuning_root = root.into();
        self
    }

    pub fn inventory(&self) -> &CameraInventory {
        &self.inventory
    }

    pub fn profile(&self) -> &CameraProfile {
        &self.profile
    }

    /// Re-run enumeration and build the profile for `slot`
    pub fn detect(&mut self, slot: u32) -> CameraProfile {
        self.inventory = self.enumerate();
        let host = self.host_facts();
        self.profile = build_profile(&self.inventory, slot, &host);

        info!(
            slot,
            camera = %self.profile.variant,
            sensor = %self.profile.sensor_id,
            max_camera = self.inventory.max_camera,
            same_cams = self.inventory.same_cams,
            max_gain = self.profile.max_gain,
            max_shutter_index = self.profile.max_shutter_index,
            scientific = self.profile.has_scientific_tuning(),
            "Camera detected"
        );
        self.profile.clone()
    }

    /// Switch slots reusing the previous enumeration
    ///
    /// Only valid when both slots carry the same sensor.
    pub fn reuse_for_slot(&mut self, slot: u32) -> CameraProfile {
        self.profile.slot = slot;
        self.profile.clone()
    }

    /// Run `<program> --list-cameras`; an empty inventory on any failure
    pub fn enumerate(&self) -> CameraInventory {
        debug!(program = %self.program, "Enumerating cameras");

        let output = match Command::new(&self.program).arg("--list-cameras").output() {
            Ok(output) => output,
            Err(e) => {
                warn!(program = %self.program, error = %e, "Camera enumeration failed to run");
                return CameraInventory::default();
            }
        };

        // The list goes to stdout on current releases and stderr on older ones
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let inventory = parse_camera_list(&text);
        if inventory.is_empty() {
            warn!(
                program = %self.program,
                status = ?output.status.code(),
                "No cameras reported, using permissive defaults"
            );
        } else {
            info!(count = inventory.slots.len(), "Enumerated cameras");
        }
        inventory
    }

    /// Probe tuning files, boot config and board model
    pub fn host_facts(&self) -> HostFacts {
        let cpuinfo = std::fs::read_to_string(&self.cpuinfo).unwrap_or_default();
        let extended_cma = self
            .boot_configs
            .iter()
            .filter_map(|path| std::fs::read_to_string(path).ok())
            .any(|config| has_extended_cma(&config));

        HostFacts {
            scientific_tuning: first_existing(&[
                self.tuning_root.join("vc4/imx477_scientific.json"),
                self.tuning_root.join("pisp/imx477_scientific.json"),
            ]),
            manual_focus_tuning: first_existing(&[self.tuning_root.join("pisp/imx519mf.json")]),
            extended_cma,
            is_pi5: is_pi5(&cpuinfo),
        }
    }
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| Path::new(p).exists()).cloned()
}
