// SPDX-License-Identifier: GPL-3.0-only

//! Lens focus control
//!
//! Arducam modules expose their focus motor and the v3 exposes its lens
//! driver as a V4L2 sub-device. The node is found once by probing
//! `/dev/v4l-subdev*` for an absolute focus control with the expected range.

use super::capabilities::CameraVariant;
use super::v4l2_controls::{self, ControlRange, V4L2_CID_FOCUS_ABSOLUTE};
use tracing::{debug, info, warn};

/// Highest motor position on Arducam focus drivers
pub const ARDUCAM_FOCUS_MAX: i32 = 4095;
/// Highest lens position on the v3 lens driver
pub const V3_FOCUS_MAX: i32 = 1023;

/// Number of sub-device nodes probed
const SUBDEV_PROBE_COUNT: u32 = 10;

/// Absolute focus capability
pub trait FocusControl {
    fn set_focus(&self, position: i32) -> Result<(), String>;
    fn get_focus(&self) -> Option<i32>;
    /// Legal positions, `None` when nothing can be driven
    fn range(&self) -> Option<(i32, i32)>;
}

/// Where focus commands go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusBackend {
    /// V4L2 sub-device with an absolute focus control
    SubDevice { device_path: String, range: ControlRange },
    /// No focus device
    None,
}

/// Focus controller bound to one sub-device
#[derive(Debug, Clone)]
pub struct FocusController {
    backend: FocusBackend,
}

impl FocusController {
    pub fn for_device(device_path: &str, range: ControlRange) -> Self {
        info!(device_path, max = range.maximum, "Using focus device");
        Self {
            backend: FocusBackend::SubDevice {
                device_path: device_path.to_string(),
                range,
            },
        }
    }

    pub fn none() -> Self {
        Self {
            backend: FocusBackend::None,
        }
    }

    pub fn backend(&self) -> &FocusBackend {
        &self.backend
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, FocusBackend::None)
    }

    /// Probe sub-devices for the focus driver of a camera variant
    pub fn probe(variant: CameraVariant) -> Self {
        let Some(expected_max) = expected_focus_max(variant) else {
            return Self::none();
        };

        for index in 0..SUBDEV_PROBE_COUNT {
            let path = format!("/dev/v4l-subdev{}", index);
            let Some(range) = v4l2_controls::query_control(&path, V4L2_CID_FOCUS_ABSOLUTE) else {
                continue;
            };
            debug!(device_path = %path, max = range.maximum, "Found focus control");
            if range.maximum == expected_max {
                return Self::for_device(&path, range);
            }
        }

        warn!(camera = %variant, "No focus device found");
        Self::none()
    }
}

/// Range a focus driver reports for a variant, if it has one
pub fn expected_focus_max(variant: CameraVariant) -> Option<i32> {
    match variant {
        CameraVariant::Arducam16 | CameraVariant::Arducam64 => Some(ARDUCAM_FOCUS_MAX),
        CameraVariant::V3 => Some(V3_FOCUS_MAX),
        _ => None,
    }
}

impl FocusControl for FocusController {
    fn set_focus(&self, position: i32) -> Result<(), String> {
        match &self.backend {
            FocusBackend::SubDevice { device_path, range } => {
                let position = position.clamp(range.minimum, range.maximum);
                debug!(device_path, position, "Setting focus");
                v4l2_controls::set_control(device_path, V4L2_CID_FOCUS_ABSOLUTE, position)
                    .map_err(|e| format!("Failed to set focus: {}", e))
            }
            FocusBackend::None => Err("Focus control not available".to_string()),
        }
    }

    fn get_focus(&self) -> Option<i32> {
        match &self.backend {
            FocusBackend::SubDevice { device_path, .. } => {
                v4l2_controls::get_control(device_path, V4L2_CID_FOCUS_ABSOLUTE)
            }
            FocusBackend::None => None,
        }
    }

    fn range(&self) -> Option<(i32, i32)> {
        match &self.backend {
            FocusBackend::SubDevice { range, .. } => Some((range.minimum, range.maximum)),
            FocusBackend::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_focus_max() {
        assert_eq!(expected_focus_max(CameraVariant::Arducam16), Some(4095));
        assert_eq!(expected_focus_max(CameraVariant::V3), Some(1023));
        assert_eq!(expected_focus_max(CameraVariant::Hq), None);
    }

    #[test]
    fn test_fixed_focus_has_no_device() {
        let controller = FocusController::probe(CameraVariant::V2);
        assert!(!controller.is_available());
        assert!(controller.set_focus(100).is_err());
        assert_eq!(controller.get_focus(), None);
        assert_eq!(controller.range(), None);
    }
}
