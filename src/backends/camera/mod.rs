// SPDX-License-Identifier: MPL-2.0

//! Camera hardware
//!
//! Capability lookup per sensor variant, detection through the capture
//! tool's `--list-cameras` output, and focus control through V4L2
//! sub-devices.

pub mod capabilities;
pub mod detection;
pub mod focus;
pub mod v4l2_controls;

pub use capabilities::{CameraProfile, CameraVariant, VideoFormat, max_shutter_index};
pub use detection::{
    CameraDetector, CameraInventory, DEFAULT_LIST_PROGRAM, HostFacts, SlotEntry, build_profile,
    parse_camera_list,
};
pub use focus::{FocusBackend, FocusControl, FocusController};
