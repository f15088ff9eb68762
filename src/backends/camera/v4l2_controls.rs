// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 sub-device control access
//!
//! Just enough of the control ioctls to drive a lens motor: query the
//! absolute focus range and read or write the position.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use tracing::{debug, warn};

const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a0000;
const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

/// Absolute lens position
pub const V4L2_CID_FOCUS_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 10;

const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;

// (dir << 30) | (size << 16) | ('V' << 8) | nr, dir 3 = read/write
const VIDIOC_G_CTRL: libc::c_ulong = 0xC008561B;
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;
const VIDIOC_QUERYCTRL: libc::c_ulong = 0xC0445624;

#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

#[repr(C)]
struct V4l2Queryctrl {
    id: u32,
    ctrl_type: u32,
    name: [u8; 32],
    minimum: i32,
    maximum: i32,
    step: i32,
    default_value: i32,
    flags: u32,
    reserved: [u32; 2],
}

/// Range and default of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRange {
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
}

/// Query a control; `None` if the node lacks it or it is disabled
pub fn query_control(device_path: &str, control_id: u32) -> Option<ControlRange> {
    let file = File::open(device_path).ok()?;

    let mut query = V4l2Queryctrl {
        id: control_id,
        ctrl_type: 0,
        name: [0; 32],
        minimum: 0,
        maximum: 0,
        step: 0,
        default_value: 0,
        flags: 0,
        reserved: [0; 2],
    };

    let result =
        unsafe { libc::ioctl(file.as_raw_fd(), VIDIOC_QUERYCTRL, &mut query as *mut V4l2Queryctrl) };
    if result < 0 || query.flags & V4L2_CTRL_FLAG_DISABLED != 0 {
        return None;
    }

    Some(ControlRange {
        minimum: query.minimum,
        maximum: query.maximum,
        step: query.step,
        default_value: query.default_value,
    })
}

pub fn get_control(device_path: &str, control_id: u32) -> Option<i32> {
    let file = File::open(device_path).ok()?;
    let mut control = V4l2Control {
        id: control_id,
        value: 0,
    };

    let result =
        unsafe { libc::ioctl(file.as_raw_fd(), VIDIOC_G_CTRL, &mut control as *mut V4l2Control) };
    if result < 0 {
        debug!(device_path, control_id, "Reading V4L2 control failed");
        return None;
    }
    Some(control.value)
}

pub fn set_control(device_path: &str, control_id: u32, value: i32) -> Result<(), String> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(device_path)
        .map_err(|e| format!("Failed to open {}: {}", device_path, e))?;

    let mut control = V4l2Control {
        id: control_id,
        value,
    };

    let result =
        unsafe { libc::ioctl(file.as_raw_fd(), VIDIOC_S_CTRL, &mut control as *mut V4l2Control) };
    if result < 0 {
        let errno = std::io::Error::last_os_error();
        warn!(device_path, control_id, value, ?errno, "Writing V4L2 control failed");
        return Err(format!("Failed to set control: {}", errno));
    }

    if control.value != value {
        debug!(
            device_path,
            requested = value,
            actual = control.value,
            "Driver clamped control value"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_control_id() {
        assert_eq!(V4L2_CID_FOCUS_ABSOLUTE, 0x009a090a);
    }

    #[test]
    fn test_missing_device() {
        assert!(query_control("/dev/does-not-exist", V4L2_CID_FOCUS_ABSOLUTE).is_none());
        assert!(get_control("/dev/does-not-exist", V4L2_CID_FOCUS_ABSOLUTE).is_none());
        assert!(set_control("/dev/does-not-exist", V4L2_CID_FOCUS_ABSOLUTE, 10).is_err());
    }
}
