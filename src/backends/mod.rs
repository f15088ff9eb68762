// SPDX-License-Identifier: MPL-2.0

//! Hardware access
//!
//! - [`camera`]: sensor capability table, camera detection and lens focus

pub mod camera;
