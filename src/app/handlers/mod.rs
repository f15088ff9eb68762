// SPDX-License-Identifier: GPL-3.0-only

//! Intent handler modules
//!
//! Handlers are grouped by domain; each file adds methods to
//! [`PanelController`](super::PanelController).

pub mod camera;
pub mod capture;
pub mod focus;
