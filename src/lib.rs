// SPDX-License-Identifier: MPL-2.0

//! rpicam-panel - a control panel for Raspberry Pi camera rigs
//!
//! The panel keeps a set of capture parameters, turns them into `rpicam-*`
//! command lines and supervises the tools it launches.
//!
//! # Architecture
//!
//! - [`app`]: parameter store, intents and the [`PanelController`]
//! - [`backends`]: camera detection, capability table and focus devices
//! - [`pipelines`]: command compiler, process supervisor and timelapse runner
//! - [`config`]: persisted capture parameters and panel settings
//! - [`storage`]: output naming and scratch directory handling
//! - [`terminal`]: the interactive terminal front end
//!
//! # Example
//!
//! ```ignore
//! use rpicam_panel::{Intent, PanelController, PanelSettings};
//!
//! let mut panel = PanelController::open(PanelSettings::load_or_default(None), None)?;
//! panel.handle(Intent::CaptureStill { binned: false })?;
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{CaptureConfig, Field, Intent, JobProgress, Outcome, PanelController, ParameterStore};
pub use backends::camera::{CameraDetector, CameraProfile, CameraVariant};
pub use config::PanelSettings;
pub use errors::{AppError, AppResult, ConfigError, SupervisorError};
pub use pipelines::{CaptureIntent, CapturePlan, ProcessSupervisor, compile};
