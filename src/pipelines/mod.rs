// SPDX-License-Identifier: MPL-2.0

//! Capture pipelines
//!
//! A capture runs in three steps: the parameter snapshot is compiled into a
//! [`command::CapturePlan`], the [`supervisor::ProcessSupervisor`] spawns
//! and watches the external tool, and for timelapses the
//! [`timelapse::TimelapseRunner`] sequences shots on top of the supervisor.
//!
//! ```text
//! ┌────────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ CaptureConfig  │ ──▶ │   Compiler   │ ──▶ │    Supervisor    │
//! │ CameraProfile  │     │  rule tables │     │ rpicam-* process │
//! └────────────────┘     └──────────────┘     └──────────────────┘
//! ```

pub mod command;
pub mod metadata;
pub mod supervisor;
pub mod timelapse;

pub use command::{CaptureIntent, CapturePlan, CompileEnv, Completion, TimelapseMode, compile};
pub use metadata::StillMetadata;
pub use supervisor::{CancelToken, JobReport, JobState, PollStatus, ProcessSupervisor};
pub use timelapse::{TimelapseProgress, TimelapseReport, TimelapseRunner};
