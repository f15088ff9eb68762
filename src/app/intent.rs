// SPDX-License-Identifier: GPL-3.0-only

//! User intents and what handling them produced

use crate::app::state::{Field, FocusToggle};
use crate::backends::camera::CameraVariant;
use crate::pipelines::{StillMetadata, TimelapseReport};
use std::path::PathBuf;
use std::time::Duration;

/// One user action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Start (or restart) the live preview
    Preview,
    CaptureStill { binned: bool },
    CaptureVideo,
    StreamVideo,
    CaptureTimelapse { binned: bool },
    /// Move to the next populated camera slot
    SwitchCamera,
    ToggleFocusMode,
    /// Write the capture parameters to disk
    Save,
    /// Stop whatever is running
    Stop,
    Exit,
    /// Set a field to a value (clamped)
    Adjust { field: Field, value: i32 },
    /// Move a field by a signed step (clamped)
    Step { field: Field, delta: i32 },
    /// Move the lens while in manual focus
    FocusStep(i32),
    /// Touch point on the preview for spot autofocus
    FocusSpot { x: i32, y: i32 },
}

impl Intent {
    /// Intents that run a bounded capture job
    pub fn is_capture(&self) -> bool {
        matches!(
            self,
            Intent::CaptureStill { .. }
                | Intent::CaptureVideo
                | Intent::StreamVideo
                | Intent::CaptureTimelapse { .. }
        )
    }
}

/// Progress of a running capture, for status lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobProgress {
    pub elapsed: Duration,
    pub remaining: Option<Duration>,
    pub shots_taken: Option<u32>,
    pub shots_total: Option<u32>,
}

/// Result of handling an intent
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing changed
    Unchanged,
    /// A field now holds `value`
    Changed { field: Field, value: i32 },
    PreviewStarted,
    Still {
        path: PathBuf,
        metadata: StillMetadata,
    },
    Video {
        path: Option<PathBuf>,
        elapsed: Duration,
    },
    Timelapse(TimelapseReport),
    CameraSwitched { slot: u32, variant: CameraVariant },
    Focus(FocusToggle),
    /// Lens or motor moved to a position
    FocusMoved(i32),
    FocusSpotSet,
    Saved(PathBuf),
    Stopped,
    Exit,
}
