// SPDX-License-Identifier: GPL-3.0-only

//! Camera and preview handlers
//!
//! Preview lifecycle and switching between camera slots.

use crate::app::PanelController;
use crate::app::intent::Outcome;
use crate::backends::camera::FocusController;
use crate::errors::AppResult;
use crate::pipelines::{CaptureIntent, compile};
use crate::storage;
use tracing::{debug, info};

impl PanelController {
    pub(crate) fn handle_preview(&mut self) -> AppResult<Outcome> {
        self.preview_enabled = true;
        if let Err(e) = self.restart_preview() {
            self.preview_enabled = false;
            return Err(e);
        }
        Ok(Outcome::PreviewStarted)
    }

    /// Replace the running preview with one built from the current parameters
    pub(crate) fn restart_preview(&mut self) -> AppResult<()> {
        self.supervisor.stop();

        let env = self.compile_env();
        storage::clear_preview_frames(&env.preview_dir);
        storage::ensure_dir(&env.preview_dir)?;

        let plan = compile(self.store.config(), self.store.profile(), &CaptureIntent::Preview, &env);
        debug!(command = %plan.command_line(), "Restarting preview");
        self.supervisor.start(&plan)?;
        self.dirty = false;
        self.last_change = None;
        Ok(())
    }

    /// Move to the next populated slot and rebuild the camera profile
    ///
    /// Any running job is stopped; the preview follows on the next tick.
    pub(crate) fn handle_switch_camera(&mut self) -> Outcome {
        self.supervisor.stop();

        let current = self.store.config().camera;
        let next = self.detector.inventory().next_slot(current);
        let profile = if self.detector.inventory().same_cams {
            self.detector.reuse_for_slot(next)
        } else {
            self.detector.detect(next)
        };

        info!(from = current, to = next, camera = %profile.variant, "Switching camera");
        self.store.recompute_bounds(&profile);
        self.focus = FocusController::probe(profile.variant);
        self.mark_dirty();

        Outcome::CameraSwitched {
            slot: next,
            variant: profile.variant,
        }
    }
}
