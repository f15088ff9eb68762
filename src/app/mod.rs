// SPDX-License-Identifier: MPL-2.0

//! Control panel core
//!
//! [`PanelController`] owns the parameter store, the detected camera, the
//! focus device and the process supervisor. Front ends feed it [`Intent`]s
//! and call [`PanelController::tick`] from their loop; a changed parameter
//! marks the preview dirty and `tick` restarts it once the input has been
//! quiet for the debounce interval.
//!
//! # Modules
//!
//! - `state`: capture parameters, field bounds and cross-field rules
//! - `intent`: user intents and their outcomes
//! - `handlers`: intent handlers grouped by domain

mod handlers;
pub mod intent;
pub mod state;

pub use intent::{Intent, JobProgress, Outcome};
pub use state::{CaptureConfig, Field, FocusToggle, FocusWindow, ParameterStore};

use crate::backends::camera::{
    CameraDetector, CameraInventory, CameraProfile, FocusController,
};
use crate::config::{self, PanelSettings};
use crate::errors::AppResult;
use crate::pipelines::{
    CancelToken, CaptureIntent, CapturePlan, CompileEnv, JobState, PollStatus, ProcessSupervisor,
    compile,
};
use crate::storage;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct PanelController {
    settings: PanelSettings,
    store: ParameterStore,
    detector: CameraDetector,
    supervisor: ProcessSupervisor,
    focus: FocusController,
    cancel: CancelToken,
    /// Keep a preview running between captures
    preview_enabled: bool,
    /// The running preview no longer matches the parameters
    dirty: bool,
    last_change: Option<Instant>,
}

impl PanelController {
    /// Load parameters, detect the camera and probe its focus device
    ///
    /// `slot` overrides the camera stored in the parameter file.
    pub fn open(settings: PanelSettings, slot: Option<u32>) -> AppResult<Self> {
        let mut config = config::load_or_init_parameters(&settings.parameter_file)?;
        if let Some(slot) = slot {
            config.camera = slot;
        }
        let mut detector = CameraDetector::new(&settings.list_program);
        let profile = detector.detect(config.camera);
        let focus = FocusController::probe(profile.variant);
        Ok(Self::new(settings, config, detector, profile, focus))
    }

    /// Controller over already loaded parts
    pub fn new(
        settings: PanelSettings,
        config: CaptureConfig,
        detector: CameraDetector,
        profile: CameraProfile,
        focus: FocusController,
    ) -> Self {
        info!(
            camera = %profile.variant,
            slot = profile.slot,
            focus = focus.is_available(),
            "Control panel ready"
        );
        Self {
            supervisor: ProcessSupervisor::new(settings.stop_grace()),
            store: ParameterStore::new(config, profile),
            settings,
            detector,
            focus,
            cancel: CancelToken::new(),
            preview_enabled: false,
            dirty: false,
            last_change: None,
        }
    }

    pub fn settings(&self) -> &PanelSettings {
        &self.settings
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn profile(&self) -> &CameraProfile {
        self.store.profile()
    }

    pub fn inventory(&self) -> &CameraInventory {
        self.detector.inventory()
    }

    pub fn focus(&self) -> &FocusController {
        &self.focus
    }

    pub fn job_state(&self) -> JobState {
        self.supervisor.state()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether `tick` keeps a preview running
    pub fn preview_enabled(&self) -> bool {
        self.preview_enabled
    }

    /// Token that cancels the running capture (shared with Ctrl-C)
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Compile environment stamped with the current time
    pub fn compile_env(&self) -> CompileEnv {
        CompileEnv::from_settings(&self.settings, storage::timestamp_now())
    }

    /// The plan an intent would run, without running it
    pub fn plan(&self, intent: &CaptureIntent) -> CapturePlan {
        compile(self.store.config(), self.store.profile(), intent, &self.compile_env())
    }

    pub fn handle(&mut self, intent: Intent) -> AppResult<Outcome> {
        self.handle_with(intent, &mut |_| {})
    }

    /// Handle an intent, reporting capture progress to `observer`
    pub fn handle_with(
        &mut self,
        intent: Intent,
        observer: &mut dyn FnMut(&JobProgress),
    ) -> AppResult<Outcome> {
        debug!(?intent, "Handling intent");
        match intent {
            Intent::Preview => self.handle_preview(),
            Intent::CaptureStill { binned } => self.handle_capture_still(binned, observer),
            Intent::CaptureVideo => self.handle_capture_video(CaptureIntent::Video, observer),
            Intent::StreamVideo => self.handle_capture_video(CaptureIntent::Stream, observer),
            Intent::CaptureTimelapse { binned } => self.handle_capture_timelapse(binned, observer),
            Intent::SwitchCamera => Ok(self.handle_switch_camera()),
            Intent::ToggleFocusMode => Ok(self.handle_toggle_focus()),
            Intent::Save => self.handle_save(),
            Intent::Stop => Ok(self.handle_stop()),
            Intent::Exit => {
                self.preview_enabled = false;
                self.supervisor.stop();
                Ok(Outcome::Exit)
            }
            Intent::Adjust { field, value } => Ok(self.handle_adjust(field, value)),
            Intent::Step { field, delta } => {
                let value = self.store.get(field).saturating_add(delta);
                Ok(self.handle_adjust(field, value))
            }
            Intent::FocusStep(delta) => self.handle_focus_step(delta),
            Intent::FocusSpot { x, y } => Ok(self.handle_focus_spot(x, y)),
        }
    }

    fn handle_adjust(&mut self, field: Field, value: i32) -> Outcome {
        let before = self.store.snapshot();
        let value = self.store.set(field, value);
        if *self.store.config() == before {
            return Outcome::Unchanged;
        }
        if field.affects_preview() {
            self.mark_dirty();
        }
        Outcome::Changed { field, value }
    }

    /// Apply `field=value` overrides in order
    ///
    /// Returns `(field, requested, applied)` for every value that did not
    /// survive clamping, including ones clamped back to the stored value.
    pub fn apply_overrides(&mut self, overrides: &[(Field, i32)]) -> Vec<(Field, i32, i32)> {
        let mut limited = Vec::new();
        for &(field, requested) in overrides {
            self.handle_adjust(field, requested);
            let applied = self.store.get(field);
            if applied != requested {
                debug!(%field, requested, applied, "Override limited");
                limited.push((field, requested, applied));
            }
        }
        limited
    }

    fn handle_save(&mut self) -> AppResult<Outcome> {
        let path = self.settings.parameter_file.clone();
        config::save_parameters(&path, self.store.config())?;
        Ok(Outcome::Saved(path))
    }

    fn handle_stop(&mut self) -> Outcome {
        self.cancel.cancel();
        self.preview_enabled = false;
        self.supervisor.stop();
        self.dirty = false;
        Outcome::Stopped
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
        self.last_change = Some(Instant::now());
    }

    /// Service the preview: restart it once edits have settled, and notice
    /// a preview process that died on its own
    ///
    /// Returns whether the preview was (re)started.
    pub fn tick(&mut self) -> AppResult<bool> {
        if !self.preview_enabled {
            return Ok(false);
        }

        match self.supervisor.poll_completion() {
            Ok(PollStatus::Running { .. }) => {}
            Ok(PollStatus::Completed(report)) => {
                warn!(code = ?report.exit_code, "Preview ended, restarting");
                self.dirty = true;
            }
            Ok(PollStatus::Idle) => self.dirty = true,
            Err(e) => {
                warn!(error = %e, "Preview failed");
                self.preview_enabled = false;
                return Err(e.into());
            }
        }

        let settled = self
            .last_change
            .is_none_or(|at| at.elapsed() >= self.settings.debounce());
        if self.dirty && settled {
            if let Err(e) = self.restart_preview() {
                self.preview_enabled = false;
                return Err(e);
            }
            return Ok(true);
        }
        Ok(false)
    }
}
