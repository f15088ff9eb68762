// SPDX-License-Identifier: GPL-3.0-only

//! Focus handlers
//!
//! Focus mode cycling, lens steps and spot autofocus. Arducam lenses are
//! driven through their V4L2 sub-device as soon as a step lands; the v3
//! lens position is a preview parameter and takes effect on restart.

use crate::app::PanelController;
use crate::app::intent::Outcome;
use crate::app::state::{Field, FocusToggle};
use crate::backends::camera::{CameraVariant, FocusControl};
use crate::errors::{AppError, AppResult};
use tracing::{debug, info};

impl PanelController {
    pub(crate) fn handle_toggle_focus(&mut self) -> Outcome {
        let toggle = self.store.toggle_focus_mode();
        info!(?toggle, "Focus mode changed");

        // Entering manual focus starts from wherever the motor is now
        if let FocusToggle::ManualMotor { enabled: true } = toggle
            && let Some(position) = self.focus.get_focus()
        {
            debug!(position, "Read focus motor position");
            self.store.sync_motor_focus(position);
        }

        self.mark_dirty();
        Outcome::Focus(toggle)
    }

    pub(crate) fn handle_focus_step(&mut self, delta: i32) -> AppResult<Outcome> {
        let variant = self.store.profile().variant;
        let manual_motor = self.store.config().manual_focus;
        let v3_manual = self.store.config().v3_f_mode == 1;

        if variant.is_arducam() && manual_motor {
            let position = self.store.step(Field::Focus, delta);
            self.focus.set_focus(position).map_err(AppError::Focus)?;
            debug!(position, "Moved focus motor");
            return Ok(Outcome::FocusMoved(position));
        }

        if variant == CameraVariant::V3 && v3_manual {
            let position = self.store.step(Field::V3Focus, delta);
            self.mark_dirty();
            return Ok(Outcome::FocusMoved(position));
        }

        Ok(Outcome::Unchanged)
    }

    pub(crate) fn handle_focus_spot(&mut self, x: i32, y: i32) -> Outcome {
        if !self.store.set_focus_spot(x, y, self.settings.preview_size()) {
            debug!(x, y, "Spot focus not available");
            return Outcome::Unchanged;
        }
        info!(x, y, "Spot focus set");
        self.mark_dirty();
        Outcome::FocusSpotSet
    }
}

#[cfg(test)]
mod tests {
    use crate::app::PanelController;
    use crate::app::intent::{Intent, Outcome};
    use crate::app::state::{CaptureConfig, Field, FocusToggle};
    use crate::backends::camera::{CameraDetector, CameraProfile, CameraVariant, FocusController};
    use crate::config::PanelSettings;

    fn controller(variant: CameraVariant) -> PanelController {
        PanelController::new(
            PanelSettings::default(),
            CaptureConfig::default(),
            CameraDetector::new("/nonexistent/rpicam-vid"),
            CameraProfile::for_variant(variant, 0),
            FocusController::none(),
        )
    }

    #[test]
    fn test_focus_spot_only_on_v3() {
        let mut v2 = controller(CameraVariant::V2);
        assert_eq!(v2.handle(Intent::FocusSpot { x: 10, y: 10 }).unwrap(), Outcome::Unchanged);
        assert!(!v2.is_dirty());

        let mut v3 = controller(CameraVariant::V3);
        assert_eq!(
            v3.handle(Intent::FocusSpot { x: 400, y: 300 }).unwrap(),
            Outcome::FocusSpotSet
        );
        assert!(v3.is_dirty());
        assert!(v3.store().config().focus_window.is_some());
    }

    #[test]
    fn test_v3_manual_lens_step() {
        let mut panel = controller(CameraVariant::V3);
        // auto -> manual
        let outcome = panel.handle(Intent::ToggleFocusMode).unwrap();
        assert_eq!(outcome, Outcome::Focus(FocusToggle::AutofocusMode { mode: 1 }));

        let before = panel.store().get(Field::V3Focus);
        let outcome = panel.handle(Intent::FocusStep(1)).unwrap();
        assert_eq!(outcome, Outcome::FocusMoved(before + 1));
    }

    #[test]
    fn test_arducam_step_without_device_fails() {
        let mut panel = controller(CameraVariant::Arducam16);
        let outcome = panel.handle(Intent::ToggleFocusMode).unwrap();
        assert_eq!(outcome, Outcome::Focus(FocusToggle::ManualMotor { enabled: true }));
        assert!(panel.handle(Intent::FocusStep(10)).is_err());
    }

    #[test]
    fn test_focus_step_ignored_in_auto() {
        let mut panel = controller(CameraVariant::V2);
        assert_eq!(panel.handle(Intent::FocusStep(5)).unwrap(), Outcome::Unchanged);
    }
}
