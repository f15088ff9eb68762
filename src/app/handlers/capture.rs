// SPDX-License-Identifier: GPL-3.0-only

//! Capture handlers
//!
//! Stills, videos, streams and timelapses. Each one stops the preview, runs
//! its job to completion (or cancellation) and leaves the preview to be
//! restarted by the next tick.

use crate::app::PanelController;
use crate::app::intent::{JobProgress, Outcome};
use crate::errors::{AppResult, SupervisorError};
use crate::pipelines::{CaptureIntent, StillMetadata, TimelapseRunner, compile};
use crate::storage;
use std::time::Duration;
use tracing::{info, warn};

impl PanelController {
    pub(crate) fn handle_capture_still(
        &mut self,
        binned: bool,
        observer: &mut dyn FnMut(&JobProgress),
    ) -> AppResult<Outcome> {
        self.cancel.reset();
        self.supervisor.stop();

        let env = self.compile_env();
        storage::ensure_dir(&env.pictures_dir)?;
        let plan = compile(
            self.store.config(),
            self.store.profile(),
            &CaptureIntent::Still { binned },
            &env,
        );
        let path = plan.output.clone().unwrap_or_default();
        info!(path = %path.display(), binned, "Capturing still");

        // Long exposures need their exposure time on top of the usual allowance
        let timeout = self.settings.still_timeout()
            + Duration::from_micros(self.store.config().shutter_micros());

        let result = match self.supervisor.start(&plan) {
            Ok(()) => self
                .supervisor
                .wait_for_completion(Some(timeout), &self.cancel, |elapsed| {
                    observer(&JobProgress {
                        elapsed,
                        remaining: Some(timeout.saturating_sub(elapsed)),
                        ..Default::default()
                    })
                }),
            Err(e) => Err(e),
        };
        self.resume_preview();

        let report = result?;
        let metadata = StillMetadata::parse(&report.stdout);
        if metadata.is_empty() {
            warn!("Still capture printed no metadata");
        } else {
            info!(%metadata, "Still captured");
        }
        Ok(Outcome::Still { path, metadata })
    }

    /// Record to a file or stream to the network
    ///
    /// A zero length recording runs until stopped, and stopping it is a
    /// normal finish rather than a cancellation.
    pub(crate) fn handle_capture_video(
        &mut self,
        intent: CaptureIntent,
        observer: &mut dyn FnMut(&JobProgress),
    ) -> AppResult<Outcome> {
        self.cancel.reset();
        self.supervisor.stop();

        let env = self.compile_env();
        if matches!(intent, CaptureIntent::Video) {
            storage::ensure_dir(&env.videos_dir)?;
        }
        let plan = compile(self.store.config(), self.store.profile(), &intent, &env);
        let expected = plan.expected_duration();
        let timeout = expected.map(|d| d + self.settings.still_timeout());
        info!(
            command = %plan.command_line(),
            length_s = expected.map(|d| d.as_secs()),
            "Starting recording"
        );

        let mut last_elapsed = Duration::ZERO;
        let result = match self.supervisor.start(&plan) {
            Ok(()) => self
                .supervisor
                .wait_for_completion(timeout, &self.cancel, |elapsed| {
                    last_elapsed = elapsed;
                    observer(&JobProgress {
                        elapsed,
                        remaining: expected.map(|d| d.saturating_sub(elapsed)),
                        ..Default::default()
                    })
                }),
            Err(e) => Err(e),
        };
        self.resume_preview();

        let elapsed = match result {
            Ok(report) => report.elapsed,
            Err(SupervisorError::Cancelled) if !plan.is_bounded() => last_elapsed,
            Err(e) => return Err(e.into()),
        };
        info!(elapsed_s = elapsed.as_secs(), "Recording finished");
        Ok(Outcome::Video {
            path: plan.output,
            elapsed,
        })
    }

    pub(crate) fn handle_capture_timelapse(
        &mut self,
        binned: bool,
        observer: &mut dyn FnMut(&JobProgress),
    ) -> AppResult<Outcome> {
        self.cancel.reset();
        let env = self.compile_env();

        let mut runner = TimelapseRunner::new(
            &mut self.supervisor,
            &self.cancel,
            self.settings.still_timeout(),
        );
        let result = runner.run(
            self.store.config(),
            self.store.profile(),
            &env,
            binned,
            |progress| {
                observer(&JobProgress {
                    elapsed: progress.elapsed,
                    remaining: progress.remaining,
                    shots_taken: Some(progress.shots_taken),
                    shots_total: progress.shots_total,
                })
            },
        );
        self.resume_preview();

        Ok(Outcome::Timelapse(result?))
    }

    /// Let the next tick bring the preview back without waiting out the debounce
    fn resume_preview(&mut self) {
        if self.preview_enabled {
            self.dirty = true;
            self.last_change = None;
        }
    }
}
