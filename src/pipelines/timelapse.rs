// SPDX-License-Identifier: GPL-3.0-only

//! Timelapse runner
//!
//! Drives the three timelapse modes on top of the supervisor:
//! - triggered: one still process in signal mode, signalled every interval
//! - per shot: one still process per shot, spaced by the interval
//! - segmented: one video process writing a frame file per segment

use crate::app::state::CaptureConfig;
use crate::backends::camera::CameraProfile;
use crate::constants::timing;
use crate::errors::SupervisorError;
use crate::pipelines::command::{CaptureIntent, CompileEnv, TimelapseMode, compile};
use crate::pipelines::supervisor::{CancelToken, PollStatus, ProcessSupervisor};
use crate::storage;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Progress handed to the observer after every shot or poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelapseProgress {
    pub mode: TimelapseMode,
    pub shots_taken: u32,
    /// `None` for segmented runs, which write as many frames as they can
    pub shots_total: Option<u32>,
    pub elapsed: Duration,
    pub remaining: Option<Duration>,
}

/// Outcome of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelapseReport {
    pub mode: TimelapseMode,
    /// Prefix shared by every frame of the run
    pub timestamp: String,
    /// Frames found on disk afterwards
    pub frames: usize,
    pub elapsed: Duration,
}

pub struct TimelapseRunner<'a> {
    supervisor: &'a mut ProcessSupervisor,
    cancel: &'a CancelToken,
    /// Allowance per frame on top of the exposure time
    shot_timeout: Duration,
}

impl<'a> TimelapseRunner<'a> {
    pub fn new(
        supervisor: &'a mut ProcessSupervisor,
        cancel: &'a CancelToken,
        shot_timeout: Duration,
    ) -> Self {
        Self {
            supervisor,
            cancel,
            shot_timeout,
        }
    }

    /// Run a complete timelapse; any running job is stopped first
    pub fn run(
        &mut self,
        config: &CaptureConfig,
        profile: &CameraProfile,
        env: &CompileEnv,
        binned: bool,
        mut observer: impl FnMut(&TimelapseProgress),
    ) -> Result<TimelapseReport, SupervisorError> {
        let mode = TimelapseMode::for_config(config);
        info!(
            ?mode,
            interval = config.tinterval,
            shots = config.tshots,
            duration = config.tduration,
            "Starting timelapse"
        );
        self.supervisor.stop();
        self.check_cancel()?;
        if let Err(e) = storage::ensure_dir(&env.pictures_dir) {
            return Err(SupervisorError::SpawnFailed {
                program: "timelapse".to_string(),
                reason: e.to_string(),
            });
        }

        let started = Instant::now();
        let result = match mode {
            TimelapseMode::Triggered => self.run_triggered(config, profile, env, binned, &mut observer),
            TimelapseMode::PerShot => self.run_per_shot(config, profile, env, binned, &mut observer),
            TimelapseMode::Segmented => self.run_segmented(config, profile, env, &mut observer),
        };
        self.supervisor.stop();
        result?;

        let frames = storage::count_with_prefix(&env.pictures_dir, &env.timestamp);
        info!(frames, elapsed_s = started.elapsed().as_secs(), "Timelapse finished");
        Ok(TimelapseReport {
            mode,
            timestamp: env.timestamp.clone(),
            frames,
            elapsed: started.elapsed(),
        })
    }

    fn frame_timeout(&self, config: &CaptureConfig) -> Duration {
        self.shot_timeout + Duration::from_micros(config.shutter_micros())
    }

    fn interval(config: &CaptureConfig) -> Duration {
        Duration::from_secs(config.tinterval.max(1) as u64)
    }

    fn check_cancel(&mut self) -> Result<(), SupervisorError> {
        if self.cancel.is_cancelled() {
            info!("Timelapse cancelled");
            self.supervisor.stop();
            return Err(SupervisorError::Cancelled);
        }
        Ok(())
    }

    /// Sleep until `deadline`, staying responsive to cancellation
    fn sleep_until(&mut self, deadline: Instant) -> Result<(), SupervisorError> {
        loop {
            self.check_cancel()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(timing::POLL_INTERVAL.min(deadline - now));
        }
    }

    fn run_triggered(
        &mut self,
        config: &CaptureConfig,
        profile: &CameraProfile,
        env: &CompileEnv,
        binned: bool,
        observer: &mut impl FnMut(&TimelapseProgress),
    ) -> Result<(), SupervisorError> {
        let plan = compile(config, profile, &CaptureIntent::Timelapse { binned, shot: 0 }, env);
        let interval = plan.trigger_interval.unwrap_or_else(|| Self::interval(config));
        let total = config.tshots.max(1) as u32;
        let frame_timeout = self.frame_timeout(config);
        let dir = env.pictures_dir.clone();

        self.supervisor.start(&plan)?;
        let started = Instant::now();
        let mut taken = 0u32;
        let mut frames = storage::count_with_prefix(&dir, &env.timestamp);
        let mut last_trigger = Instant::now();

        while taken < total {
            self.sleep_until(last_trigger + interval)?;
            self.supervisor.trigger()?;
            last_trigger = Instant::now();
            debug!(shot = taken + 1, "Triggered timelapse frame");

            loop {
                self.check_cancel()?;
                let now = storage::count_with_prefix(&dir, &env.timestamp);
                if now > frames {
                    taken += (now - frames) as u32;
                    frames = now;
                    break;
                }
                if let PollStatus::Completed(_) = self.supervisor.poll_completion()? {
                    return Ok(());
                }
                if last_trigger.elapsed() >= frame_timeout {
                    return Err(SupervisorError::OutputTimeout {
                        expected: plan.output.clone().unwrap_or_default(),
                        waited: last_trigger.elapsed(),
                    });
                }
                thread::sleep(timing::POLL_INTERVAL);
            }

            observer(&TimelapseProgress {
                mode: TimelapseMode::Triggered,
                shots_taken: taken.min(total),
                shots_total: Some(total),
                elapsed: started.elapsed(),
                remaining: Some(interval * total.saturating_sub(taken)),
            });
        }
        Ok(())
    }

    fn run_per_shot(
        &mut self,
        config: &CaptureConfig,
        profile: &CameraProfile,
        env: &CompileEnv,
        binned: bool,
        observer: &mut impl FnMut(&TimelapseProgress),
    ) -> Result<(), SupervisorError> {
        let interval = Self::interval(config);
        let total = config.tshots.max(1) as u32;
        let frame_timeout = self.frame_timeout(config);
        let started = Instant::now();
        let mut last_start = Instant::now();

        for shot in 0..total {
            self.sleep_until(last_start + interval)?;
            last_start = Instant::now();

            let plan = compile(config, profile, &CaptureIntent::Timelapse { binned, shot }, env);
            self.supervisor.stop();
            self.supervisor.start(&plan)?;
            self.supervisor
                .wait_for_completion(Some(frame_timeout), self.cancel, |_| {})?;

            let taken = shot + 1;
            debug!(shot = taken, "Timelapse frame written");
            observer(&TimelapseProgress {
                mode: TimelapseMode::PerShot,
                shots_taken: taken,
                shots_total: Some(total),
                elapsed: started.elapsed(),
                remaining: Some(interval * (total - taken)),
            });
        }
        Ok(())
    }

    fn run_segmented(
        &mut self,
        config: &CaptureConfig,
        profile: &CameraProfile,
        env: &CompileEnv,
        observer: &mut impl FnMut(&TimelapseProgress),
    ) -> Result<(), SupervisorError> {
        let plan = compile(config, profile, &CaptureIntent::Timelapse { binned: false, shot: 0 }, env);
        let expected = plan.expected_duration().unwrap_or_default();
        let dir = env.pictures_dir.clone();
        let prefix = env.timestamp.clone();

        self.supervisor.start(&plan)?;
        self.supervisor.wait_for_completion(
            Some(expected + self.shot_timeout),
            self.cancel,
            |elapsed| {
                observer(&TimelapseProgress {
                    mode: TimelapseMode::Segmented,
                    shots_taken: storage::count_with_prefix(&dir, &prefix) as u32,
                    shots_total: None,
                    elapsed,
                    remaining: Some(expected.saturating_sub(elapsed)),
                });
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn env(dir: PathBuf) -> CompileEnv {
        CompileEnv {
            preview_size: (800, 600),
            pictures_dir: dir.clone(),
            videos_dir: dir.clone(),
            preview_dir: dir,
            stream_port: 5000,
            arducam_autofocus: false,
            tool_dir: None,
            timestamp: "240307090502".to_string(),
        }
    }

    #[test]
    fn test_cancelled_before_first_shot() {
        let dir = tempfile::tempdir().unwrap();
        let mut supervisor = ProcessSupervisor::new(Duration::from_millis(100));
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut config = CaptureConfig::default();
        config.tinterval = 5;
        let profile = CameraProfile::default();
        let mut runner = TimelapseRunner::new(&mut supervisor, &cancel, Duration::from_secs(1));
        let err = runner
            .run(&config, &profile, &env(dir.path().to_path_buf()), false, |_| {})
            .unwrap_err();
        assert!(matches!(err, SupervisorError::Cancelled));
        assert!(supervisor.is_idle());
    }
}
