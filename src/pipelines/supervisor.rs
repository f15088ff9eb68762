// SPDX-License-Identifier: GPL-3.0-only

//! Capture process supervision
//!
//! Owns the single external capture process. The process is spawned in its
//! own process group so the tool and anything it forks are signalled as one
//! unit. stderr (and stdout for stills) is drained on reader threads; the
//! last stderr lines are kept for error reports.
//!
//! ```text
//! Idle -> Starting -> Running -> Stopping -> Idle
//!                        \-> Completed -> Idle
//! ```

use crate::constants::timing;
use crate::errors::SupervisorError;
use crate::pipelines::command::{CapturePlan, Completion};
use crate::storage;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Number of stderr lines kept for error reports
const STDERR_TAIL_LINES: usize = 20;

/// Interval between exit checks while stopping
const STOP_POLL: Duration = Duration::from_millis(20);

/// Supervisor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Starting,
    Running,
    Stopping,
    Completed,
}

/// Cancellation flag shared with Ctrl-C handlers and UI loops
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag before the next job
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What a finished job left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub program: String,
    /// Exit code, `None` if the job was still running or died from a signal
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    pub output: Option<PathBuf>,
    /// Captured stdout (only when the plan asked for it)
    pub stdout: String,
    pub stderr_tail: String,
}

/// Result of a completion poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// Nothing is running
    Idle,
    /// Still running
    Running { elapsed: Duration },
    /// The job met its completion condition and has been reaped
    Completed(JobReport),
}

/// The live process and what it is expected to produce
pub struct SupervisedProcess {
    child: Child,
    pgid: i32,
    program: String,
    started: Instant,
    expected_duration: Option<Duration>,
    expected_output: Option<PathBuf>,
    completion: Completion,
    /// When the expected file first appeared
    output_seen: Option<Instant>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    stdout: Arc<Mutex<String>>,
    readers: Vec<JoinHandle<()>>,
}

impl SupervisedProcess {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn process_group(&self) -> i32 {
        self.pgid
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn expected_duration(&self) -> Option<Duration> {
        self.expected_duration
    }

    pub fn expected_output(&self) -> Option<&PathBuf> {
        self.expected_output.as_ref()
    }

    fn stderr_text(&self) -> String {
        self.stderr_tail
            .lock()
            .map(|tail| tail.iter().cloned().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default()
    }

    fn stdout_text(&self) -> String {
        self.stdout.lock().map(|out| out.clone()).unwrap_or_default()
    }

    /// Whether the completion condition holds right now
    fn condition_met(&self) -> bool {
        match &self.completion {
            Completion::UntilStopped => false,
            Completion::After(duration) => self.started.elapsed() >= *duration,
            Completion::FileExists(path) => path.exists(),
            Completion::FileCount { dir, prefix, count } => {
                storage::count_with_prefix(dir, prefix) >= *count
            }
        }
    }

    fn signal_group(&self, signal: i32) -> Result<(), String> {
        // SAFETY: killpg only sends a signal; the group id belongs to our child
        let result = unsafe { libc::killpg(self.pgid, signal) };
        if result == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            // Group already gone
            Ok(())
        } else {
            Err(err.to_string())
        }
    }

    /// Terminate the group, escalating after `grace`, and reap the child
    fn terminate(&mut self, grace: Duration) -> Option<ExitStatus> {
        if let Ok(Some(status)) = self.child.try_wait() {
            // The leader is gone but helpers it forked may not be
            let _ = self.signal_group(libc::SIGTERM);
            return Some(status);
        }

        if let Err(e) = self.signal_group(libc::SIGTERM) {
            warn!(pgid = self.pgid, error = %e, "Failed to send SIGTERM");
        }

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            match self.child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) => thread::sleep(STOP_POLL),
                Err(e) => {
                    warn!(error = %e, "Failed to poll capture process");
                    break;
                }
            }
        }

        warn!(pgid = self.pgid, program = %self.program, "Capture process ignored SIGTERM, killing");
        if let Err(e) = self.signal_group(libc::SIGKILL) {
            warn!(pgid = self.pgid, error = %e, "Failed to send SIGKILL");
        }
        self.child.wait().ok()
    }

    fn join_readers(&mut self) {
        for handle in self.readers.drain(..) {
            if handle.join().is_err() {
                warn!("Output reader thread panicked");
            }
        }
    }

    fn report(&self, status: Option<ExitStatus>) -> JobReport {
        JobReport {
            program: self.program.clone(),
            exit_code: status.and_then(|s| s.code()),
            elapsed: self.started.elapsed(),
            output: self.expected_output.clone(),
            stdout: self.stdout_text(),
            stderr_tail: self.stderr_text(),
        }
    }
}

/// Owner of the single capture job
pub struct ProcessSupervisor {
    state: JobState,
    job: Option<SupervisedProcess>,
    grace: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(Duration::from_millis(timing::DEFAULT_STOP_GRACE_MS))
    }
}

impl ProcessSupervisor {
    /// Supervisor that gives stopped jobs `grace` before killing them
    pub fn new(grace: Duration) -> Self {
        Self {
            state: JobState::Idle,
            job: None,
            grace,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == JobState::Idle
    }

    pub fn job(&self) -> Option<&SupervisedProcess> {
        self.job.as_ref()
    }

    /// Time left on a fixed-length job
    pub fn remaining(&self) -> Option<Duration> {
        let job = self.job.as_ref()?;
        job.expected_duration
            .map(|duration| duration.saturating_sub(job.elapsed()))
    }

    /// Spawn the plan's process in a new process group
    pub fn start(&mut self, plan: &CapturePlan) -> Result<(), SupervisorError> {
        if self.state != JobState::Idle {
            return Err(SupervisorError::AlreadyRunning);
        }
        self.state = JobState::Starting;

        let mut command = Command::new(&plan.program);
        command
            .args(&plan.args)
            .process_group(0)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .stdout(if plan.capture_stdout {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.state = JobState::Idle;
                warn!(program = %plan.program, error = %e, "Failed to spawn capture tool");
                return Err(SupervisorError::SpawnFailed {
                    program: plan.program.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let stdout = Arc::new(Mutex::new(String::new()));
        let mut readers = Vec::new();

        if let Some(pipe) = child.stderr.take() {
            let tail = Arc::clone(&stderr_tail);
            readers.push(thread::spawn(move || {
                for line in BufReader::new(pipe).lines().map_while(Result::ok) {
                    debug!(target: "rpicam", "{}", line);
                    if let Ok(mut tail) = tail.lock() {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
            }));
        }
        if let Some(mut pipe) = child.stdout.take() {
            let sink = Arc::clone(&stdout);
            readers.push(thread::spawn(move || {
                let mut text = String::new();
                if pipe.read_to_string(&mut text).is_ok()
                    && let Ok(mut out) = sink.lock()
                {
                    out.push_str(&text);
                }
            }));
        }

        let pid = child.id();
        info!(
            pid,
            program = %plan.program,
            command = %plan.command_line(),
            "Started capture process"
        );

        self.job = Some(SupervisedProcess {
            child,
            pgid: pid as i32,
            program: plan.program.clone(),
            started: Instant::now(),
            expected_duration: plan.expected_duration(),
            expected_output: plan.output.clone(),
            completion: plan.completion.clone(),
            output_seen: None,
            stderr_tail,
            stdout,
            readers,
        });
        self.state = JobState::Running;
        Ok(())
    }

    /// Stop the job; a no-op when idle
    pub fn stop(&mut self) {
        let Some(mut job) = self.job.take() else {
            self.state = JobState::Idle;
            return;
        };
        self.state = JobState::Stopping;
        let status = job.terminate(self.grace);
        job.join_readers();
        info!(
            program = %job.program,
            code = ?status.and_then(|s| s.code()),
            elapsed_ms = job.elapsed().as_millis() as u64,
            "Stopped capture process"
        );
        self.state = JobState::Idle;
    }

    /// Send SIGUSR1 to the running tool (signal-mode stills)
    pub fn trigger(&mut self) -> Result<(), SupervisorError> {
        let job = match (&self.state, self.job.as_ref()) {
            (JobState::Running, Some(job)) => job,
            _ => return Err(SupervisorError::SignalFailed("no capture job running".into())),
        };
        // SAFETY: plain signal delivery to our own child
        let result = unsafe { libc::kill(job.pid() as i32, libc::SIGUSR1) };
        if result != 0 {
            let err = std::io::Error::last_os_error();
            return Err(SupervisorError::SignalFailed(err.to_string()));
        }
        debug!(pid = job.pid(), "Triggered capture");
        Ok(())
    }

    /// Check whether the running job has finished
    ///
    /// A job whose completion condition holds is stopped, reaped and
    /// reported once as `Completed`; the next poll moves back to `Idle`. A
    /// tool that exits before its condition holds is an error carrying the
    /// exit code and stderr.
    pub fn poll_completion(&mut self) -> Result<PollStatus, SupervisorError> {
        match self.state {
            JobState::Completed => {
                self.state = JobState::Idle;
                return Ok(PollStatus::Idle);
            }
            JobState::Running => {}
            _ => return Ok(PollStatus::Idle),
        }
        let Some(job) = self.job.as_mut() else {
            self.state = JobState::Idle;
            return Ok(PollStatus::Idle);
        };

        let exited = match job.child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Failed to poll capture process");
                None
            }
        };

        // Stills print metadata after writing; wait for exit or the grace period
        if job.condition_met() {
            let settled = match job.completion {
                Completion::FileExists(_) => {
                    exited.is_some()
                        || job.output_seen.get_or_insert_with(Instant::now).elapsed() >= self.grace
                }
                _ => true,
            };
            if settled {
                return Ok(PollStatus::Completed(self.finish(exited)));
            }
        }

        match exited {
            None => Ok(PollStatus::Running {
                elapsed: job.elapsed(),
            }),
            Some(status) => {
                // Output may land just after exit
                thread::sleep(timing::POLL_INTERVAL);
                if job.condition_met() || Self::ends_on_exit(&job.completion, status) {
                    return Ok(PollStatus::Completed(self.finish(Some(status))));
                }
                let report = self.finish(Some(status));
                self.state = JobState::Idle;
                Err(Self::failure(report, status))
            }
        }
    }

    /// Unbounded and fixed-length jobs are done when the tool ends cleanly
    fn ends_on_exit(completion: &Completion, status: ExitStatus) -> bool {
        status.success() && matches!(completion, Completion::UntilStopped | Completion::After(_))
    }

    fn failure(report: JobReport, status: ExitStatus) -> SupervisorError {
        match (&report.output, status.success()) {
            (Some(expected), true) => SupervisorError::OutputTimeout {
                expected: expected.clone(),
                waited: report.elapsed,
            },
            _ => SupervisorError::ExitedWithError {
                code: status.code(),
                stderr: report.stderr_tail,
            },
        }
    }

    /// Reap the job and record it as completed
    fn finish(&mut self, exited: Option<ExitStatus>) -> JobReport {
        let Some(mut job) = self.job.take() else {
            return JobReport::default();
        };
        let status = match exited {
            Some(status) => {
                let _ = job.signal_group(libc::SIGTERM);
                Some(status)
            }
            None => job.terminate(self.grace),
        };
        job.join_readers();
        let report = job.report(status);
        info!(
            program = %report.program,
            code = ?report.exit_code,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Capture job completed"
        );
        self.state = JobState::Completed;
        report
    }

    /// Poll until the job completes, fails, times out or is cancelled
    ///
    /// `observer` is called with the elapsed time on every poll.
    pub fn wait_for_completion(
        &mut self,
        timeout: Option<Duration>,
        cancel: &CancelToken,
        mut observer: impl FnMut(Duration),
    ) -> Result<JobReport, SupervisorError> {
        let started = Instant::now();
        loop {
            if cancel.is_cancelled() {
                info!("Capture cancelled");
                self.stop();
                return Err(SupervisorError::Cancelled);
            }

            match self.poll_completion()? {
                PollStatus::Completed(report) => {
                    self.state = JobState::Idle;
                    return Ok(report);
                }
                PollStatus::Idle => return Err(SupervisorError::Cancelled),
                PollStatus::Running { elapsed } => observer(elapsed),
            }

            if let Some(limit) = timeout
                && started.elapsed() >= limit
            {
                let expected = self
                    .job
                    .as_ref()
                    .and_then(|job| job.expected_output.clone())
                    .unwrap_or_default();
                warn!(expected = %expected.display(), "Timed out waiting for capture output");
                self.stop();
                return Err(SupervisorError::OutputTimeout {
                    expected,
                    waited: started.elapsed(),
                });
            }

            thread::sleep(timing::POLL_INTERVAL);
        }
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        if self.job.is_some() {
            debug!("Supervisor dropped, stopping capture process");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::command::PlanKind;

    fn plan(program: &str, args: &[&str], completion: Completion) -> CapturePlan {
        CapturePlan {
            kind: PlanKind::Video,
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            output: None,
            completion,
            trigger_interval: None,
            capture_stdout: false,
        }
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut supervisor = ProcessSupervisor::default();
        supervisor.stop();
        supervisor.stop();
        assert_eq!(supervisor.state(), JobState::Idle);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut supervisor = ProcessSupervisor::new(Duration::from_millis(200));
        let job = plan("sleep", &["5"], Completion::UntilStopped);
        supervisor.start(&job).unwrap();
        assert!(matches!(
            supervisor.start(&job),
            Err(SupervisorError::AlreadyRunning)
        ));
        supervisor.stop();
        assert!(supervisor.is_idle());
    }

    #[test]
    fn test_spawn_failure() {
        let mut supervisor = ProcessSupervisor::default();
        let job = plan("/nonexistent/rpicam-vid", &[], Completion::UntilStopped);
        let err = supervisor.start(&job).unwrap_err();
        assert!(matches!(err, SupervisorError::SpawnFailed { .. }));
        assert!(supervisor.is_idle());
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!shared.is_cancelled());
    }
}
