// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the process supervisor
//!
//! These run real `sh` children standing in for the capture tools.

use rpicam_panel::SupervisorError;
use rpicam_panel::pipelines::command::PlanKind;
use rpicam_panel::pipelines::{
    CancelToken, CapturePlan, Completion, JobState, PollStatus, ProcessSupervisor,
};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

fn shell(script: &str, output: Option<PathBuf>, completion: Completion) -> CapturePlan {
    CapturePlan {
        kind: PlanKind::Still,
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        output,
        completion,
        trigger_interval: None,
        capture_stdout: true,
    }
}

fn supervisor() -> ProcessSupervisor {
    ProcessSupervisor::new(Duration::from_millis(300))
}

#[test]
fn test_still_completes_with_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("240307090502.jpg");
    let script = format!(
        "echo frame > '{}'; echo ExposureTime=9998; echo AnalogueGain=2.0",
        path.display()
    );
    let mut supervisor = supervisor();
    supervisor
        .start(&shell(&script, Some(path.clone()), Completion::FileExists(path.clone())))
        .unwrap();
    assert_eq!(supervisor.state(), JobState::Running);

    let report = supervisor
        .wait_for_completion(Some(Duration::from_secs(5)), &CancelToken::new(), |_| {})
        .unwrap();
    assert!(path.exists());
    assert_eq!(report.exit_code, Some(0));
    assert!(report.stdout.contains("ExposureTime=9998"));
    assert!(supervisor.is_idle());
}

#[test]
fn test_nonzero_exit_carries_code_and_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never.jpg");
    let mut supervisor = supervisor();
    supervisor
        .start(&shell(
            "echo 'ERROR: invalid option' >&2; exit 3",
            Some(path.clone()),
            Completion::FileExists(path),
        ))
        .unwrap();

    let err = supervisor
        .wait_for_completion(Some(Duration::from_secs(5)), &CancelToken::new(), |_| {})
        .unwrap_err();
    match err {
        SupervisorError::ExitedWithError { code, stderr } => {
            assert_eq!(code, Some(3));
            assert!(stderr.contains("invalid option"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(supervisor.is_idle());
}

#[test]
fn test_clean_exit_without_output_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.jpg");
    let mut supervisor = supervisor();
    supervisor
        .start(&shell("exit 0", Some(path.clone()), Completion::FileExists(path.clone())))
        .unwrap();

    let err = supervisor
        .wait_for_completion(Some(Duration::from_secs(5)), &CancelToken::new(), |_| {})
        .unwrap_err();
    assert!(matches!(err, SupervisorError::OutputTimeout { expected, .. } if expected == path));
}

#[test]
fn test_wait_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slow.jpg");
    let mut supervisor = supervisor();
    supervisor
        .start(&shell("sleep 30", Some(path.clone()), Completion::FileExists(path)))
        .unwrap();

    let started = Instant::now();
    let err = supervisor
        .wait_for_completion(Some(Duration::from_millis(400)), &CancelToken::new(), |_| {})
        .unwrap_err();
    assert!(matches!(err, SupervisorError::OutputTimeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(supervisor.is_idle());
}

#[test]
fn test_cancel_unblocks_wait() {
    let mut supervisor = supervisor();
    supervisor
        .start(&shell("sleep 30", None, Completion::UntilStopped))
        .unwrap();

    let cancel = CancelToken::new();
    let remote = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        remote.cancel();
    });

    let started = Instant::now();
    let err = supervisor
        .wait_for_completion(None, &cancel, |_| {})
        .unwrap_err();
    canceller.join().unwrap();
    assert!(matches!(err, SupervisorError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(supervisor.is_idle());
}

#[test]
fn test_fixed_length_job_completes_once() {
    let mut supervisor = supervisor();
    supervisor
        .start(&shell(
            "sleep 30",
            None,
            Completion::After(Duration::from_millis(200)),
        ))
        .unwrap();
    assert!(supervisor.remaining().is_some());

    let deadline = Instant::now() + Duration::from_secs(5);
    let report = loop {
        match supervisor.poll_completion().unwrap() {
            PollStatus::Completed(report) => break report,
            PollStatus::Running { .. } => {}
            PollStatus::Idle => panic!("job vanished"),
        }
        assert!(Instant::now() < deadline, "job never completed");
        thread::sleep(Duration::from_millis(20));
    };
    assert!(report.elapsed >= Duration::from_millis(200));
    assert_eq!(supervisor.state(), JobState::Completed);
    assert!(matches!(supervisor.poll_completion().unwrap(), PollStatus::Idle));
    assert!(supervisor.is_idle());
}

#[test]
fn test_stop_kills_the_whole_group() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("survivor");
    // The helper would touch the marker if it outlived the stop
    let script = format!("(sleep 1; touch '{}') & sleep 30", marker.display());
    let mut supervisor = supervisor();
    supervisor
        .start(&shell(&script, None, Completion::UntilStopped))
        .unwrap();
    thread::sleep(Duration::from_millis(100));

    supervisor.stop();
    assert!(supervisor.is_idle());
    thread::sleep(Duration::from_millis(1500));
    assert!(!marker.exists());
}

#[test]
fn test_trigger_requires_running_job() {
    let mut supervisor = supervisor();
    assert!(matches!(
        supervisor.trigger(),
        Err(SupervisorError::SignalFailed(_))
    ));

    supervisor
        .start(&shell(
            "trap 'echo got' USR1; while true; do sleep 0.05; done",
            None,
            Completion::UntilStopped,
        ))
        .unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(supervisor.trigger().is_ok());
    supervisor.stop();
}
