// SPDX-License-Identifier: GPL-3.0-only

//! Capture command compiler
//!
//! Turns a parameter snapshot, the camera profile and a capture intent into
//! the exact `rpicam-*` invocation. Compilation is pure: the timestamp used
//! in output names comes in through [`CompileEnv`], so the same inputs always
//! give the same plan.
//!
//! The flags themselves are produced by ordered rule tables in [`rules`].

pub mod format;
pub mod rules;

use crate::app::state::CaptureConfig;
use crate::backends::camera::CameraProfile;
use crate::config::PanelSettings;
use crate::constants::{options, preview};
use crate::storage;
use std::path::PathBuf;
use std::time::Duration;

pub use rules::{CompileContext, Rule};

/// What the user asked the camera to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureIntent {
    /// Live preview frames into the scratch directory
    Preview,
    /// Single still; `binned` selects the 2x2 mode of the 64MP sensor
    Still { binned: bool },
    Video,
    /// Network stream on the configured port
    Stream,
    /// One process of a timelapse; `shot` numbers per-shot captures
    Timelapse { binned: bool, shot: u32 },
}

/// How a timelapse is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelapseMode {
    /// One long-lived still process, triggered by signal every interval
    Triggered,
    /// One still process spawned per shot (manual exposure)
    PerShot,
    /// One video process writing a frame file per segment
    Segmented,
}

impl TimelapseMode {
    pub fn for_config(config: &CaptureConfig) -> Self {
        if config.tinterval == 0 {
            TimelapseMode::Segmented
        } else if config.is_manual_exposure() {
            TimelapseMode::PerShot
        } else {
            TimelapseMode::Triggered
        }
    }
}

/// Rule table selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Preview,
    Still,
    Video,
    Stream,
    TimelapseTriggered,
    TimelapseShot,
    TimelapseSegment,
}

impl PlanKind {
    pub fn for_intent(intent: &CaptureIntent, config: &CaptureConfig) -> Self {
        match intent {
            CaptureIntent::Preview => PlanKind::Preview,
            CaptureIntent::Still { .. } => PlanKind::Still,
            CaptureIntent::Video => PlanKind::Video,
            CaptureIntent::Stream => PlanKind::Stream,
            CaptureIntent::Timelapse { .. } => match TimelapseMode::for_config(config) {
                TimelapseMode::Triggered => PlanKind::TimelapseTriggered,
                TimelapseMode::PerShot => PlanKind::TimelapseShot,
                TimelapseMode::Segmented => PlanKind::TimelapseSegment,
            },
        }
    }
}

/// When a running plan counts as finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Runs until stopped
    UntilStopped,
    /// Finished once the wall-clock duration has passed
    After(Duration),
    /// Finished once the file exists
    FileExists(PathBuf),
    /// Finished once `count` files named `<prefix>*` exist in `dir`
    FileCount {
        dir: PathBuf,
        prefix: String,
        count: usize,
    },
}

/// Environment the compiler needs beyond the parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileEnv {
    pub preview_size: (u32, u32),
    pub pictures_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub preview_dir: PathBuf,
    pub stream_port: u16,
    pub arducam_autofocus: bool,
    /// Where the rpicam tools live, `None` to search `PATH`
    pub tool_dir: Option<PathBuf>,
    /// `YYMMDDHHMMSS` stamp for output names
    pub timestamp: String,
}

impl CompileEnv {
    pub fn from_settings(settings: &PanelSettings, timestamp: impl Into<String>) -> Self {
        Self {
            preview_size: settings.preview_size(),
            pictures_dir: settings.pictures_dir.clone(),
            videos_dir: settings.videos_dir.clone(),
            preview_dir: settings.preview_dir.clone(),
            stream_port: settings.stream_port,
            arducam_autofocus: settings.arducam_autofocus,
            tool_dir: settings.tool_dir.clone(),
            timestamp: timestamp.into(),
        }
    }
}

/// A fully expanded command ready for the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePlan {
    pub kind: PlanKind,
    pub program: String,
    pub args: Vec<String>,
    /// Output file or `%d` pattern, `None` for network streams
    pub output: Option<PathBuf>,
    pub completion: Completion,
    /// Signal the process this often (signal-triggered timelapse)
    pub trigger_interval: Option<Duration>,
    /// Keep stdout (still metadata)
    pub capture_stdout: bool,
}

impl CapturePlan {
    /// The invocation as a single shell-style line
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    pub fn expected_duration(&self) -> Option<Duration> {
        match self.completion {
            Completion::After(duration) => Some(duration),
            _ => None,
        }
    }

    pub fn is_bounded(&self) -> bool {
        !matches!(self.completion, Completion::UntilStopped)
    }

    /// Value following `flag`, if present
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|index| self.args.get(index + 1))
            .map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|arg| arg == flag)
    }
}

/// Compile a capture intent into a plan
pub fn compile(
    config: &CaptureConfig,
    profile: &CameraProfile,
    intent: &CaptureIntent,
    env: &CompileEnv,
) -> CapturePlan {
    let kind = PlanKind::for_intent(intent, config);
    let (output, completion) = output_for(kind, config, intent, env);
    let ctx = CompileContext::new(config, profile, *intent, env, output.clone());

    CapturePlan {
        kind,
        program: tool_path(env, program_for(kind, config)),
        args: rules::evaluate(rules::table(kind), &ctx),
        output,
        completion,
        trigger_interval: (kind == PlanKind::TimelapseTriggered)
            .then(|| Duration::from_secs(config.tinterval.max(1) as u64)),
        capture_stdout: kind == PlanKind::Still,
    }
}

fn program_for(kind: PlanKind, config: &CaptureConfig) -> &'static str {
    let raw_video = options::CODECS[config.codec.clamp(0, 3) as usize] == "raw";
    match kind {
        PlanKind::Still | PlanKind::TimelapseTriggered | PlanKind::TimelapseShot => "rpicam-still",
        PlanKind::Video | PlanKind::TimelapseSegment if raw_video => "rpicam-raw",
        _ => "rpicam-vid",
    }
}

fn tool_path(env: &CompileEnv, program: &str) -> String {
    match &env.tool_dir {
        Some(dir) => dir.join(program).display().to_string(),
        None => program.to_string(),
    }
}

fn output_for(
    kind: PlanKind,
    config: &CaptureConfig,
    intent: &CaptureIntent,
    env: &CompileEnv,
) -> (Option<PathBuf>, Completion) {
    let still_ext = options::STILL_EXTENSIONS[config.extn.clamp(0, 5) as usize];
    let video_ext = options::CODEC_EXTENSIONS[config.codec.clamp(0, 3) as usize];
    let ts = env.timestamp.as_str();
    let bounded = |secs: i32| {
        if secs > 0 {
            Completion::After(Duration::from_secs(secs as u64))
        } else {
            Completion::UntilStopped
        }
    };

    match kind {
        PlanKind::Preview => (
            Some(env.preview_dir.join(preview::FRAME_PATTERN)),
            Completion::UntilStopped,
        ),
        PlanKind::Still => {
            let path = storage::capture_path(&env.pictures_dir, ts, still_ext);
            (Some(path.clone()), Completion::FileExists(path))
        }
        PlanKind::Video => (
            Some(storage::capture_path(&env.videos_dir, ts, video_ext)),
            bounded(config.vlen),
        ),
        PlanKind::Stream => (None, bounded(config.vlen)),
        PlanKind::TimelapseTriggered => (
            Some(storage::sequence_pattern(&env.pictures_dir, ts, still_ext)),
            Completion::FileCount {
                dir: env.pictures_dir.clone(),
                prefix: ts.to_string(),
                count: config.tshots.max(1) as usize,
            },
        ),
        PlanKind::TimelapseShot => {
            let shot = match intent {
                CaptureIntent::Timelapse { shot, .. } => *shot,
                _ => 0,
            };
            let path = storage::shot_path(&env.pictures_dir, ts, shot, still_ext);
            (Some(path.clone()), Completion::FileExists(path))
        }
        PlanKind::TimelapseSegment => {
            let ext = if video_ext == "raw" { video_ext } else { still_ext };
            let secs = config.tduration.max(1) as u64 + 1;
            (
                Some(storage::sequence_pattern(&env.pictures_dir, ts, ext)),
                Completion::After(Duration::from_secs(secs)),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::CameraVariant;

    fn env() -> CompileEnv {
        CompileEnv {
            preview_size: (800, 600),
            pictures_dir: PathBuf::from("/home/pi/Pictures"),
            videos_dir: PathBuf::from("/home/pi/Videos"),
            preview_dir: PathBuf::from("/run/shm"),
            stream_port: 5000,
            arducam_autofocus: false,
            tool_dir: None,
            timestamp: "240307090502".to_string(),
        }
    }

    #[test]
    fn test_timelapse_mode_selection() {
        let mut config = CaptureConfig::default();
        assert_eq!(TimelapseMode::for_config(&config), TimelapseMode::Triggered);
        config.mode = 0;
        assert_eq!(TimelapseMode::for_config(&config), TimelapseMode::PerShot);
        config.tinterval = 0;
        assert_eq!(TimelapseMode::for_config(&config), TimelapseMode::Segmented);
    }

    #[test]
    fn test_program_for_raw_codec() {
        let mut config = CaptureConfig::default();
        let profile = CameraProfile::for_variant(CameraVariant::Hq, 0);
        config.codec = 3;
        let plan = compile(&config, &profile, &CaptureIntent::Video, &env());
        assert_eq!(plan.program, "rpicam-raw");
        assert_eq!(plan.output, Some(PathBuf::from("/home/pi/Videos/240307090502.raw")));
    }

    #[test]
    fn test_tool_dir_prefixes_program() {
        let config = CaptureConfig::default();
        let profile = CameraProfile::default();
        let mut env = env();
        env.tool_dir = Some(PathBuf::from("/usr/local/bin"));
        let plan = compile(&config, &profile, &CaptureIntent::Preview, &env);
        assert_eq!(plan.program, "/usr/local/bin/rpicam-vid");
    }

    #[test]
    fn test_unbounded_video() {
        let mut config = CaptureConfig::default();
        config.vlen = 0;
        let profile = CameraProfile::default();
        let plan = compile(&config, &profile, &CaptureIntent::Video, &env());
        assert_eq!(plan.completion, Completion::UntilStopped);
        assert!(!plan.is_bounded());
    }

    #[test]
    fn test_segment_completion_adds_a_second() {
        let mut config = CaptureConfig::default();
        config.tinterval = 0;
        config.tduration = 5;
        let profile = CameraProfile::default();
        let intent = CaptureIntent::Timelapse { binned: false, shot: 0 };
        let plan = compile(&config, &profile, &intent, &env());
        assert_eq!(plan.kind, PlanKind::TimelapseSegment);
        assert_eq!(plan.expected_duration(), Some(Duration::from_secs(6)));
    }
}
