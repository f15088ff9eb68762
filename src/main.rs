// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use rpicam_panel::{CaptureIntent, Field, PanelSettings};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "rpicam-panel")]
#[command(about = "Control panel for Raspberry Pi cameras driving the rpicam-apps tools")]
#[command(version = rpicam_panel::constants::app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Panel settings file (default: ~/.config/rpicam-panel/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Camera slot to use (from 'rpicam-panel list')
    #[arg(short, long, global = true)]
    camera: Option<u32>,

    /// Override a capture parameter for this run, e.g. --set speed=20
    #[arg(long = "set", global = true, value_parser = parse_assignment)]
    overrides: Vec<(Field, i32)>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive terminal panel
    Terminal,

    /// List attached cameras and their limits
    List,

    /// Take a still
    Photo {
        /// Use the 2x2 binned mode on 64MP sensors
        #[arg(short, long)]
        binned: bool,
    },

    /// Record a video
    Video {
        /// Recording length in seconds, 0 records until Ctrl+C
        #[arg(short, long)]
        length: Option<i32>,
    },

    /// Stream video over TCP
    Stream {
        /// Stream length in seconds, 0 streams until Ctrl+C
        #[arg(short, long)]
        length: Option<i32>,
    },

    /// Run a timelapse
    Timelapse {
        /// Seconds between frames
        #[arg(short, long)]
        interval: Option<i32>,

        /// Number of frames
        #[arg(short, long)]
        shots: Option<i32>,

        /// Use the 2x2 binned mode on 64MP sensors
        #[arg(short, long)]
        binned: bool,
    },

    /// Print the command line a capture would run, without running it
    Command {
        #[arg(value_enum, default_value_t = CommandKind::Preview)]
        kind: CommandKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CommandKind {
    Preview,
    Still,
    Video,
    Stream,
    Timelapse,
}

fn parse_assignment(arg: &str) -> Result<(Field, i32), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("Expected FIELD=VALUE, got {}", arg))?;
    let field = name.parse::<Field>()?;
    let value = value
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("Invalid value for {}: {}", field, e))?;
    Ok((field, value))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=rpicam_panel=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let settings = PanelSettings::load_or_default(cli.settings.as_deref());
    let options = cli::RunOptions {
        camera: cli.camera,
        overrides: cli.overrides,
    };

    match cli.command {
        None | Some(Commands::Terminal) => rpicam_panel::terminal::run(settings, options.camera),
        Some(Commands::List) => cli::list_cameras(&settings),
        Some(Commands::Photo { binned }) => cli::take_photo(settings, &options, binned),
        Some(Commands::Video { length }) => cli::record_video(settings, &options, length, false),
        Some(Commands::Stream { length }) => cli::record_video(settings, &options, length, true),
        Some(Commands::Timelapse {
            interval,
            shots,
            binned,
        }) => cli::run_timelapse(settings, &options, interval, shots, binned),
        Some(Commands::Command { kind }) => cli::print_command(settings, &options, kind.intent()),
    }
}

impl CommandKind {
    fn intent(self) -> CaptureIntent {
        match self {
            CommandKind::Preview => CaptureIntent::Preview,
            CommandKind::Still => CaptureIntent::Still { binned: false },
            CommandKind::Video => CaptureIntent::Video,
            CommandKind::Stream => CaptureIntent::Stream,
            CommandKind::Timelapse => CaptureIntent::Timelapse {
                binned: false,
                shot: 0,
            },
        }
    }
}
