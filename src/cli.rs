// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing attached cameras
//! - Taking stills, videos, streams and timelapses
//! - Printing the command line a capture would run

use rpicam_panel::backends::camera::{CameraDetector, build_profile};
use rpicam_panel::pipelines::TimelapseMode;
use rpicam_panel::{CaptureIntent, Field, Intent, JobProgress, Outcome, PanelController, PanelSettings};
use std::io::Write;

/// Options shared by every command
pub struct RunOptions {
    pub camera: Option<u32>,
    pub overrides: Vec<(Field, i32)>,
}

/// List all attached cameras
pub fn list_cameras(settings: &PanelSettings) -> Result<(), Box<dyn std::error::Error>> {
    let detector = CameraDetector::new(&settings.list_program);
    let inventory = detector.enumerate();

    if inventory.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    let host = detector.host_facts();
    println!("Available cameras:");
    println!();
    for entry in &inventory.slots {
        let profile = build_profile(&inventory, entry.slot, &host);
        println!("  [{}] {} ({})", entry.slot, profile.variant, entry.sensor_id);
        println!(
            "      Sensor: {}x{}  Max gain: {}  Max shutter: {}s",
            profile.active_area.0, profile.active_area.1, profile.max_gain, profile.max_shutter_secs
        );
        if profile.has_scientific_tuning() {
            println!("      Scientific tuning available");
        }
        println!();
    }
    if inventory.same_cams && inventory.slots.len() > 1 {
        println!("All slots carry the same sensor.");
    }

    Ok(())
}

/// Take a still with the stored parameters
pub fn take_photo(
    settings: PanelSettings,
    options: &RunOptions,
    binned: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut panel = open_panel(settings, options)?;
    install_cancel_handler(&panel)?;
    print_camera(&panel);
    println!(
        "Exposure: {}  Gain: {}",
        panel.store().shutter_label(),
        panel.store().gain_label()
    );

    println!("Capturing... (press Ctrl+C to cancel)");
    let outcome = panel.handle_with(Intent::CaptureStill { binned }, &mut |progress| {
        print_progress("Capturing", progress)
    })?;
    println!();

    if let Outcome::Still { path, metadata } = outcome {
        println!("Photo saved: {}", path.display());
        if !metadata.is_empty() {
            println!("{}", metadata);
        }
    }
    Ok(())
}

/// Record to a file, or stream when `stream` is set
pub fn record_video(
    settings: PanelSettings,
    options: &RunOptions,
    length: Option<i32>,
    stream: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut panel = open_panel(settings, options)?;
    if let Some(length) = length {
        panel.handle(Intent::Adjust {
            field: Field::Vlen,
            value: length,
        })?;
    }
    install_cancel_handler(&panel)?;
    print_camera(&panel);

    let store = panel.store();
    println!(
        "Format: {}  Length: {}",
        store.display_value(Field::Vformat),
        match store.get(Field::Vlen) {
            0 => "until stopped".to_string(),
            secs => format!("{} seconds", secs),
        }
    );

    let (intent, label) = if stream {
        println!("Streaming on tcp port {}", panel.settings().stream_port);
        (Intent::StreamVideo, "Streaming")
    } else {
        (Intent::CaptureVideo, "Recording")
    };

    println!();
    println!("{}... (press Ctrl+C to stop)", label);
    let outcome = panel.handle_with(intent, &mut |progress| print_progress(label, progress))?;
    println!();

    if let Outcome::Video { path, elapsed } = outcome {
        match path {
            Some(path) => println!("Video saved: {} ({}s)", path.display(), elapsed.as_secs()),
            None => println!("Stream ended after {}s", elapsed.as_secs()),
        }
    }
    Ok(())
}

pub fn run_timelapse(
    settings: PanelSettings,
    options: &RunOptions,
    interval: Option<i32>,
    shots: Option<i32>,
    binned: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut panel = open_panel(settings, options)?;
    if let Some(interval) = interval {
        panel.handle(Intent::Adjust {
            field: Field::Tinterval,
            value: interval,
        })?;
    }
    if let Some(shots) = shots {
        panel.handle(Intent::Adjust {
            field: Field::Tshots,
            value: shots,
        })?;
    }
    install_cancel_handler(&panel)?;
    print_camera(&panel);

    let config = panel.store().config();
    let mode = TimelapseMode::for_config(config);
    println!(
        "Timelapse: {:?}, interval {}s, {} shots, {}s total",
        mode, config.tinterval, config.tshots, config.tduration
    );

    println!("Running... (press Ctrl+C to cancel)");
    let outcome = panel.handle_with(Intent::CaptureTimelapse { binned }, &mut |progress| {
        print_progress("Timelapse", progress)
    })?;
    println!();

    if let Outcome::Timelapse(report) = outcome {
        println!(
            "Timelapse finished: {} frames with prefix {} in {}",
            report.frames,
            report.timestamp,
            panel.settings().pictures_dir.display()
        );
    }
    Ok(())
}

/// Print the compiled command line without running anything
pub fn print_command(
    settings: PanelSettings,
    options: &RunOptions,
    intent: CaptureIntent,
) -> Result<(), Box<dyn std::error::Error>> {
    let panel = open_panel(settings, options)?;
    let plan = panel.plan(&intent);
    println!("{}", plan.command_line());
    Ok(())
}

fn open_panel(
    settings: PanelSettings,
    options: &RunOptions,
) -> Result<PanelController, Box<dyn std::error::Error>> {
    let mut panel = PanelController::open(settings, options.camera)?;
    for (field, _, applied) in panel.apply_overrides(&options.overrides) {
        eprintln!("{} limited to {}", field, applied);
    }
    Ok(panel)
}

fn install_cancel_handler(panel: &PanelController) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = panel.cancel_token();
    ctrlc::set_handler(move || cancel.cancel())?;
    Ok(())
}

fn print_camera(panel: &PanelController) {
    let profile = panel.profile();
    println!("Using camera {}: {}", profile.slot, profile.variant);
}

fn print_progress(label: &str, progress: &JobProgress) {
    let elapsed = progress.elapsed.as_secs();
    let mut line = format!("\r{}: {:02}:{:02}", label, elapsed / 60, elapsed % 60);
    if let (Some(taken), Some(total)) = (progress.shots_taken, progress.shots_total) {
        line.push_str(&format!("  shot {}/{}", taken, total));
    } else if let Some(taken) = progress.shots_taken {
        line.push_str(&format!("  {} frames", taken));
    }
    if let Some(remaining) = progress.remaining {
        line.push_str(&format!("  {}s left ", remaining.as_secs()));
    }
    print!("{}", line);
    let _ = std::io::stdout().flush();
}
