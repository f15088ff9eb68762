// SPDX-License-Identifier: GPL-3.0-only

//! Terminal control panel
//!
//! Lists the capture parameters with their values and limits, maps keys to
//! intents and keeps the preview serviced between key presses. Captures run
//! in the foreground with a progress screen; `x`, Esc or Ctrl+C cancels them.

use crate::app::{Field, Intent, JobProgress, Outcome, PanelController, ParameterStore};
use crate::config::PanelSettings;
use crate::constants::{app_info, timing};
use crate::pipelines::{CancelToken, JobState};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Gauge, List, ListItem, ListState, Paragraph, Widget},
};
use std::io::{self, stdout};
use std::time::Duration;
use tracing::{error, info};

type PanelTerminal = Terminal<CrosstermBackend<io::Stdout>>;

/// Run the terminal panel
pub fn run(settings: PanelSettings, slot: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    let mut panel = PanelController::open(settings, slot)?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &mut panel);

    // Restore terminal
    panel.handle(Intent::Exit)?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Intent(Intent),
    /// Move the selection by rows
    Select(i32),
    /// Step the selected field
    StepSelected(i32),
    ToggleHelp,
    Quit,
}

fn key_action(key: &KeyEvent) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }
    let action = match key.code {
        KeyCode::Up | KeyCode::Char('k') => Action::Select(-1),
        KeyCode::Down | KeyCode::Char('j') => Action::Select(1),
        KeyCode::Left => Action::StepSelected(-1),
        KeyCode::Right => Action::StepSelected(1),
        KeyCode::PageDown => Action::StepSelected(-10),
        KeyCode::PageUp => Action::StepSelected(10),
        KeyCode::Char('p') => Action::Intent(Intent::Preview),
        KeyCode::Char('c') => Action::Intent(Intent::CaptureStill { binned: false }),
        KeyCode::Char('C') => Action::Intent(Intent::CaptureStill { binned: true }),
        KeyCode::Char('v') => Action::Intent(Intent::CaptureVideo),
        KeyCode::Char('n') => Action::Intent(Intent::StreamVideo),
        KeyCode::Char('t') => Action::Intent(Intent::CaptureTimelapse { binned: false }),
        KeyCode::Char('T') => Action::Intent(Intent::CaptureTimelapse { binned: true }),
        KeyCode::Char('s') => Action::Intent(Intent::SwitchCamera),
        KeyCode::Char('f') => Action::Intent(Intent::ToggleFocusMode),
        KeyCode::Char('[') => Action::Intent(Intent::FocusStep(-10)),
        KeyCode::Char(']') => Action::Intent(Intent::FocusStep(10)),
        KeyCode::Char('{') => Action::Intent(Intent::FocusStep(-1)),
        KeyCode::Char('}') => Action::Intent(Intent::FocusStep(1)),
        KeyCode::Char('w') => Action::Intent(Intent::Save),
        KeyCode::Char('x') | KeyCode::Esc => Action::Intent(Intent::Stop),
        KeyCode::Char('h') | KeyCode::Char('?') => Action::ToggleHelp,
        KeyCode::Char('q') => Action::Quit,
        _ => return None,
    };
    Some(action)
}

/// Fields worth showing for the current camera and modes
///
/// Fields pinned to a single value are hidden, as is whichever of the
/// exposure or white balance pair the current mode does not use.
fn visible_fields(store: &ParameterStore) -> Vec<Field> {
    let exposure = store.exposure_field();
    let white_balance = store.white_balance_fields();
    Field::ALL
        .into_iter()
        .filter(|&field| {
            let (min, max) = store.bounds(field);
            if min >= max {
                return false;
            }
            match field {
                Field::Speed | Field::Ev => field == exposure,
                Field::Blue | Field::Red | Field::Denoise | Field::Sharpness => {
                    white_balance.contains(&field)
                }
                _ => true,
            }
        })
        .collect()
}

fn run_app(
    terminal: &mut PanelTerminal,
    panel: &mut PanelController,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut list_state = ListState::default().with_selected(Some(0));
    let mut show_help = false;
    let mut status_message = build_status_message(panel);

    if let Err(e) = panel.handle(Intent::Preview) {
        error!(error = %e, "Failed to start preview");
        status_message = format!("Error: {}", e);
    }

    loop {
        let fields = visible_fields(panel.store());
        let selected = list_state
            .selected()
            .unwrap_or(0)
            .min(fields.len().saturating_sub(1));
        list_state.select(Some(selected));

        terminal.draw(|f| {
            let [main, status] =
                Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(f.area());
            let [list_area, side_area] =
                Layout::horizontal([Constraint::Min(40), Constraint::Length(36)]).areas(main);

            let list = field_list(panel.store(), &fields);
            f.render_stateful_widget(list, list_area, &mut list_state);
            f.render_widget(camera_summary(panel, show_help), side_area);
            f.render_widget(
                StatusBar {
                    message: &status_message,
                },
                status,
            );
        })?;

        if let Err(e) = panel.tick() {
            error!(error = %e, "Preview stopped");
            status_message = format!("Preview stopped: {}", e);
        }

        if !event::poll(timing::POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(action) = key_action(&key) else {
            continue;
        };

        let intent = match action {
            Action::Quit => break,
            Action::ToggleHelp => {
                show_help = !show_help;
                continue;
            }
            Action::Select(delta) => {
                let last = fields.len().saturating_sub(1) as i64;
                let next = (selected as i64 + delta as i64).clamp(0, last);
                list_state.select(Some(next as usize));
                continue;
            }
            Action::StepSelected(delta) => match fields.get(selected) {
                Some(&field) => Intent::Step { field, delta },
                None => continue,
            },
            Action::Intent(intent) => intent,
        };

        let result = if intent.is_capture() {
            run_capture(terminal, panel, intent)
        } else {
            panel.handle(intent)
        };
        status_message = match result {
            Ok(outcome) => describe_outcome(panel, &outcome),
            Err(e) => {
                error!(error = %e, ?intent, "Intent failed");
                format!("Error: {}", e)
            }
        };
    }

    info!("Leaving terminal panel");
    Ok(())
}

/// Run a capture with a progress screen, cancelling on x, Esc or Ctrl+C
fn run_capture(
    terminal: &mut PanelTerminal,
    panel: &mut PanelController,
    intent: Intent,
) -> crate::errors::AppResult<Outcome> {
    let cancel = panel.cancel_token();
    let label = match intent {
        Intent::CaptureStill { .. } => "Capturing still",
        Intent::CaptureVideo => "Recording",
        Intent::StreamVideo => "Streaming",
        _ => "Timelapse",
    };

    let mut observer = |progress: &JobProgress| {
        let _ = terminal.draw(|f| {
            f.render_widget(ProgressScreen { label, progress }, f.area());
        });
        poll_cancel(&cancel);
    };
    panel.handle_with(intent, &mut observer)
}

fn poll_cancel(cancel: &CancelToken) {
    while let Ok(true) = event::poll(Duration::ZERO) {
        let Ok(Event::Key(key)) = event::read() else {
            continue;
        };
        let stop = matches!(key.code, KeyCode::Char('x') | KeyCode::Esc)
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));
        if key.kind == KeyEventKind::Press && stop {
            cancel.cancel();
        }
    }
}

fn field_list<'a>(store: &ParameterStore, fields: &[Field]) -> List<'a> {
    let items: Vec<ListItem> = fields
        .iter()
        .map(|&field| {
            let (min, max) = store.bounds(field);
            ListItem::new(format!(
                "{:<16} {:>14}   [{} .. {}]",
                field.name(),
                store.display_value(field),
                min,
                max
            ))
        })
        .collect();

    List::new(items)
        .block(Block::bordered().title(format!(" rpicam-panel {} ", app_info::version())))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ")
}

fn camera_summary(panel: &PanelController, show_help: bool) -> Paragraph<'static> {
    if show_help {
        let lines = [
            "Up/Down   select field",
            "Left/Right  step value",
            "PgUp/PgDn   step by 10",
            "p  preview      x  stop",
            "c  still        C  binned still",
            "v  video        n  stream",
            "t  timelapse    T  binned",
            "s  switch camera",
            "f  focus mode",
            "[ ] { }  focus steps",
            "w  save parameters",
            "h  help         q  quit",
        ];
        return Paragraph::new(lines.into_iter().map(Line::from).collect::<Vec<_>>())
            .block(Block::bordered().title(" Keys "));
    }

    let profile = panel.profile();
    let store = panel.store();
    let job = match panel.job_state() {
        JobState::Idle => "idle",
        JobState::Starting => "starting",
        JobState::Running => "running",
        JobState::Stopping => "stopping",
        JobState::Completed => "completed",
    };
    let focus = if panel.focus().is_available() {
        "motor"
    } else {
        "none"
    };
    let lines = vec![
        Line::from(format!("Camera {}: {}", profile.slot, profile.variant)),
        Line::from(format!("Sensor: {}", profile.sensor_id)),
        Line::from(format!("Slots: {}", panel.inventory().slots.len())),
        Line::from(format!("Mode: {}", store.config().mode_name())),
        Line::from(format!("Shutter: {}", store.shutter_label())),
        Line::from(format!("Gain: {}", store.gain_label())),
        Line::from(format!("Focus device: {}", focus)),
        Line::from(format!("Job: {}", job)),
        Line::from(if panel.is_dirty() {
            "Preview: pending restart"
        } else {
            "Preview: current"
        }),
    ];
    Paragraph::new(lines).block(Block::bordered().title(" Camera "))
}

fn build_status_message(panel: &PanelController) -> String {
    let mut msg = "'p' preview | 'c' still | 'v' video | 't' timelapse".to_string();
    if panel.inventory().slots.len() > 1 {
        msg.push_str(" | 's' switch camera");
    }
    msg.push_str(" | 'h' help | 'q' quit");
    msg
}

fn describe_outcome(panel: &PanelController, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Unchanged => "No change".to_string(),
        Outcome::Changed { field, .. } => {
            format!("{} = {}", field, panel.store().display_value(*field))
        }
        Outcome::PreviewStarted => "Preview running".to_string(),
        Outcome::Still { path, metadata } if metadata.is_empty() => {
            format!("Saved: {}", path.display())
        }
        Outcome::Still { path, metadata } => format!("Saved: {}  {}", path.display(), metadata),
        Outcome::Video {
            path: Some(path),
            elapsed,
        } => format!("Saved: {} ({}s)", path.display(), elapsed.as_secs()),
        Outcome::Video { path: None, elapsed } => {
            format!("Stream ended after {}s", elapsed.as_secs())
        }
        Outcome::Timelapse(report) => format!(
            "Timelapse done: {} frames ({})",
            report.frames, report.timestamp
        ),
        Outcome::CameraSwitched { slot, variant } => format!("Camera {}: {}", slot, variant),
        Outcome::Focus(toggle) => format!("Focus: {:?}", toggle),
        Outcome::FocusMoved(position) => format!("Focus position {}", position),
        Outcome::FocusSpotSet => "Spot focus set".to_string(),
        Outcome::Saved(path) => format!("Parameters saved to {}", path.display()),
        Outcome::Stopped => "Stopped".to_string(),
        Outcome::Exit => "Exiting".to_string(),
    }
}

/// Full-screen progress for a running capture
struct ProgressScreen<'a> {
    label: &'a str,
    progress: &'a JobProgress,
}

impl Widget for ProgressScreen<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [_, gauge_area, hint_area, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .areas(area);

        let elapsed = self.progress.elapsed.as_secs_f64();
        let ratio = match (self.progress.shots_taken, self.progress.shots_total) {
            (Some(taken), Some(total)) if total > 0 => taken as f64 / total as f64,
            _ => match self.progress.remaining {
                Some(remaining) => {
                    let total = elapsed + remaining.as_secs_f64();
                    if total > 0.0 { elapsed / total } else { 0.0 }
                }
                None => 0.0,
            },
        };

        let mut label = format!("{}s", elapsed as u64);
        if let Some(taken) = self.progress.shots_taken {
            match self.progress.shots_total {
                Some(total) => label.push_str(&format!("  shot {}/{}", taken, total)),
                None => label.push_str(&format!("  {} frames", taken)),
            }
        }

        Gauge::default()
            .block(Block::bordered().title(format!(" {} ", self.label)))
            .gauge_style(Style::default().fg(Color::Green))
            .ratio(ratio.clamp(0.0, 1.0))
            .label(label)
            .render(gauge_area, buf);
        Paragraph::new("x / Esc to stop").render(hint_area, buf);
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}
