use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::warn;
use pianola_lib::{Player, PlayerState, Progress};

const SEEK_STEP_MS: u64 = 5_000;
const SPEED_STEP: f64 = 0.1;
const MIN_SPEED: f64 = 0.1;

pub struct StatusSnapshot {
    pub text: String,
    pub position: String,
    /// Song progress in `0.0..=1.0`.
    pub ratio: f64,
    pub keys: Vec<KeyCell>,
}

/// One key on the panel's keyboard strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCell {
    pub name: String,
    pub held: bool,
}

pub struct StatusArgs {
    pub progress: Progress,
    pub speed: f64,
    pub hold_duration_s: f64,
    /// Keys of the active mapping, in index order.
    pub layout: Vec<String>,
    pub held_keys: Vec<String>,
}

pub fn status_text(args: StatusArgs) -> StatusSnapshot {
    let state = match args.progress.state {
        PlayerState::Playing => "▶ Playing",
        PlayerState::Paused => "⏸ Paused",
        PlayerState::Idle => "Ready",
        PlayerState::Stopped => "■ Stopped",
        PlayerState::Finished => "Finished",
        PlayerState::Aborted => "Aborted",
    };
    let ratio = if args.progress.total_ms > 0 {
        (args.progress.current_ms as f64 / args.progress.total_ms as f64).min(1.0)
    } else {
        0.0
    };
    let position = format!(
        "{} / {}  ({:.1}%)",
        format_time(args.progress.current_ms),
        format_time(args.progress.total_ms),
        ratio * 100.0
    );
    let text = format!(
        "{}\nSpeed: {:.1}x | hold: {:.2}s",
        state, args.speed, args.hold_duration_s
    );

    StatusSnapshot {
        text,
        position,
        ratio,
        keys: key_cells(&args.layout, &args.held_keys),
    }
}

/// Layout keys flagged when held, followed by held keys outside the layout.
fn key_cells(layout: &[String], held_keys: &[String]) -> Vec<KeyCell> {
    let mut cells: Vec<KeyCell> = layout
        .iter()
        .map(|name| KeyCell {
            name: name.clone(),
            held: held_keys.contains(name),
        })
        .collect();
    cells.extend(
        held_keys
            .iter()
            .filter(|key| !layout.contains(key))
            .map(|key| KeyCell {
                name: key.clone(),
                held: true,
            }),
    );
    cells
}

/// Poll for one key press and apply it. Returns `false` when the user quits.
pub fn handle_key_event(player: &Player) -> bool {
    if event::poll(Duration::from_millis(100)).unwrap_or(false) {
        if let Ok(Event::Key(key)) = event::read() {
            if key.kind != KeyEventKind::Press {
                return true;
            }
            match key.code {
                KeyCode::Char('q') => {
                    player.stop();
                    return false;
                }
                KeyCode::Char(' ') => {
                    if player.is_playing() {
                        player.pause();
                    } else if let Err(err) = player.play() {
                        warn!("{}", err);
                    }
                }
                KeyCode::Left => {
                    let target = player.get_time_ms().saturating_sub(SEEK_STEP_MS);
                    player.seek(target);
                }
                KeyCode::Right => {
                    let target = player.get_time_ms().saturating_add(SEEK_STEP_MS);
                    player.seek(target);
                }
                KeyCode::Char('-') => {
                    let next = next_speed(player.get_speed(), -SPEED_STEP);
                    if let Err(err) = player.set_speed(next) {
                        warn!("{}", err);
                    }
                }
                KeyCode::Char('=') | KeyCode::Char('+') => {
                    let next = next_speed(player.get_speed(), SPEED_STEP);
                    if let Err(err) = player.set_speed(next) {
                        warn!("{}", err);
                    }
                }
                _ => {}
            }
        }
    }

    true
}

fn next_speed(current: f64, step: f64) -> f64 {
    let next = ((current + step) * 10.0).round() / 10.0;
    next.max(MIN_SPEED)
}

/// Format milliseconds as `mm:ss`, or `h:mm:ss` past one hour.
pub fn format_time(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let seconds = seconds % 60;
    let hours = minutes / 60;
    let minutes = minutes % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
