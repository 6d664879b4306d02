use std::{io, path::Path, sync::Arc, thread::sleep, time::Duration};

use clap::ArgMatches;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use pianola_lib::{
    KeyMapping, LogActuator, Player, PlayerConfig, PlayerEvent, PlayerState, Result,
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::logging::LogBuffer;
use crate::{cli, controls, ui};

const LOG_LINES_SHOWN: usize = 200;

pub fn run(args: &ArgMatches, log_buffer: LogBuffer) -> Result<i32> {
    match args.subcommand() {
        Some(("info", sub)) => {
            let input = sub.get_one::<String>("INPUT").map(String::as_str).unwrap_or("");
            println!("{}", cli::info::song_summary(Path::new(input))?);
            return Ok(0);
        }
        Some(("create", sub)) => {
            if let Some(("config-json", _)) = sub.subcommand() {
                println!("{}", cli::info::default_config_json());
            }
            return Ok(0);
        }
        _ => {}
    }

    let Some(file_path) = args.get_one::<String>("INPUT") else {
        error!("No song file given");
        eprintln!("error: no song file given");
        return Ok(-1);
    };
    let quiet = args.get_flag("quiet");
    info!("Starting Pianola CLI");

    let config = load_config(args)?;
    let player = Player::with_config(Arc::new(LogActuator), config)?;
    let report = player.load_song_file(file_path)?;
    info!(
        "Loaded {}: {} note(s), {} dropped",
        file_path, report.accepted, report.dropped
    );

    if let Some(seconds) = args.get_one::<f64>("seek") {
        player.seek((seconds.max(0.0) * 1000.0).round() as u64);
    }

    player.play()?;

    if quiet {
        player.sleep_until_end();
    } else {
        run_panel(&player, file_path, &log_buffer);
    }

    let failure = player.events().try_iter().find_map(|event| match event {
        PlayerEvent::RuntimeExceeded {
            expected_ms,
            elapsed_ms,
        } => Some(format!(
            "playback overran its expected run time ({} ms against {} ms)",
            elapsed_ms, expected_ms
        )),
        PlayerEvent::SchedulerPanicked => Some("the scheduler thread crashed".to_string()),
        _ => None,
    });
    let progress = player.get_progress();
    if quiet {
        println!(
            "{:?} at {} / {}",
            progress.state,
            controls::format_time(progress.current_ms),
            controls::format_time(progress.total_ms)
        );
    }

    if failure.is_some() || progress.state == PlayerState::Aborted {
        let message = failure.unwrap_or_else(|| "playback was aborted".to_string());
        error!("{}", message);
        eprintln!("error: {}", message);
        return Ok(-1);
    }
    Ok(0)
}

/// Settings from `--config` (or defaults) with command-line overrides applied.
fn load_config(args: &ArgMatches) -> Result<PlayerConfig> {
    let mut config = match args.get_one::<String>("config") {
        Some(path) => PlayerConfig::from_path(path)?,
        None => PlayerConfig::default(),
    };

    if args.get_flag("no-mapping") {
        config.key_mapping = None;
    } else if config.key_mapping.is_none() {
        config.key_mapping = Some(KeyMapping::default());
    }
    if let Some(speed) = args.get_one::<f64>("speed") {
        config.playback.speed = *speed;
    }
    if let Some(hold) = args.get_one::<f64>("hold") {
        config.playback.hold_duration_s = *hold;
    }

    config.playback.validate()?;
    Ok(config)
}

fn run_panel(player: &Player, source: &str, log_buffer: &LogBuffer) {
    let _raw_mode = RawModeGuard::enable().ok();
    let mut terminal = {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, EnterAlternateScreen, cursor::Hide);
        let backend = CrosstermBackend::new(stdout);
        Terminal::new(backend).ok()
    };

    while !player.is_finished() {
        if let Some(term) = terminal.as_mut() {
            let settings = player.settings();
            let status = controls::status_text(controls::StatusArgs {
                progress: player.get_progress(),
                speed: settings.speed,
                hold_duration_s: settings.hold_duration_s,
                layout: player
                    .key_mapping()
                    .map(|mapping| mapping.keys().map(str::to_string).collect())
                    .unwrap_or_default(),
                held_keys: player.held_keys(),
            });
            let log_lines = log_buffer.tail(LOG_LINES_SHOWN);
            ui::draw_status(term, source, &status, &log_lines);
        }

        if !controls::handle_key_event(player) {
            break;
        }

        sleep(Duration::from_millis(50));
    }

    if let Some(mut term) = terminal {
        let _ = term.show_cursor();
        let stdout = term.backend_mut();
        let _ = execute!(stdout, LeaveAlternateScreen, cursor::Show);
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::build_cli;

    fn matches(argv: &[&str]) -> ArgMatches {
        build_cli().try_get_matches_from(argv.iter().copied()).unwrap()
    }

    #[test]
    fn flags_override_defaults_and_mapping_is_on_by_default() {
        let args = matches(&["pianola", "song.json", "-x", "2", "--hold", "0.1"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.playback.speed, 2.0);
        assert_eq!(config.playback.hold_duration_s, 0.1);
        assert_eq!(config.key_mapping, Some(KeyMapping::default()));

        let config = load_config(&matches(&["pianola", "song.json", "--no-mapping"])).unwrap();
        assert!(config.key_mapping.is_none());
    }

    #[test]
    fn invalid_override_is_rejected() {
        assert!(load_config(&matches(&["pianola", "song.json", "--speed", "0"])).is_err());
    }
}
