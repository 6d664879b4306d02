//! CLI argument definitions for `pianola-cli`.

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("pianola")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Play timestamped key-press songs")
        .arg_required_else_help(true)
        .args_conflicts_with_subcommands(true)
        .arg(
            Arg::new("speed")
                .long("speed")
                .short('x')
                .value_name("FACTOR")
                .value_parser(value_parser!(f64))
                .help("Playback speed multiplier (overrides the config file)"),
        )
        .arg(
            Arg::new("hold")
                .long("hold")
                .value_name("SECONDS")
                .value_parser(value_parser!(f64))
                .help("How long each key is held (overrides the config file)"),
        )
        .arg(
            Arg::new("seek")
                .long("seek")
                .short('s')
                .value_name("TIME")
                .value_parser(value_parser!(f64))
                .help("Start at the given time in seconds"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .help("Path to a JSON configuration file"),
        )
        .arg(
            Arg::new("no-mapping")
                .long("no-mapping")
                .action(ArgAction::SetTrue)
                .help("Send action ids to the actuator unchanged"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Do not open the status panel"),
        )
        .arg(
            Arg::new("INPUT")
                .help("The song file to play")
                .required(false)
                .index(1),
        )
        .subcommand(
            Command::new("info")
                .about("Print song statistics")
                .arg(
                    Arg::new("INPUT")
                        .help("The song file to inspect")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Emit default JSON payloads")
                .subcommand_required(true)
                .subcommand(
                    Command::new("config-json")
                        .about("Print the default configuration as JSON"),
                ),
        )
}
