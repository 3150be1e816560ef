use crate::provision::DEFAULT_ADD_USER_COMMAND;
use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub const DEFAULT_CONFIG_FILE: &str = "/etc/security/dirpam.conf";

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    Command::new("dirpam")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config-file")
                .short('c')
                .long("config-file")
                .help("The file containing all configuration")
                .default_value(DEFAULT_CONFIG_FILE)
                .env("DIRPAM_CONFIG_FILE")
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("DIRPAM_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("check")
                .about("Run one authentication decision against the directory")
                .arg(
                    Arg::new("username")
                        .help("Login name to check")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("add-users")
                .about("Create a local account for every member of a directory group")
                .arg(
                    Arg::new("group")
                        .short('g')
                        .long("group")
                        .help("The directory group all users belong to")
                        .env("DIRPAM_PROVISION_GROUP"),
                )
                .arg(
                    Arg::new("admin-group")
                        .short('a')
                        .long("add-to-group")
                        .help("The local group to which each user will be added"),
                )
                .arg(
                    Arg::new("exclude")
                        .short('x')
                        .long("exclude")
                        .help("Do not add these users")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("command")
                        .long("command")
                        .help("The command used to create each user")
                        .default_value(DEFAULT_ADD_USER_COMMAND),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Log the commands without executing them")
                        .action(ArgAction::SetTrue),
                ),
        )
}
