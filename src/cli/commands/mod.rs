pub mod auth;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};
use std::net::IpAddr;

pub const ARG_PORT: &str = "port";
pub const ARG_LISTEN: &str = "listen";
pub const CMD_HASH_PASSWORD: &str = "hash-password";
pub const ARG_PASSWORD: &str = "password";

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

    let command = Command::new("warden")
        .about("Session and authorization authority")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("WARDEN_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_LISTEN)
                .short('l')
                .long(ARG_LISTEN)
                .help("Address to bind")
                .default_value("::")
                .env("WARDEN_LISTEN")
                .value_parser(clap::value_parser!(IpAddr)),
        )
        .subcommand(
            Command::new(CMD_HASH_PASSWORD)
                .about("Print an argon2 hash for a password file entry")
                .arg(
                    Arg::new(ARG_PASSWORD)
                        .help("Password to hash, read from stdin when omitted"),
                ),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}
