//! Authorization flags: gating, backends, second factor and session lifetime.

use crate::auth::BackendOptions;
use anyhow::{anyhow, Context, Result};
use clap::{
    builder::BoolishValueParser, parser::ValueSource, Arg, ArgAction, ArgMatches, Command,
};
use std::path::PathBuf;

pub const ARG_AUTH_ENABLED: &str = "auth-enabled";
pub const ARG_UNAUTH_PATH: &str = "unauth-path";
pub const ARG_INTERNAL_TYPE: &str = "internal-type";
pub const ARG_INTERNAL_OPTION: &str = "internal-option";
pub const ARG_FORCE_INTERNAL_USER: &str = "force-internal-user";
pub const ARG_EXTERNAL_TYPE: &str = "external-type";
pub const ARG_EXTERNAL_OPTION: &str = "external-option";
pub const ARG_TOTP_SECRET_PATH: &str = "totp-secret-path";
pub const ARG_SESSION_EXPIRE_SECONDS: &str = "session-expire-seconds";

#[derive(Debug)]
pub struct Options {
    pub enabled: bool,
    pub unauthenticated_paths: Vec<String>,
    pub internal_type: String,
    pub internal_options: BackendOptions,
    pub force_internal_users: Vec<String>,
    pub external_type: Option<String>,
    pub external_options: BackendOptions,
    pub totp_secret_path: Option<PathBuf>,
    pub session_expire_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a backend option is not `key=value`, or external
    /// options are given without an external backend.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let internal_options = BackendOptions::parse(option_pairs(matches, ARG_INTERNAL_OPTION))
            .with_context(|| format!("invalid --{ARG_INTERNAL_OPTION}"))?;
        let external_options = BackendOptions::parse(option_pairs(matches, ARG_EXTERNAL_OPTION))
            .with_context(|| format!("invalid --{ARG_EXTERNAL_OPTION}"))?;

        let external_type = matches
            .get_one::<String>(ARG_EXTERNAL_TYPE)
            .filter(|name| !name.is_empty())
            .cloned();
        if external_type.is_none() && external_options != BackendOptions::new() {
            return Err(anyhow!(
                "--{ARG_EXTERNAL_OPTION} requires --{ARG_EXTERNAL_TYPE}"
            ));
        }

        Ok(Self {
            enabled: matches
                .get_one::<bool>(ARG_AUTH_ENABLED)
                .copied()
                .unwrap_or(true),
            unauthenticated_paths: strings(matches, ARG_UNAUTH_PATH),
            internal_type: matches
                .get_one::<String>(ARG_INTERNAL_TYPE)
                .cloned()
                .context("missing required argument: --internal-type")?,
            internal_options,
            force_internal_users: strings(matches, ARG_FORCE_INTERNAL_USER),
            external_type,
            external_options,
            totp_secret_path: matches.get_one::<PathBuf>(ARG_TOTP_SECRET_PATH).cloned(),
            session_expire_seconds: matches
                .get_one::<u64>(ARG_SESSION_EXPIRE_SECONDS)
                .copied()
                .unwrap_or(0),
        })
    }
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| {
            values
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Backend `key=value` pairs. Values may hold commas, so each flag is one
/// pair; the env var carries one pair per line.
fn option_pairs(matches: &ArgMatches, id: &str) -> Vec<String> {
    let values = strings(matches, id);
    if matches.value_source(id) == Some(ValueSource::EnvVariable) {
        values
            .iter()
            .flat_map(|value| value.lines())
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        values
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_gating_args(command);
    let command = with_backend_args(command);
    with_session_args(command)
}

fn with_gating_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_ENABLED)
                .long(ARG_AUTH_ENABLED)
                .help("Require authorization on protected routes")
                .env("WARDEN_AUTH_ENABLED")
                .default_value("true")
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_UNAUTH_PATH)
                .long(ARG_UNAUTH_PATH)
                .help("Route path exempt from authorization, may be repeated")
                .env("WARDEN_UNAUTH_PATHS")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
}

fn with_backend_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_INTERNAL_TYPE)
                .long(ARG_INTERNAL_TYPE)
                .help("Internal auth backend")
                .env("WARDEN_INTERNAL_TYPE")
                .default_value("htpasswd"),
        )
        .arg(
            Arg::new(ARG_INTERNAL_OPTION)
                .long(ARG_INTERNAL_OPTION)
                .help("Internal backend option as key=value, may be repeated (one pair per line in the env var)")
                .env("WARDEN_INTERNAL_OPTIONS")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_FORCE_INTERNAL_USER)
                .long(ARG_FORCE_INTERNAL_USER)
                .help("User always verified by the internal backend, may be repeated")
                .env("WARDEN_FORCE_INTERNAL_USERS")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_EXTERNAL_TYPE)
                .long(ARG_EXTERNAL_TYPE)
                .help("External auth backend, e.g. http")
                .env("WARDEN_EXTERNAL_TYPE"),
        )
        .arg(
            Arg::new(ARG_EXTERNAL_OPTION)
                .long(ARG_EXTERNAL_OPTION)
                .help("External backend option as key=value, may be repeated (one pair per line in the env var)")
                .env("WARDEN_EXTERNAL_OPTIONS")
                .action(ArgAction::Append),
        )
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOTP_SECRET_PATH)
                .long(ARG_TOTP_SECRET_PATH)
                .help("File holding the base32 TOTP secret; an empty file disables the second factor")
                .env("WARDEN_TOTP_SECRET_PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_SESSION_EXPIRE_SECONDS)
                .long(ARG_SESSION_EXPIRE_SECONDS)
                .help("Session lifetime for logins that don't request one, 0 = never expire")
                .env("WARDEN_SESSION_EXPIRE_SECONDS")
                .default_value("0")
                .value_parser(clap::value_parser!(u64)),
        )
}
