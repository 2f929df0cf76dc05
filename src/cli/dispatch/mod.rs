//! Maps parsed CLI arguments to the action to run.

use crate::cli::actions::{hash_password, server, Action};
use crate::cli::commands::{self, auth};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::net::{IpAddr, Ipv6Addr};

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if let Some(sub) = matches.subcommand_matches(commands::CMD_HASH_PASSWORD) {
        return Ok(Action::HashPassword(hash_password::Args {
            password: sub
                .get_one::<String>(commands::ARG_PASSWORD)
                .map(|password| SecretString::from(password.clone())),
        }));
    }

    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);
    let listen = matches
        .get_one::<IpAddr>(commands::ARG_LISTEN)
        .copied()
        .unwrap_or(IpAddr::V6(Ipv6Addr::UNSPECIFIED));

    let auth_opts = auth::Options::parse(matches).context("invalid authorization arguments")?;

    Ok(Action::Server(server::Args {
        listen,
        port,
        auth_enabled: auth_opts.enabled,
        unauthenticated_paths: auth_opts.unauthenticated_paths,
        internal_type: auth_opts.internal_type,
        internal_options: auth_opts.internal_options,
        force_internal_users: auth_opts.force_internal_users,
        external_type: auth_opts.external_type,
        external_options: auth_opts.external_options,
        totp_secret_path: auth_opts.totp_secret_path,
        session_expire_seconds: auth_opts.session_expire_seconds,
    }))
}
