//! Maps validated CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{provider, ARG_ADMIN_SESSION_TTL, ARG_DSN, ARG_PORT};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --dsn")?;
    let admin_session_ttl_seconds = matches
        .get_one::<i64>(ARG_ADMIN_SESSION_TTL)
        .copied()
        .unwrap_or(3600);

    if admin_session_ttl_seconds <= 0 {
        anyhow::bail!("--{ARG_ADMIN_SESSION_TTL} must be greater than zero");
    }

    let provider = provider::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        provider,
        admin_session_ttl_seconds,
    }))
}
