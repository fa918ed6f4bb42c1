use crate::provider::{Credentials, UserPoolConfig};
use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

pub const ARG_REGION: &str = "provider-region";
pub const ARG_POOL_ID: &str = "provider-pool-id";
pub const ARG_CLIENT_ID: &str = "provider-client-id";
pub const ARG_CLIENT_SECRET: &str = "provider-client-secret";
pub const ARG_ACCESS_KEY_ID: &str = "provider-access-key-id";
pub const ARG_SECRET_ACCESS_KEY: &str = "provider-secret-access-key";
pub const ARG_SESSION_TOKEN: &str = "provider-session-token";
pub const ARG_ENDPOINT: &str = "provider-endpoint";
pub const ARG_TIMEOUT: &str = "provider-timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_REGION)
                .long(ARG_REGION)
                .help("User pool region, for example eu-west-1")
                .env("ROSTER_PROVIDER_REGION")
                .required(true),
        )
        .arg(
            Arg::new(ARG_POOL_ID)
                .long(ARG_POOL_ID)
                .help("User pool id")
                .env("ROSTER_PROVIDER_POOL_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_CLIENT_ID)
                .long(ARG_CLIENT_ID)
                .help("App client id")
                .env("ROSTER_PROVIDER_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_CLIENT_SECRET)
                .long(ARG_CLIENT_SECRET)
                .help("App client secret, used to compute SECRET_HASH")
                .env("ROSTER_PROVIDER_CLIENT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_KEY_ID)
                .long(ARG_ACCESS_KEY_ID)
                .help("Access key id for signed admin calls")
                .env("ROSTER_PROVIDER_ACCESS_KEY_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SECRET_ACCESS_KEY)
                .long(ARG_SECRET_ACCESS_KEY)
                .help("Secret access key for signed admin calls")
                .env("ROSTER_PROVIDER_SECRET_ACCESS_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TOKEN)
                .long(ARG_SESSION_TOKEN)
                .help("Session token for temporary credentials")
                .env("ROSTER_PROVIDER_SESSION_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_ENDPOINT)
                .long(ARG_ENDPOINT)
                .help("Override the regional endpoint")
                .long_help(
                    "Override the regional endpoint. Defaults to https://cognito-idp.<region>.amazonaws.com",
                )
                .env("ROSTER_PROVIDER_ENDPOINT"),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Provider request timeout in seconds")
                .env("ROSTER_PROVIDER_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64)),
        )
}

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

/// Build the user-pool configuration from parsed arguments.
///
/// # Errors
/// Returns an error if a required argument is missing or the endpoint is not a valid URL.
pub fn parse(matches: &clap::ArgMatches) -> Result<UserPoolConfig> {
    let region = required(matches, ARG_REGION)?;

    let endpoint = match matches.get_one::<String>(ARG_ENDPOINT) {
        Some(endpoint) => Url::parse(endpoint).context("invalid ROSTER_PROVIDER_ENDPOINT")?,
        None => UserPoolConfig::regional_endpoint(&region)
            .context("invalid ROSTER_PROVIDER_REGION")?,
    };

    let timeout = matches.get_one::<u64>(ARG_TIMEOUT).copied().unwrap_or(10);

    Ok(UserPoolConfig {
        endpoint,
        pool_id: required(matches, ARG_POOL_ID)?,
        client_id: required(matches, ARG_CLIENT_ID)?,
        client_secret: SecretString::from(required(matches, ARG_CLIENT_SECRET)?),
        credentials: Credentials {
            access_key_id: required(matches, ARG_ACCESS_KEY_ID)?,
            secret_access_key: SecretString::from(required(matches, ARG_SECRET_ACCESS_KEY)?),
            session_token: matches
                .get_one::<String>(ARG_SESSION_TOKEN)
                .cloned()
                .map(SecretString::from),
        },
        region,
        timeout: Duration::from_secs(timeout),
    })
}
