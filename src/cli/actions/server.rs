use crate::{api, provider::UserPoolConfig};
use anyhow::Result;
use secrecy::SecretString;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub provider: UserPoolConfig,
    pub admin_session_ttl_seconds: i64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database or provider client cannot be set up, or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        port = args.port,
        provider.endpoint = %args.provider.endpoint,
        provider.region = %args.provider.region,
        provider.pool_id = %args.provider.pool_id,
        admin_session_ttl_seconds = args.admin_session_ttl_seconds,
        "starting roster"
    );

    api::new(
        args.port,
        args.dsn,
        args.provider,
        args.admin_session_ttl_seconds,
    )
    .await
}
