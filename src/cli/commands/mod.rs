pub mod logging;
pub mod provider;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_ADMIN_SESSION_TTL: &str = "admin-session-ttl";

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

    let command = Command::new("roster")
        .about("User and admin account management")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("ROSTER_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("ROSTER_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_ADMIN_SESSION_TTL)
                .long(ARG_ADMIN_SESSION_TTL)
                .help("Admin bearer session TTL in seconds")
                .env("ROSTER_ADMIN_SESSION_TTL")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        );

    let command = provider::with_args(command);
    logging::with_args(command)
}
