//! Simulator configuration and command-line parsing.

use clap::{App, Arg, ErrorKind as ClapErrorKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_COMMAND_PORT: u16 = 1081;
pub const DEFAULT_STATUS_PORT: u16 = 1082;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_MODEL_TICK_MS: u64 = 1000;
pub const DEFAULT_LISTEN_BACKLOG: u32 = 1;

/// Long options that may also be spelled with a single dash.
const LEGACY_FLAGS: [&str; 4] = ["commandport", "statusport", "test", "host"];

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Bad or unknown options; carries clap's message and usage text.
    #[error("{0}")]
    Usage(String),
    /// `--help` or `--version`; carries the text to print.
    #[error("{0}")]
    Info(String),
    #[error("invalid port for --{flag}: {value}")]
    InvalidPort { flag: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub host: String,
    pub command_port: u16,
    pub status_port: u16,
    pub status_interval_secs: u64,
    pub model_tick_ms: u64,
    pub listen_backlog: u32,
    pub self_test: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            command_port: DEFAULT_COMMAND_PORT,
            status_port: DEFAULT_STATUS_PORT,
            status_interval_secs: crate::state::DEFAULT_STATUS_INTERVAL_SECS,
            model_tick_ms: DEFAULT_MODEL_TICK_MS,
            listen_backlog: DEFAULT_LISTEN_BACKLOG,
            self_test: false,
        }
    }
}

impl SimulatorConfig {
    /// Parse process arguments, `args[0]` being the program name.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let args = normalize_legacy_flags(args.into_iter().map(Into::into));

        let matches = app().get_matches_from_safe(args).map_err(|e| match e.kind {
            ClapErrorKind::HelpDisplayed | ClapErrorKind::VersionDisplayed => {
                ConfigError::Info(e.message)
            }
            _ => ConfigError::Usage(e.message),
        })?;

        let mut config = Self::default();
        if let Some(port) = matches.value_of("commandport") {
            config.command_port = parse_port("commandport", port)?;
        }
        if let Some(port) = matches.value_of("statusport") {
            config.status_port = parse_port("statusport", port)?;
        }
        if let Some(host) = matches.value_of("host") {
            config.host = host.to_owned();
        }
        config.self_test = matches.is_present("test");

        Ok(config)
    }

    pub fn command_addr(&self) -> String {
        format!("{}:{}", self.host, self.command_port)
    }

    pub fn status_addr(&self) -> String {
        format!("{}:{}", self.host, self.status_port)
    }

    pub fn model_tick(&self) -> Duration {
        Duration::from_millis(self.model_tick_ms)
    }
}

fn parse_port(flag: &'static str, value: &str) -> Result<u16, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidPort {
        flag,
        value: value.to_owned(),
    })
}

/// Rewrite `-commandport` style options to `--commandport`. Anything else
/// passes through untouched.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| match arg.strip_prefix('-') {
            Some(name) if LEGACY_FLAGS.contains(&name) => format!("--{name}"),
            _ => arg,
        })
        .collect()
}

fn app() -> App<'static, 'static> {
    App::new("atasim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("ATA control interface simulator")
        .arg(
            Arg::with_name("commandport")
                .long("commandport")
                .value_name("PORT")
                .help("Port for the command connection")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("statusport")
                .long("statusport")
                .value_name("PORT")
                .help("Port for the periodic status stream")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("host")
                .long("host")
                .value_name("ADDR")
                .help("Address to listen on")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("test")
                .long("test")
                .help("Run the built-in self-check and exit"),
        )
}
