mod commands;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use lnurl_client::{LnurlClient, LnurlConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{Command, execute_command};

#[derive(Parser)]
#[command(version, about = "Resolve and use LNURL endpoints", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Args, Debug, Serialize, Deserialize)]
struct Settings {
    /// Path to an optional TOML configuration file.
    #[arg(long, default_value = "lnurl.toml")]
    pub config: PathBuf,

    /// Loglevel to use. Can be used to filter logs through the env filter
    /// format.
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Resolve identifiers with the strict scheme and domain policy.
    #[arg(long)]
    pub strict: bool,

    /// Timeout in seconds for every request.
    #[arg(long, default_value_t = 5)]
    pub request_timeout_secs: u64,

    /// `User-Agent` header sent with every request.
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Reject URL success actions pointing to another domain than the
    /// callback.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub validate_success_action_url: bool,
}

impl Settings {
    fn lnurl_config(&self) -> LnurlConfig {
        LnurlConfig {
            request_timeout_secs: self.request_timeout_secs,
            user_agent: self.user_agent.clone(),
            strict: self.strict,
            validate_success_action_url: self.validate_success_action_url,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let config_file = std::fs::canonicalize(&cli.settings.config).ok();

    let mut figment = Figment::new().merge(Serialized::defaults(cli.settings));
    if let Some(config_file) = &config_file {
        figment = figment.merge(Toml::file(config_file));
    }
    let settings: Settings = figment.merge(Env::prefixed("LNURL_")).extract()?;

    // Logs go to stderr, stdout is reserved for command output
    tracing_subscriber::registry()
        .with(EnvFilter::new(&settings.log_level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &config_file {
        Some(config_file) => debug!("Using config file: {}", config_file.display()),
        None => debug!("No config file found"),
    }

    let client = LnurlClient::new(settings.lnurl_config());
    execute_command(cli.command, &client).await
}
