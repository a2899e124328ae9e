use std::{
    path::PathBuf,
    time::Duration,
};

use clap::{
    Args,
    Parser,
    Subcommand,
};
use color_eyre::{
    Result,
    eyre::{
        WrapErr,
        eyre,
    },
};
use pocket_relay_client::{
    DispatcherConfig,
    Ed25519Signer,
    RetryPolicy,
    config::DEFAULT_RETRIES,
};
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pocket-relay",
    version,
    about = "Dispatch sessions and send relays to a Pocket network"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    #[command(flatten)]
    pub args: GlobalArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Request the current session of an application
    Dispatch(DispatchArgs),
    /// Send a relay through a session node
    Relay(RelayArgs),
    /// Sign a hex payload with the configured key
    Sign(SignArgs),
    /// Print the address and public key of the configured key
    Address,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Default node URL
    #[arg(
        long,
        env = "POCKET_RPC_URL",
        default_value = "http://localhost:8081",
        global = true
    )]
    pub rpc_url: String,
    /// Comma separated dispatcher URLs
    #[arg(long, env = "POCKET_DISPATCHERS", value_delimiter = ',', global = true)]
    pub dispatchers: Vec<String>,
    /// Extra attempts for failed requests
    #[arg(long, env = "POCKET_RETRIES", default_value_t = DEFAULT_RETRIES, global = true)]
    pub retries: u32,
    /// Per request timeout in milliseconds
    #[arg(long, env = "POCKET_TIMEOUT_MS", default_value_t = 5000, global = true)]
    pub timeout_ms: u64,
    /// Client private key, 128 hex characters
    #[arg(long, env = "POCKET_PRIVATE_KEY", hide_env_values = true, global = true)]
    pub private_key: Option<String>,
    /// Log level
    #[arg(long, env = "POCKET_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: LevelFilter,
}

impl GlobalArgs {
    pub fn dispatcher_config(&self) -> Result<DispatcherConfig> {
        let retry = RetryPolicy::with_request_config(
            self.retries,
            Duration::from_millis(self.timeout_ms),
        );
        let config = DispatcherConfig::new(&self.rpc_url)
            .wrap_err("invalid --rpc-url")?
            .with_dispatchers(&self.dispatchers)
            .wrap_err("invalid --dispatchers")?
            .with_retry(retry);
        Ok(config)
    }

    pub fn signer(&self) -> Result<Ed25519Signer> {
        let private_key = self
            .private_key
            .as_deref()
            .ok_or_else(|| eyre!("a private key is required (--private-key or POCKET_PRIVATE_KEY)"))?;
        Ed25519Signer::from_private_key(private_key).wrap_err("invalid private key")
    }
}

#[derive(Args, Debug, Clone)]
pub struct DispatchArgs {
    /// Application public key
    #[arg(long)]
    pub app_pub_key: String,
    /// Chain identifier, e.g. 0021
    #[arg(long)]
    pub chain: String,
    #[arg(long)]
    pub session_height: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct RelayArgs {
    /// Application public key
    #[arg(long)]
    pub app_pub_key: String,
    /// Chain identifier, e.g. 0021
    #[arg(long)]
    pub chain: String,
    /// JSON file holding the application authentication token
    #[arg(long)]
    pub aat_file: PathBuf,
    /// Request body sent to the chain
    #[arg(long)]
    pub data: String,
    #[arg(long, default_value = "POST")]
    pub method: String,
    #[arg(long, default_value = "")]
    pub path: String,
    /// Header forwarded to the chain, as name=value. Repeatable.
    #[arg(long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
    /// Public key of the session node to use instead of a random one
    #[arg(long)]
    pub node_pub_key: Option<String>,
    #[arg(long)]
    pub session_height: Option<u64>,
    /// Accept sessions without a header
    #[arg(long)]
    pub allow_missing_header: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SignArgs {
    /// Hex encoded payload
    #[arg(long)]
    pub payload: String,
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
