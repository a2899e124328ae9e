mod cli;
mod commands;

use crate::cli::{
    Cli,
    Commands,
};
use clap::Parser;
use color_eyre::{
    Result,
    eyre::Report,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install()?;

    let cli = Cli::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(cli.args.log_level.into())
        .from_env_lossy();
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            ctrl_c.cancel();
        }
    });

    let value = async {
        let value = match &cli.command {
            Commands::Dispatch(args) => commands::dispatch(&cli.args, args).await?,
            Commands::Relay(args) => commands::relay(&cli.args, args, &cancel).await?,
            Commands::Sign(args) => commands::sign(&cli.args, args)?,
            Commands::Address => commands::address(&cli.args)?,
        };
        Ok::<_, Report>(value)
    }
    .await?;

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
