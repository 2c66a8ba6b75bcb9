//! photocardd — mirrors Google Photos albums into a local spool directory
//! and drains that spool, one file per day, through an external
//! postcard-sending CLI.
//!
//! Two independent loops share nothing but the filesystem: the sync loop
//! writes media files and the synced-ID ledger, the dispatch loop deletes
//! media files after a confirmed send. The dispatch schedule follows the
//! provider's rate limit, parsed out of the tool's own output.

#![warn(clippy::all)]

mod cli;
mod config;
mod dispatch;
mod gphotos;
mod ledger;
mod retry;
mod shutdown;
mod sync;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::EnvFilter;

use gphotos::GPhotosClient;

/// Sync side of the daemon. Missing configuration disables the loop instead
/// of failing the process; anything else that escapes is fatal.
async fn sync_entry(shutdown: CancellationToken) -> anyhow::Result<()> {
    let config = match config::SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("sync loop disabled: {e}");
            return Ok(());
        }
    };
    sync::run_sync(config, shutdown).await
}

/// Dispatch side of the daemon; only needs the media folder path.
async fn dispatch_entry(shutdown: CancellationToken) -> anyhow::Result<()> {
    let config = match config::DispatchConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("dispatch loop disabled: {e}");
            return Ok(());
        }
    };
    dispatch::run_dispatch(config, shutdown).await;
    Ok(())
}

/// `--auth-only` / `--list-albums`: one-shot operator utilities. Here a
/// missing variable is a hard error since the operator asked for the action.
async fn run_utility(cli: &cli::Cli) -> anyhow::Result<()> {
    let config = config::SyncConfig::from_env()?;
    let http = reqwest::Client::new();
    let token = gphotos::auth::authenticate(
        &http,
        &config.client_id,
        &config.client_secret,
        &config.token_store,
    )
    .await?;

    if cli.auth_only {
        tracing::info!(user = %config.user, "authentication successful");
        return Ok(());
    }

    let client = GPhotosClient::new(http, token);
    println!("Albums:");
    for album in client.albums().await? {
        println!("  {}", album.title);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    if cli.auth_only || cli.list_albums {
        return run_utility(&cli).await;
    }

    if cli.once {
        let config = config::SyncConfig::from_env()?;
        return sync::run_once(config).await;
    }

    let shutdown = shutdown::install_signal_handler();

    // Both loops run to process exit; a fatal sync error (authentication)
    // ends the whole process, while a loop without its config just logs and
    // returns immediately.
    tokio::try_join!(sync_entry(shutdown.clone()), dispatch_entry(shutdown))?;

    Ok(())
}
