//! Sync loop: mirror the configured albums into the media folder, recording
//! every downloaded item ID in the ledger.
//!
//! Per-item and per-album failures are logged and skipped; an item is only
//! recorded after its bytes hit disk, so failed downloads are retried on a
//! later pass (at-least-once). Authentication failure is fatal and takes the
//! whole process down.

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Context;
use futures_util::{pin_mut, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::gphotos::{auth, Album, GPhotosClient, GPhotosError, MediaItem};
use crate::ledger::Ledger;

/// What `save_item` did with a downloaded payload.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SaveOutcome {
    /// Empty payload: not saved, not recorded, retried next pass.
    EmptyPayload,
    Saved(PathBuf),
}

/// Write an item's bytes into the media folder and record its ID, in that
/// order. Same-named files are overwritten (distinct IDs sharing a filename
/// are a known, undeduplicated edge case).
pub(crate) async fn save_item(
    media_folder: &Path,
    ledger: &mut Ledger,
    item: &MediaItem,
    bytes: &[u8],
) -> anyhow::Result<SaveOutcome> {
    if bytes.is_empty() {
        return Ok(SaveOutcome::EmptyPayload);
    }

    // Use only the final path component so a hostile filename can't escape
    // the media folder.
    let filename = Path::new(&item.filename)
        .file_name()
        .map(|f| f.to_os_string())
        .unwrap_or_else(|| item.id.clone().into());
    let path = media_folder.join(filename);

    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    ledger.record(&item.id)?;
    Ok(SaveOutcome::Saved(path))
}

/// Handle one enumerated item: skip ledger hits without downloading,
/// otherwise download and save. Download failures are logged and skipped so
/// the item is retried on a later pass. Generic over the downloader so the
/// skip/record behavior is testable without a remote service.
pub(crate) async fn process_item<F, Fut>(
    media_folder: &Path,
    ledger: &mut Ledger,
    item: &MediaItem,
    download: F,
) -> anyhow::Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<u8>, GPhotosError>>,
{
    if ledger.contains(&item.id) {
        warn!(item = %item.filename, "item already synced");
        return Ok(());
    }

    info!(item = %item.filename, "downloading");
    let bytes = match download().await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(item = %item.filename, "download failed, will retry next pass: {e}");
            return Ok(());
        }
    };

    match save_item(media_folder, ledger, item, &bytes).await? {
        SaveOutcome::EmptyPayload => {
            error!(item = %item.filename, "downloaded item has 0 bytes, skip saving it");
        }
        SaveOutcome::Saved(path) => {
            info!(item = %item.filename, path = %path.display(), "saved");
        }
    }
    Ok(())
}

async fn resolve_album(client: &GPhotosClient, title: &str) -> Option<Album> {
    match client.album_by_title(title).await {
        Ok(Some(album)) => Some(album),
        Ok(None) => {
            warn!(album = title, "album not found, creating it");
            match client.create_album(title).await {
                Ok(album) => Some(album),
                Err(e) => {
                    warn!(album = title, "could not create album, skipping this pass: {e}");
                    None
                }
            }
        }
        Err(e) => {
            error!(album = title, "album lookup failed, skipping this pass: {e}");
            None
        }
    }
}

async fn sync_album(
    client: &GPhotosClient,
    album: &Album,
    config: &SyncConfig,
    ledger: &mut Ledger,
) -> anyhow::Result<()> {
    let items = client.media_items(&album.id);
    pin_mut!(items);

    while let Some(item) = items.next().await {
        // A broken page fetch aborts this album, not the pass.
        let item = item?;
        process_item(&config.media_folder, ledger, &item, || client.download(&item)).await?;
    }
    Ok(())
}

/// One full pass over the configured albums. Returns `Err` only for fatal
/// conditions (authentication).
async fn run_pass(
    http: &reqwest::Client,
    config: &SyncConfig,
    ledger: &mut Ledger,
) -> anyhow::Result<()> {
    let token = auth::authenticate(
        http,
        &config.client_id,
        &config.client_secret,
        &config.token_store,
    )
    .await
    .context("authentication failed")?;

    let client = GPhotosClient::new(http.clone(), token);

    for title in &config.albums {
        let Some(album) = resolve_album(&client, title).await else {
            continue;
        };
        if let Err(e) = sync_album(&client, &album, config, ledger).await {
            error!(album = title, "album sync aborted: {e}");
        }
    }
    Ok(())
}

/// Ledger and HTTP client prepared once, reused across passes.
struct SyncContext {
    config: SyncConfig,
    ledger: Ledger,
    http: reqwest::Client,
}

impl SyncContext {
    fn prepare(config: SyncConfig) -> anyhow::Result<Self> {
        let ledger = Ledger::load(&config.ledger_path)?;
        info!(
            ids = ledger.len(),
            ledger = %config.ledger_path.display(),
            "ledger loaded"
        );

        if !config.media_folder.exists() {
            info!(folder = %config.media_folder.display(), "media folder missing, creating it");
            std::fs::create_dir_all(&config.media_folder)?;
        }

        Ok(Self {
            config,
            ledger,
            http: reqwest::Client::new(),
        })
    }

    async fn pass(&mut self) -> anyhow::Result<()> {
        run_pass(&self.http, &self.config, &mut self.ledger).await
    }
}

/// Single pass, for `--once`.
pub async fn run_once(config: SyncConfig) -> anyhow::Result<()> {
    SyncContext::prepare(config)?.pass().await
}

/// Run the sync loop until shutdown. Errors returned here are fatal for the
/// whole process.
pub async fn run_sync(config: SyncConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let mut cx = SyncContext::prepare(config)?;

    loop {
        if shutdown.is_cancelled() {
            info!("sync loop stopping");
            return Ok(());
        }

        cx.pass().await?;

        info!(
            minutes = cx.config.sync_interval.as_secs() / 60,
            "waiting until next sync"
        );
        tokio::select! {
            _ = tokio::time::sleep(cx.config.sync_interval) => {}
            _ = shutdown.cancelled() => {
                info!("sync loop stopping");
                return Ok(());
            }
        }
    }
}
