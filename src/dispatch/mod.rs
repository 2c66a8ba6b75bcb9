//! Dispatch loop: drain the media folder one file at a time through the
//! external postcard tool, pacing attempts off the tool's exit code and the
//! retry deadline embedded in its output.
//!
//! Concurrency contract with the sync loop: only the sync loop creates files
//! in the media folder, only this loop deletes them. No locking; one process
//! instance per spool.

pub mod deadline;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DispatchConfig;

/// Delay after a successful send: one minute past the provider's
/// one-per-day limit.
pub const SUCCESS_DELAY: Duration = Duration::from_secs(24 * 60 * 60 + 60);
/// Delay when the tool failed without a parseable deadline.
pub const UNKNOWN_FAILURE_DELAY: Duration = Duration::from_secs(60 * 60);
/// Delay when the tool could not be launched at all.
pub const LAUNCH_FAILURE_DELAY: Duration = Duration::from_secs(10 * 60);
/// Poll interval while the media folder is empty.
pub const EMPTY_QUEUE_POLL: Duration = Duration::from_secs(60);

/// Result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed {
        deadline: Option<DateTime<FixedOffset>>,
    },
    LaunchFailed,
}

/// Delay until the next attempt. Pure so the schedule is testable without
/// running the loop; a past deadline clamps to zero.
pub fn next_delay(outcome: &DispatchOutcome, now: DateTime<Local>) -> Duration {
    match outcome {
        DispatchOutcome::Sent => SUCCESS_DELAY,
        DispatchOutcome::Failed {
            deadline: Some(deadline),
        } => deadline
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO),
        DispatchOutcome::Failed { deadline: None } => UNKNOWN_FAILURE_DELAY,
        DispatchOutcome::LaunchFailed => LAUNCH_FAILURE_DELAY,
    }
}

/// File with the oldest last-modified time, ignoring subdirectories.
pub async fn oldest_file(folder: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    let mut oldest: Option<(std::time::SystemTime, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;
        let replace = match &oldest {
            Some((current, _)) => modified < *current,
            None => true,
        };
        if replace {
            oldest = Some((modified, entry.path()));
        }
    }
    Ok(oldest.map(|(_, path)| path))
}

/// Invoke the tool on one file and classify the result. `Command::output`
/// drains stdout and stderr concurrently, so a chatty tool cannot deadlock
/// the pipe.
async fn send_file(config: &DispatchConfig, picture: &Path) -> DispatchOutcome {
    let result = Command::new(&config.command)
        .arg("send")
        .arg("--config")
        .arg(&config.tool_config)
        .arg("--picture")
        .arg(picture)
        .output()
        .await;

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            error!(picture = %picture.display(), "failed to launch {}: {e}", config.command);
            return DispatchOutcome::LaunchFailed;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    info!(
        picture = %picture.display(),
        exit = ?output.status.code(),
        "tool output: {}",
        stdout.trim_end()
    );

    if output.status.success() {
        DispatchOutcome::Sent
    } else {
        DispatchOutcome::Failed {
            deadline: deadline::extract(&stdout),
        }
    }
}

/// One dispatch iteration: pick the oldest file, attempt a send, delete on
/// success, and return the delay until the next attempt.
pub async fn dispatch_once(config: &DispatchConfig) -> Duration {
    let picture = match oldest_file(&config.media_folder).await {
        Ok(Some(path)) => path,
        Ok(None) => {
            debug!("media folder empty, nothing to dispatch");
            return EMPTY_QUEUE_POLL;
        }
        Err(e) => {
            warn!(
                folder = %config.media_folder.display(),
                "cannot list media folder: {e}"
            );
            return EMPTY_QUEUE_POLL;
        }
    };

    let outcome = send_file(config, &picture).await;
    match &outcome {
        DispatchOutcome::Sent => {
            info!(picture = %picture.display(), "card sent successfully");
            if let Err(e) = tokio::fs::remove_file(&picture).await {
                warn!(picture = %picture.display(), "failed to delete sent file: {e}");
            }
        }
        DispatchOutcome::Failed {
            deadline: Some(deadline),
        } => {
            error!("send failed, provider allows next attempt at {deadline}");
        }
        DispatchOutcome::Failed { deadline: None } => {
            error!(
                "send failed with no parseable deadline, retrying in {}s",
                UNKNOWN_FAILURE_DELAY.as_secs()
            );
        }
        DispatchOutcome::LaunchFailed => {}
    }

    next_delay(&outcome, Local::now())
}

/// Run the dispatch loop until shutdown.
pub async fn run_dispatch(config: DispatchConfig, shutdown: CancellationToken) {
    info!(folder = %config.media_folder.display(), "dispatch loop started");
    loop {
        if shutdown.is_cancelled() {
            info!("dispatch loop stopping");
            return;
        }
        let delay = dispatch_once(&config).await;
        debug!(delay_secs = delay.as_secs(), "next dispatch attempt scheduled");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => {
                info!("dispatch loop stopping");
                return;
            }
        }
    }
}
