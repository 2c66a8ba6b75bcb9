//! Graceful shutdown: SIGINT / SIGTERM / SIGHUP cancel a shared token so
//! both loops exit at their next suspension point. A second signal
//! force-exits.

use tokio_util::sync::CancellationToken;

pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();

    let handler_token = token.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let (mut sigterm, mut sighup) = {
            use tokio::signal::unix::{signal, SignalKind};
            (
                signal(SignalKind::terminate()).expect("failed to register SIGTERM handler"),
                signal(SignalKind::hangup()).expect("failed to register SIGHUP handler"),
            )
        };

        let mut signals_seen = 0u32;
        loop {
            #[cfg(unix)]
            {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                    _ = sighup.recv() => {}
                }
            }

            #[cfg(not(unix))]
            {
                tokio::signal::ctrl_c()
                    .await
                    .expect("failed to listen for Ctrl+C");
            }

            signals_seen += 1;
            if signals_seen == 1 {
                tracing::info!("shutdown requested, loops will stop at their next wake-up");
                tracing::info!("press Ctrl+C again to force exit");
                handler_token.cancel();
            } else {
                tracing::warn!("force exit");
                std::process::exit(130);
            }
        }
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_uncancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[tokio::test]
    async fn install_returns_live_token() {
        // Signal delivery itself can't be exercised safely in a shared test
        // binary; just verify the handler arms without cancelling.
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
    }
}
