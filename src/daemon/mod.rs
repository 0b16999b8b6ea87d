//! The bell daemon.
//!
//! This module contains the daemon functionality:
//! - `bell`: the blocking bell loop, its throttle and counters
//! - `ipc`: the control socket that turns `ring` requests into bells
//!
//! The bell loop runs on its own thread. The async side (control socket
//! and signals) only ever hands it notifications through a one-slot
//! channel, so the loop owns the beep and the throttle exclusively.

pub mod bell;
pub mod ipc;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn, Span};

use crate::beep::Beep;
use crate::playback::{DefaultBackend, PcmBackend};
use crate::types::BellConfig;

pub use bell::{
    bell_channel, notify, Bell, BellDaemon, BellSource, BellStats, BellStatsSnapshot, Notify,
    Throttle,
};
pub use ipc::{default_socket_path, IpcServer, RequestHandler};

/// Runs the daemon on the default output device until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the beep cannot be prepared or the control socket
/// cannot be bound.
pub async fn run(config: BellConfig, socket_path: &Path) -> Result<()> {
    let snapshot = serve(&config, socket_path, DefaultBackend::new(), shutdown_signal()).await?;
    info!(
        "Stopped after {} rings ({} beeps, {} failures, {} coalesced)",
        snapshot.rings, snapshot.beeps, snapshot.failures, snapshot.coalesced
    );
    Ok(())
}

/// Runs the daemon with `backend` until `shutdown` completes.
///
/// Bells come from `ring` requests on the control socket and from SIGUSR1.
/// On shutdown the bell loop finishes any beep in flight, frees the beep
/// and the final counters are returned.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the beep cannot be
/// prepared, the control socket cannot be bound or the bell thread dies.
pub async fn serve<B, F>(
    config: &BellConfig,
    socket_path: &Path,
    backend: B,
    shutdown: F,
) -> Result<BellStatsSnapshot>
where
    B: PcmBackend + Send + 'static,
    F: Future<Output = ()>,
{
    config.validate().map_err(|e| anyhow!(e))?;

    let beep = Beep::prepare(&config.mode)
        .with_context(|| format!("Cannot prepare the {}", config.mode.label()))?;
    let mut usr1 =
        signal(SignalKind::user_defined1()).context("Failed to install the SIGUSR1 handler")?;
    let server = IpcServer::new(socket_path)?;
    info!("Listening on {}", server.socket_path().display());

    let stats = Arc::new(BellStats::new());
    let (bell_tx, bell_rx) = bell_channel();
    let handler = Arc::new(RequestHandler::new(
        bell_tx.clone(),
        Arc::clone(&stats),
        config.mode.label(),
        config.throttle_ms,
    ));

    let mut daemon =
        BellDaemon::new(beep, backend, config.throttle_ms).with_stats(Arc::clone(&stats));
    let test_bell = config.test_bell;
    let span = Span::current();
    let worker = thread::Builder::new()
        .name("bell".to_string())
        .spawn(move || {
            let _entered = span.enter();
            if test_bell {
                daemon.test_bell();
            }
            daemon.run(bell_rx);
        })
        .context("Failed to start the bell thread")?;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Err(e) = ipc::serve_connection(stream, handler).await {
                            debug!("IPC request failed: {:#}", e);
                        }
                    });
                }
                Err(e) => warn!("{:#}", e),
            },
            Some(()) = usr1.recv() => {
                if notify(&bell_tx, &stats) == Notify::Closed {
                    warn!("The bell thread has stopped");
                    break;
                }
            }
            () = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    drop(server);
    drop(handler);
    drop(bell_tx);

    tokio::task::spawn_blocking(move || worker.join())
        .await
        .context("Failed to wait for the bell thread")?
        .map_err(|_| anyhow!("The bell thread panicked"))?;

    Ok(stats.snapshot())
}

/// Completes on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install the SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        () = terminate => {}
    }
}
