//! Operator controls: the reporter's "stop" action.
//!
//! Ctrl-C is delivered on a background task and published on a
//! `tokio::sync::watch` channel.  The loop polls the receiver once per tick
//! through [`watch_stop`], so the signal is observed at the next tick
//! boundary and never interrupts a send in progress.

use std::future::Future;
use std::io;

use pimon_core::StopSignal;
use tokio::sync::watch;
use tracing::{error, info};

/// Spawns a task that flips the returned channel to `true` on Ctrl-C.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_ctrl_c_watcher() -> watch::Receiver<bool> {
    spawn_stop_watcher(tokio::signal::ctrl_c())
}

/// Spawns a task that flips the returned channel to `true` once `signal`
/// resolves successfully.
///
/// If `signal` fails, no stop is ever requested through this channel.
pub fn spawn_stop_watcher<F>(signal: F) -> watch::Receiver<bool>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                info!("stop requested (Ctrl-C); finishing at the next tick");
                let _ = tx.send(true);
            }
            Err(e) => error!("failed to listen for Ctrl-C: {e}"),
        }
    });
    rx
}

/// Adapts a watch receiver into a [`StopSignal`].
pub fn watch_stop(rx: watch::Receiver<bool>) -> impl StopSignal {
    move || *rx.borrow()
}
