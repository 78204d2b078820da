//! # OS termination signals.
//!
//! [`wait_for_shutdown_signal`] completes on the first of:
//! - `SIGINT` (Ctrl-C in a terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes and by the stop ladder)
//! - `SIGQUIT`
//!
//! Used by `Supervisor::run_until_signal` and by the worker entrypoint.

use tokio::signal::unix::{signal, SignalKind};

/// Waits for a termination signal.
///
/// Each call installs its own listeners. Returns `Err` if registration fails.
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}
