//! Host termination signals to cancellation broadcast.
//!
//! Handlers are registered eagerly by [`SignalBridge::install`] so no signal
//! arriving between install and spawn is lost. The bridge fires once: the
//! first of SIGINT, SIGTERM, SIGHUP or SIGQUIT (Ctrl-C elsewhere) cancels the
//! shared [`CancelHandle`], then the bridge exits.

use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::execute::CancelHandle;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Registered termination signal listeners.
pub struct SignalBridge {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
    #[cfg(unix)]
    hangup: Signal,
    #[cfg(unix)]
    quit: Signal,
}

impl SignalBridge {
    /// Register handlers for the termination signal set.
    ///
    /// Must be called from within a Tokio runtime.
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).map_err(Error::Signal)?,
            terminate: signal(SignalKind::terminate()).map_err(Error::Signal)?,
            hangup: signal(SignalKind::hangup()).map_err(Error::Signal)?,
            quit: signal(SignalKind::quit()).map_err(Error::Signal)?,
        })
    }

    /// Register the Ctrl-C handler.
    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Wait for the first termination signal and return its name.
    #[cfg(unix)]
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }

    /// Wait for Ctrl-C.
    #[cfg(not(unix))]
    pub async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        "CTRL-C"
    }

    /// Spawn the bridge: the first signal cancels `cancel`, then the task ends.
    pub fn spawn(self, cancel: CancelHandle) -> JoinHandle<()> {
        tokio::spawn(async move {
            let name = self.recv().await;
            tracing::warn!(signal = name, "termination signal received, cancelling running tasks");
            cancel.cancel();
        })
    }
}

impl std::fmt::Debug for SignalBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBridge").finish_non_exhaustive()
    }
}
