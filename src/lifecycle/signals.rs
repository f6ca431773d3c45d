//! OS signal handling.
//!
//! Only the interrupt signal (SIGINT / Ctrl+C) is intercepted. SIGTERM,
//! SIGQUIT and friends keep their default disposition and end the process
//! without a drain.

use std::io;
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

/// Install the interrupt handler and forward interrupts to `shutdown`.
///
/// The handler is registered before this returns, so a failure is reported
/// as a startup error rather than discovered at shutdown time. Interrupts
/// after the first are logged and ignored.
pub fn install_interrupt_handler(shutdown: Shutdown) -> io::Result<JoinHandle<()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupts = signal(SignalKind::interrupt())?;
        Ok(tokio::spawn(async move {
            while interrupts.recv().await.is_some() {
                on_interrupt(&shutdown);
            }
        }))
    }

    #[cfg(not(unix))]
    {
        Ok(tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Interrupt handler failed");
                    return;
                }
                on_interrupt(&shutdown);
            }
        }))
    }
}

fn on_interrupt(shutdown: &Shutdown) {
    if shutdown.trigger() {
        tracing::info!("Interrupt received, starting graceful shutdown");
    } else {
        tracing::info!("Interrupt received while already shutting down, ignoring");
    }
}
