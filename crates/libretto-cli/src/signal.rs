//! Interrupt handling.
//!
//! SIGINT and SIGTERM restore every manifest armed in the [`RevertGuard`]
//! and exit with code 130.

use crate::output;
use libretto_manifest::RevertGuard;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Exit code after an interrupt.
pub const INTERRUPTED: u8 = 130;

/// Resolves with the name of the first termination signal received.
///
/// Never resolves when no handler could be installed.
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    () = ctrl_c => "SIGINT",
                    _ = term.recv() => "SIGTERM",
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                ctrl_c.await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        "SIGINT"
    }
}

/// Spawn the task that reverts `guard` and exits on interrupt.
///
/// Abort the returned handle once the command has finished.
pub fn install(guard: RevertGuard) -> JoinHandle<()> {
    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        debug!(signal, "received termination signal");
        match guard.revert() {
            Ok(0) => output::error(&format!("\nInterrupted ({signal})")),
            Ok(restored) => output::error(&format!(
                "\nInterrupted ({signal}), reverted {restored} manifest file(s) to their original content"
            )),
            Err(err) => output::error(&format!(
                "\nInterrupted ({signal}), but reverting the manifest failed: {err}"
            )),
        }
        std::process::exit(i32::from(INTERRUPTED));
    })
}
