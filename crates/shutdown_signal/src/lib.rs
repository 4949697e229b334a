use std::pin::Pin;

use cfg_if::cfg_if;
use futures::{future::Shared, FutureExt};
use std::future::Future;
use tokio::select;
use tracing::info;

cfg_if! {
    if #[cfg(windows)] {
        use tokio::signal::windows::*;

        async fn raw_shutdown_signal() {
            let (Ok(mut ctrl_c), Ok(mut ctrl_close), Ok(mut ctrl_shutdown)) =
                (ctrl_c(), ctrl_close(), ctrl_shutdown())
            else {
                futures::future::pending::<()>().await;
                return;
            };
            select! {
                _ = ctrl_c.recv() => (),
                _ = ctrl_close.recv() => (),
                _ = ctrl_shutdown.recv() => (),
            }
        }
    } else if #[cfg(unix)] {
        use tokio::signal::unix::*;

        async fn unix_shutdown_signal(signal_kind: SignalKind) {
            match signal(signal_kind) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                // Never resolve if the handler cannot be installed
                Err(_) => futures::future::pending::<()>().await,
            }
        }

        async fn raw_shutdown_signal() {
            select! {
                _ = unix_shutdown_signal(SignalKind::interrupt()) => (),
                _ = unix_shutdown_signal(SignalKind::terminate()) => (),
                _ = unix_shutdown_signal(SignalKind::hangup()) => (),
            };
        }
    } else {
        compile_error!("Your OS does not support shutdown signal ! Are you targeting wasm ?");
    }
}

/// Resolves once, every clone resolves together.
pub type ShutdownSignal = Shared<Pin<Box<dyn Future<Output = ()> + Send>>>;

/// Resolves on SIGINT, SIGTERM or SIGHUP (ctrl-c and console close on windows).
pub fn shutdown_signal() -> ShutdownSignal {
    async {
        raw_shutdown_signal().await;
        info!("Shutdown signal detected. Attempting graceful shutdown...");
    }
    .boxed()
    .shared()
}

/// Builds a signal from any future, e.g. a `tokio::sync::oneshot` receiver.
pub fn shutdown_signal_from<F>(fut: F) -> ShutdownSignal
where
    F: Future + Send + 'static,
{
    async move {
        fut.await;
        info!("Shutdown requested. Attempting graceful shutdown...");
    }
    .boxed()
    .shared()
}
