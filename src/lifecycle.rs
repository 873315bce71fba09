//! Process lifecycle: serve until a shutdown signal or a panic, then drain.
//!
//! A panic anywhere in the process is fatal. The panic hook raises the
//! [`FatalSignal`], the listener stops accepting, in-flight requests drain and
//! the binary exits with [`EXIT_FATAL`].

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

pub const EXIT_FATAL: i32 = 1;
pub const EXIT_STARTUP: i32 = 2;

/// One-shot, process-wide "something panicked" flag.
#[derive(Clone, Debug)]
pub struct FatalSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for FatalSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl FatalSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`FatalSignal::trigger`] has been called.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|fatal| *fatal).await;
    }
}

/// Log the panic, keep the default hook output, then raise `fatal`.
pub fn install_panic_hook(fatal: FatalSignal) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "panic; shutting down");
        default_hook(info);
        fatal.trigger();
    }));
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Stopped by SIGINT/SIGTERM.
    Clean,
    /// Stopped because a panic raised the fatal signal.
    Fatal,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Clean => 0,
            Outcome::Fatal => EXIT_FATAL,
        }
    }
}

/// Serve `app` with peer addresses attached, until shutdown or a fatal signal.
pub async fn serve(listener: TcpListener, app: Router, fatal: FatalSignal) -> std::io::Result<Outcome> {
    let watcher = fatal.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            tokio::select! {
                () = watcher.wait() => tracing::error!("fatal signal raised; closing listener"),
                () = shutdown_signal() => tracing::info!("shutdown signal received; closing listener"),
            }
        })
        .await?;
    Ok(if fatal.is_triggered() {
        Outcome::Fatal
    } else {
        Outcome::Clean
    })
}

/// SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use std::time::Duration;

    #[tokio::test]
    async fn fatal_signal_stops_the_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let app = Router::new().route("/", get(|| async { "ok" }));
        let fatal = FatalSignal::new();
        let server = tokio::spawn(serve(listener, app, fatal.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        fatal.trigger();

        let outcome = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
        assert_eq!(outcome, Outcome::Fatal);
        assert_eq!(outcome.exit_code(), EXIT_FATAL);
    }

    #[tokio::test]
    async fn wait_returns_after_trigger() {
        let fatal = FatalSignal::new();
        assert!(!fatal.is_triggered());
        let waiter = tokio::spawn({
            let fatal = fatal.clone();
            async move { fatal.wait().await }
        });
        fatal.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(fatal.is_triggered());
    }
}
