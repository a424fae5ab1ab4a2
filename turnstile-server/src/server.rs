// HTTP server: accept loop and graceful shutdown

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::handler::handle_request;
use crate::state::AppState;

/// How long in-flight connections get to finish once shutdown starts.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed accept, e.g. when the process is out of file descriptors.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl Server {
    pub async fn bind(addr: SocketAddr, state: Arc<AppState>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves, then drain open connections.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let graceful = GracefulShutdown::new();
        tokio::pin!(shutdown);

        info!(addr = %self.local_addr()?, "Turnstile listening");

        loop {
            tokio::select! {
                (stream, peer) = accept_next(|| self.listener.accept()) => {
                    let io = TokioIo::new(stream);
                    let state = self.state.clone();

                    let service = service_fn(move |req: Request<IncomingBody>| {
                        let state = state.clone();
                        async move { Ok::<_, Infallible>(handle_request(req, state).await) }
                    });

                    let conn = graceful.watch(http1::Builder::new().serve_connection(io, service));

                    tokio::spawn(async move {
                        if let Err(err) = conn.await {
                            debug!(%peer, error = %err, "Error serving connection");
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, draining connections");
                    break;
                }
            }
        }

        drop(self.listener);

        tokio::select! {
            _ = graceful.shutdown() => info!("All connections closed"),
            _ = tokio::time::sleep(DRAIN_TIMEOUT) => {
                warn!(timeout_secs = DRAIN_TIMEOUT.as_secs(), "Connection drain timed out");
            }
        }

        Ok(())
    }
}

/// Accept the next connection, backing off after each failure.
async fn accept_next<S, F, Fut>(mut accept: F) -> (S, SocketAddr)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<(S, SocketAddr)>>,
{
    loop {
        match accept().await {
            Ok(accepted) => return accepted,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[tokio::test(start_paused = true)]
    async fn test_accept_errors_back_off() {
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let mut outcomes: VecDeque<io::Result<(u8, SocketAddr)>> = VecDeque::from([
            Err(io::Error::other("too many open files")),
            Err(io::Error::other("too many open files")),
            Ok((7, peer)),
        ]);
        let mut calls = 0;

        let started = tokio::time::Instant::now();
        let accepted = accept_next(|| {
            calls += 1;
            let next = outcomes.pop_front().unwrap();
            async move { next }
        })
        .await;

        assert_eq!(accepted, (7, peer));
        assert_eq!(calls, 3);
        assert_eq!(started.elapsed(), ACCEPT_ERROR_BACKOFF * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_success_does_not_wait() {
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();

        let started = tokio::time::Instant::now();
        let accepted = accept_next(|| async move { Ok::<_, io::Error>(((), peer)) }).await;

        assert_eq!(accepted, ((), peer));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
