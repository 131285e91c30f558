// Server loop module
// Accepts connections until shutdown, then drains in-flight ones

use hyper_util::server::graceful::GracefulShutdown;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;
use crate::store::TodoRepository;

/// Accept connections until `shutdown` is notified.
///
/// After the signal the listener is dropped, so no new connections are
/// accepted. Open connections are told to shut down gracefully: idle
/// keep-alive ones close immediately, busy ones finish their current request
/// within the configured grace period. Must run inside a `LocalSet`.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop<R: TodoRepository>(
    listener: TcpListener,
    state: Arc<AppState<R>>,
    shutdown: Arc<Notify>,
) {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, &graceful);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = shutdown.notified() => {
                break;
            }
        }
    }

    drop(listener);

    let grace = state.config.server.shutdown_grace_period;
    logger::log_shutdown_started(active_connections.load(Ordering::SeqCst), grace);
    let remaining =
        drain_connections(graceful, &active_connections, Duration::from_secs(grace)).await;
    logger::log_shutdown_complete(remaining);
}

/// Signal every watched connection and wait until all have closed or `grace`
/// elapses. Returns the number still open.
async fn drain_connections(
    graceful: GracefulShutdown,
    active: &AtomicUsize,
    grace: Duration,
) -> usize {
    match tokio::time::timeout(grace, graceful.shutdown()).await {
        Ok(()) => 0,
        Err(_) => active.load(Ordering::SeqCst),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_listener;
    use crate::store::SqliteStore;
    use crate::templates::Templates;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_drain_returns_immediately_when_idle() {
        let active = AtomicUsize::new(0);
        let started = std::time::Instant::now();
        let remaining =
            drain_connections(GracefulShutdown::new(), &active, Duration::from_secs(5)).await;
        assert_eq!(remaining, 0);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_grace() {
        let active = AtomicUsize::new(2);
        let graceful = GracefulShutdown::new();
        // A registered watcher that never closes
        let _watcher = graceful.watcher();
        let remaining = drain_connections(graceful, &active, Duration::from_millis(120)).await;
        assert_eq!(remaining, 2);
    }

    #[tokio::test]
    async fn test_serves_then_shuts_down() {
        let mut config = Config::load_from("does-not-exist/config").unwrap();
        config.logging.access_log = false;
        config.server.shutdown_grace_period = 1;
        let store = SqliteStore::in_memory().await.unwrap();
        let state = Arc::new(AppState::new(config, store, Templates::new().unwrap()));

        let listener = create_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    state,
                    Arc::clone(&shutdown),
                ));

                let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
                client
                    .write_all(b"GET /healthz HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
                    .await
                    .unwrap();
                let mut response = String::new();
                client.read_to_string(&mut response).await.unwrap();
                assert!(response.starts_with("HTTP/1.1 200"));
                assert!(response.ends_with("ok"));

                shutdown.notify_one();
                server.await.unwrap();
            })
            .await;
    }
    #[tokio::test]
    async fn test_idle_keep_alive_does_not_delay_shutdown() {
        let mut config = Config::load_from("does-not-exist/config").unwrap();
        config.logging.access_log = false;
        config.server.shutdown_grace_period = 5;
        let store = SqliteStore::in_memory().await.unwrap();
        let state = Arc::new(AppState::new(config, store, Templates::new().unwrap()));

        let listener = create_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    state,
                    Arc::clone(&shutdown),
                ));

                // Keep-alive request: the connection stays open afterwards
                let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
                client
                    .write_all(b"GET /healthz HTTP/1.1\r\nHost: test\r\n\r\n")
                    .await
                    .unwrap();
                let mut response = Vec::new();
                let mut buf = [0u8; 1024];
                while !response.ends_with(b"\r\n\r\nok") {
                    let n = client.read(&mut buf).await.unwrap();
                    assert!(n > 0, "connection closed before the response");
                    response.extend_from_slice(&buf[..n]);
                }
                assert!(response.starts_with(b"HTTP/1.1 200"));

                shutdown.notify_one();
                tokio::time::timeout(Duration::from_secs(2), server)
                    .await
                    .expect("shutdown waited on an idle connection")
                    .unwrap();

                let n = client.read(&mut buf).await.unwrap();
                assert_eq!(n, 0);
            })
            .await;
    }
}
