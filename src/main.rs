use std::sync::Arc;
use tokio::sync::Notify;

mod config;
mod handler;
mod http;
mod logger;
mod server;
mod store;
mod templates;

use store::SqliteStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional first argument: config file path without extension
    let cfg = match std::env::args().nth(1) {
        Some(path) => config::Config::load_from(&path)?,
        None => config::Config::load()?,
    };
    logger::init(&cfg)?;

    // Create the Tokio runtime, sizing it from the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("Using {workers} worker threads"));
    } else {
        logger::log_info("Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.uses_default_secret() {
        logger::log_warning("SECRET_KEY is not set, using the development default");
    }

    let addr = cfg.get_socket_addr()?;
    let store = SqliteStore::connect(&cfg.database.url, cfg.database.max_connections).await?;
    let templates = templates::Templates::new()?;
    let listener = server::create_listener(addr, cfg.server.backlog)?;

    logger::log_server_start(&listener.local_addr()?, &cfg);

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown));

    let state = Arc::new(config::AppState::new(cfg, store.clone(), templates));

    // Connections are spawned with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(listener, state, shutdown))
        .await;

    store.close().await;
    Ok(())
}
