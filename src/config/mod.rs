// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::Config;

/// Secret used when `SECRET_KEY` is not provided
pub const DEFAULT_SECRET_KEY: &str = "dev-secret-key-change-in-production";

/// Database used when `DATABASE_URL` is not provided
pub const DEFAULT_DATABASE_URL: &str = "sqlite://todo.db";

/// Prefix for structured environment overrides, e.g. `TODO_SERVER__PORT=8080`
const ENV_PREFIX: &str = "TODO";

impl Config {
    /// Load configuration from the default `config.toml` (optional)
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// `SECRET_KEY` and `DATABASE_URL` take precedence over every other source.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::build(
            config_path,
            std::env::var("SECRET_KEY").ok(),
            std::env::var("DATABASE_URL").ok(),
        )
    }

    fn build(
        config_path: &str,
        secret_key: Option<String>,
        database_url: Option<String>,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.backlog", 128)?
            .set_default("server.shutdown_grace_period", 10)?
            .set_default("database.url", DEFAULT_DATABASE_URL)?
            .set_default("database.max_connections", 5)?
            .set_default("app.secret_key", DEFAULT_SECRET_KEY)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "todo_server")?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_override_option("app.secret_key", secret_key)?
            .set_override_option("database.url", database_url)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// True when the built-in development secret is still in use
    pub fn uses_default_secret(&self) -> bool {
        self.app.secret_key == DEFAULT_SECRET_KEY
    }
}
