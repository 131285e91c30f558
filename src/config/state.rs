// Application state module
// Everything a request handler needs, passed explicitly to each one

use super::types::Config;
use crate::templates::Templates;

/// Application state shared by all connections
pub struct AppState<R> {
    pub config: Config,
    pub store: R,
    pub templates: Templates,
}

impl<R> AppState<R> {
    pub const fn new(config: Config, store: R, templates: Templates) -> Self {
        Self {
            config,
            store,
            templates,
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
