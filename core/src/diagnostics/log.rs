use log::{debug, info, warn};

/// Scoped front end over the `log` macros so every message names the
/// pipeline stage that produced it.
pub struct LogManager {
    scope: &'static str,
}

impl LogManager {
    pub fn scoped(scope: &'static str) -> Self {
        Self { scope }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.scope, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[{}] {}", self.scope, message);
    }

    pub fn caution(&self, message: &str) {
        warn!("[{}] {}", self.scope, message);
    }
}
