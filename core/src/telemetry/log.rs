use crate::prelude::ProgressObserver;
use log::{info, warn};

/// Forwards experiment progress to the `log` facade.
pub struct LogManager {
    target: String,
}

impl LogManager {
    pub fn new() -> Self {
        Self::with_target("experiment")
    }

    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn record(&self, message: &str) {
        if message.starts_with("Warning") {
            warn!(target: "sensorcore::progress", "[{}] {}", self.target, message);
        } else {
            info!(target: "sensorcore::progress", "[{}] {}", self.target, message);
        }
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for LogManager {
    fn notify(&self, status: &str) {
        self.record(status);
    }
}
