use crate::prelude::ProgressObserver;
use std::sync::Mutex;

/// Collects progress messages and counts warnings among them.
pub struct ProgressRecorder {
    inner: Mutex<Progress>,
}

#[derive(Default)]
struct Progress {
    messages: Vec<String>,
    warnings: usize,
}

impl ProgressRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Progress::default()),
        }
    }

    pub fn record(&self, message: &str) {
        if let Ok(mut progress) = self.inner.lock() {
            if message.starts_with("Warning") {
                progress.warnings += 1;
            }
            progress.messages.push(message.to_string());
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        if let Ok(progress) = self.inner.lock() {
            progress.messages.clone()
        } else {
            Vec::new()
        }
    }

    pub fn warning_count(&self) -> usize {
        self.inner.lock().map(|progress| progress.warnings).unwrap_or(0)
    }
}

impl Default for ProgressRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ProgressRecorder {
    fn notify(&self, status: &str) {
        self.record(status);
    }
}
