//! Progress events emitted while a run executes

use std::path::PathBuf;

/// Run events
#[derive(Debug, Clone)]
pub enum RunEvent {
    ScanCompleted { root: PathBuf, files: usize },
    FileParsed { path: PathBuf, declarations: usize, warnings: usize },
    FileFailed { path: PathBuf, reason: String },
    Assembled { symbols: usize, methods: usize },
    Written { path: PathBuf, bytes: usize },
}

/// Event bus for broadcasting events
pub struct EventBus {
    subscribers: Vec<Box<dyn Fn(&RunEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: Fn(&RunEvent) + Send + Sync + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    pub fn emit(&self, event: RunEvent) {
        for subscriber in &self.subscribers {
            subscriber(&event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
