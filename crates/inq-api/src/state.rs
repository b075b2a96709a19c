use inq_engine::{Dispatcher, ThreatStore};
use std::sync::Arc;

// App state - shared across handlers
pub struct AppState {
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Threats table, when one is configured
    pub fn store(&self) -> Option<&Arc<dyn ThreatStore>> {
        self.dispatcher.fallback().map(|f| f.store())
    }
}
