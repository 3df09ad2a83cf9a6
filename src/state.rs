//! Application state.

use std::sync::Arc;

use crate::analyzer::Analyzer;
use crate::dispatcher::Dispatcher;

/// Read-only handler dependencies, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(analyzer: Analyzer, dispatcher: Dispatcher) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            dispatcher: Arc::new(dispatcher),
        }
    }
}
