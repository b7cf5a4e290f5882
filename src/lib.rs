//! Augur - multi-source market analysis server

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

use config::Config;
use services::Analyzer;
use std::sync::Arc;

// Re-export commonly used types
pub use types::*;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn new(config: Arc<Config>, analyzer: Arc<Analyzer>) -> Self {
        Self { config, analyzer }
    }
}
