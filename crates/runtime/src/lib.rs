//! Engine bootstrap: configuration, tracing and the OEE engine façade.

use tracing::Level;

pub mod config;
pub mod engine;
pub mod metrics;

pub use config::EngineConfig;
pub use engine::OeeEngine;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .try_init();
}
