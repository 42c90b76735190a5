//! Engine Configuration Module
//!
//! Every regulatory parameter (input bounds, penalty catalog, band
//! thresholds, guidance text) is loaded from TOML so sites can tune the
//! engine without a rebuild.
//!
//! ## Loading Order
//!
//! 1. `HEATSTRESS_CONFIG` environment variable (path to TOML file)
//! 2. `heatstress.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Components take their config explicitly. The global is for the binary
//! and for callers that want one process-wide configuration:
//!
//! ```ignore
//! // In main():
//! config::init(EngineConfig::load()?);
//!
//! // Anywhere else:
//! let session = AssessmentSession::new(Arc::new(config::get().clone()))?;
//! ```

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;

use std::sync::OnceLock;

/// Global engine configuration, initialized once at startup.
static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global engine configuration.
///
/// A second call is ignored with a warning.
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global engine configuration.
///
/// Panics if `init()` has not been called: a missing config is a startup bug.
pub fn get() -> &'static EngineConfig {
    ENGINE_CONFIG
        .get()
        .expect("config::get() called before config::init()")
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    ENGINE_CONFIG.get().is_some()
}
