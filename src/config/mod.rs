//! Pipeline Configuration Module
//!
//! Provides pipeline-wide configuration loaded from a TOML file, replacing
//! hardcoded thresholds (stress bucketing, rate limiting, onboarding flow
//! id) with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `SHIFT_CONFIG` environment variable (path to TOML file)
//! 2. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(PipelineConfig::load()?);
//!
//! // Anywhere in the codebase:
//! let threshold = config::get().stress_high_threshold;
//! ```

pub mod defaults;
mod settings;

pub use settings::PipelineConfig;

use std::sync::OnceLock;

/// Global pipeline configuration, initialized once at startup.
static PIPELINE_CONFIG: OnceLock<PipelineConfig> = OnceLock::new();

/// Initialize the global pipeline configuration.
///
/// Must be called exactly once before any calls to `get()`.
/// Panics if called more than once.
pub fn init(config: PipelineConfig) {
    if PIPELINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global pipeline configuration.
///
/// Panics if `init()` has not been called. This is by design — a missing
/// config is a fatal startup error, not a recoverable condition.
pub fn get() -> &'static PipelineConfig {
    PIPELINE_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Check whether the config has been initialized.
///
/// Useful for tests and optional config paths.
pub fn is_initialized() -> bool {
    PIPELINE_CONFIG.get().is_some()
}

#[cfg(test)]
pub fn init_for_test() {
    let _ = PIPELINE_CONFIG.set(PipelineConfig::default());
}
