//! The `PipelineConfig` struct loaded at startup and held in the global
//! `OnceLock` exposed by `config::{init, get}`.

use serde::Deserialize;

use super::defaults;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub warehouse_path: String,
    pub bind_addr: String,
    pub estimator_tick_secs: u64,
    pub rate_limit_window_secs: i64,
    pub rate_limit_max_instances: usize,
    pub stress_high_threshold: f64,
    pub stress_medium_threshold: f64,
    pub annoyance_rate_cap: f64,
    pub suppression_shown_count_threshold: u64,
    pub suppression_annoyance_threshold: f64,
    pub onboarding_flow_id: String,
    pub onboarding_flow_version: u32,
    pub flow_requested_window_secs: i64,
    pub catalog_path: String,
    /// Path to the push-provider credential file. The credential's
    /// contents are out of scope; only the path is configuration.
    pub push_credential_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            warehouse_path: defaults::WAREHOUSE_PATH.to_string(),
            bind_addr: defaults::BIND_ADDR.to_string(),
            estimator_tick_secs: defaults::ESTIMATOR_TICK_SECS,
            rate_limit_window_secs: defaults::RATE_LIMIT_WINDOW_SECS,
            rate_limit_max_instances: defaults::RATE_LIMIT_MAX_INSTANCES,
            stress_high_threshold: defaults::STRESS_HIGH_THRESHOLD,
            stress_medium_threshold: defaults::STRESS_MEDIUM_THRESHOLD,
            annoyance_rate_cap: defaults::ANNOYANCE_RATE_CAP,
            suppression_shown_count_threshold: defaults::SUPPRESSION_SHOWN_COUNT_THRESHOLD,
            suppression_annoyance_threshold: defaults::SUPPRESSION_ANNOYANCE_THRESHOLD,
            onboarding_flow_id: defaults::ONBOARDING_FLOW_ID.to_string(),
            onboarding_flow_version: defaults::ONBOARDING_FLOW_VERSION,
            flow_requested_window_secs: defaults::FLOW_REQUESTED_WINDOW_SECS,
            catalog_path: defaults::CATALOG_PATH.to_string(),
            push_credential_path: None,
        }
    }
}

impl PipelineConfig {
    /// Loads from `SHIFT_CONFIG` (a path to a TOML file) if set, falling
    /// back to built-in defaults otherwise. A present-but-unreadable or
    /// unparsable file is a startup error, not a silent fallback.
    pub fn load() -> anyhow::Result<Self> {
        use anyhow::Context;

        match std::env::var("SHIFT_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file at {path}"))?;
                let config: PipelineConfig = toml::from_str(&raw)
                    .with_context(|| format!("parsing config file at {path}"))?;
                Ok(config)
            }
            Err(_) => Ok(PipelineConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_builtin_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.bind_addr, defaults::BIND_ADDR);
        assert_eq!(config.rate_limit_max_instances, 3);
    }
}
