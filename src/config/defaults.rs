//! Built-in fallback values, used when neither `SHIFT_CONFIG` nor a config
//! file supplies a setting.

pub const WAREHOUSE_PATH: &str = "./data/warehouse";
pub const BIND_ADDR: &str = "0.0.0.0:8080";
pub const ESTIMATOR_TICK_SECS: u64 = 5;
pub const RATE_LIMIT_WINDOW_SECS: i64 = 30 * 60;
pub const RATE_LIMIT_MAX_INSTANCES: usize = 3;
pub const STRESS_HIGH_THRESHOLD: f64 = 0.7;
pub const STRESS_MEDIUM_THRESHOLD: f64 = 0.3;
pub const ANNOYANCE_RATE_CAP: f64 = 0.9;
pub const SUPPRESSION_SHOWN_COUNT_THRESHOLD: u64 = 5;
pub const SUPPRESSION_ANNOYANCE_THRESHOLD: f64 = 0.7;
pub const ONBOARDING_FLOW_ID: &str = "getting_started";
pub const ONBOARDING_FLOW_VERSION: u32 = 1;
pub const FLOW_REQUESTED_WINDOW_SECS: i64 = 5 * 60;
pub const CATALOG_PATH: &str = "./config/catalog.toml";
