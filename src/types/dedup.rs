//! Dedup-lock records: claimed before a batch is published, never rolled
//! back if the downstream publish fails (duplicate delivery is cheap,
//! a lost claim is not).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupLock {
    pub user_id: String,
    pub fetched_at: DateTime<Utc>,
    pub trace_id: String,
    pub total_samples: usize,
    pub claimed_at: DateTime<Utc>,
}
