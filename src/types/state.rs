//! Derived per-user state, computed by the state estimator from raw
//! sensor batches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw sensor batch as persisted to the warehouse, prior to estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBatchRow {
    pub user_id: String,
    pub fetched_at: DateTime<Utc>,
    pub trace_id: String,
    pub total_samples: usize,
    /// Whether the state estimator has produced a derived row for this
    /// batch yet. The estimator worker polls for `processed == false`.
    pub processed: bool,
    pub payload: crate::types::batch::HealthDataBatch,
}

/// One derived state estimate, the output of the state estimator and the
/// input to the intervention selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEstimateRow {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub recovery: f64,
    pub readiness: f64,
    pub stress: f64,
    pub fatigue: f64,
    pub trace_id: String,
}
