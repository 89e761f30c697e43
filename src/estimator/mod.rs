//! State estimator worker: on a fixed tick, pulls every unprocessed raw
//! batch, runs it through a `Transform`, and writes one derived state row
//! per batch, publishing a trigger for the intervention selector.
//!
//! A tick-interval task with graceful shutdown via a cancellation token,
//! rather than a push-driven design, since the transform runs against
//! whatever is currently unprocessed rather than reacting to individual
//! bus messages.

mod transform;

pub use transform::{DefaultTransform, DerivedScalars, Transform};

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::bus::{MessageBus, StateEstimateTrigger};
use crate::storage::Warehouse;
use crate::types::StateEstimateRow;

/// Runs the estimator loop until `cancel` fires. Intended to be spawned as
/// its own supervised task from `main`.
pub async fn run(
    warehouse: Arc<Warehouse>,
    bus: Arc<dyn MessageBus<StateEstimateTrigger>>,
    transform: Arc<dyn Transform>,
    tick: Duration,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(tick);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("state estimator shutting down");
                return Ok(());
            }
            _ = interval.tick() => {
                if let Err(e) = run_once(&warehouse, bus.as_ref(), transform.as_ref()).await {
                    tracing::error!(error = %e, "state estimator tick failed");
                }
            }
        }
    }
}

async fn run_once(
    warehouse: &Warehouse,
    bus: &dyn MessageBus<StateEstimateTrigger>,
    transform: &dyn Transform,
) -> anyhow::Result<()> {
    let pending = warehouse.raw_batches.unprocessed()?;
    if pending.is_empty() {
        return Ok(());
    }
    tracing::debug!(count = pending.len(), "processing pending raw batches");

    for (key, row) in pending {
        let derived = transform.estimate(&row.payload);
        let estimate = StateEstimateRow {
            user_id: row.user_id.clone(),
            timestamp: row.fetched_at,
            recovery: derived.recovery,
            readiness: derived.readiness,
            stress: derived.stress,
            fatigue: derived.fatigue,
            trace_id: row.trace_id.clone(),
        };
        warehouse.state_estimates.insert(&estimate)?;
        warehouse.raw_batches.mark_processed(&key)?;

        let trigger = StateEstimateTrigger {
            user_id: row.user_id,
            timestamp: estimate.timestamp,
            trace_id: row.trace_id,
        };
        if let Err(e) = bus.publish(trigger).await {
            tracing::warn!(error = %e, "failed to publish state_estimates trigger");
        }
    }
    Ok(())
}
