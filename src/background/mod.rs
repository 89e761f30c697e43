//! Background maintenance task: periodic bookkeeping that doesn't belong
//! on the request path or in either worker loop — currently just emits
//! warehouse size metrics so an operator can see the pipeline is making
//! progress (unprocessed batches draining, dedup locks accumulating).

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::storage::Warehouse;

pub async fn run(warehouse: Arc<Warehouse>, tick: Duration, cancel: CancellationToken) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(tick);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("background maintenance shutting down");
                return Ok(());
            }
            _ = interval.tick() => {
                report_stats(&warehouse);
            }
        }
    }
}

fn report_stats(warehouse: &Warehouse) {
    let pending = warehouse.raw_batches.unprocessed().map(|rows| rows.len()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to count pending raw batches");
        0
    });
    tracing::info!(pending_batches = pending, "warehouse maintenance tick");
}
