//! `raw_batches` tree: one row per ingested sensor batch, keyed so a
//! per-user scan yields chronological order.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sled::Tree;

use crate::types::RawBatchRow;

fn batch_key(user_id: &str, fetched_at: DateTime<Utc>) -> Vec<u8> {
    let nanos = fetched_at.timestamp_nanos_opt().unwrap_or(0);
    let mut key = user_id.as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(&nanos.to_be_bytes());
    key
}

pub struct RawBatches {
    tree: Tree,
}

impl RawBatches {
    pub(super) fn new(tree: Tree) -> Self {
        Self { tree }
    }

    pub fn insert(&self, row: &RawBatchRow) -> Result<()> {
        let key = batch_key(&row.user_id, row.fetched_at);
        let value = serde_json::to_vec(row).context("serializing raw batch row")?;
        self.tree.insert(key, value).context("inserting raw batch row")?;
        Ok(())
    }

    /// All unprocessed rows, in insertion order, for the estimator worker
    /// to pick up. Not scoped to a single user — the worker fans out over
    /// every pending batch each tick.
    pub fn unprocessed(&self) -> Result<Vec<(Vec<u8>, RawBatchRow)>> {
        let mut rows = Vec::new();
        for entry in self.tree.iter() {
            let (key, value) = entry.context("scanning raw batches")?;
            let row: RawBatchRow =
                serde_json::from_slice(&value).context("deserializing raw batch row")?;
            if !row.processed {
                rows.push((key.to_vec(), row));
            }
        }
        Ok(rows)
    }

    pub fn mark_processed(&self, key: &[u8]) -> Result<()> {
        if let Some(value) = self.tree.get(key).context("loading raw batch row")? {
            let mut row: RawBatchRow =
                serde_json::from_slice(&value).context("deserializing raw batch row")?;
            row.processed = true;
            let encoded = serde_json::to_vec(&row).context("serializing raw batch row")?;
            self.tree.insert(key, encoded).context("updating raw batch row")?;
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.tree.len()
    }
}
