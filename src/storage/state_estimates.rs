//! `state_estimates` tree: latest-per-user derived state, keyed for a
//! chronological per-user scan.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sled::Tree;

use crate::types::StateEstimateRow;

fn prefix(user_id: &str) -> Vec<u8> {
    let mut key = user_id.as_bytes().to_vec();
    key.push(0);
    key
}

fn key_for(user_id: &str, timestamp: DateTime<Utc>) -> Vec<u8> {
    let mut key = prefix(user_id);
    key.extend_from_slice(&timestamp.timestamp_nanos_opt().unwrap_or(0).to_be_bytes());
    key
}

pub struct StateEstimates {
    tree: Tree,
}

impl StateEstimates {
    pub(super) fn new(tree: Tree) -> Self {
        Self { tree }
    }

    pub fn insert(&self, row: &StateEstimateRow) -> Result<()> {
        let key = key_for(&row.user_id, row.timestamp);
        let value = serde_json::to_vec(row).context("serializing state estimate")?;
        self.tree.insert(key, value).context("inserting state estimate")?;
        Ok(())
    }

    /// The most recently computed estimate for a user, if any.
    pub fn latest(&self, user_id: &str) -> Result<Option<StateEstimateRow>> {
        let mut upper = prefix(user_id);
        upper.extend_from_slice(&u64::MAX.to_be_bytes());
        let range = prefix(user_id)..=upper;
        match self.tree.range(range).next_back() {
            Some(entry) => {
                let (_, value) = entry.context("reading latest state estimate")?;
                let row = serde_json::from_slice(&value).context("deserializing state estimate")?;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }
}
