//! `dedup_locks` tree: claimed atomically before a batch is published so
//! concurrent or retried submissions of the same `(user, fetched_at)`
//! pair are rejected as duplicates. A claim is never rolled back if the
//! downstream bus publish fails — a duplicate delivery is cheap to ignore,
//! a lost claim would let the same batch double-count.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sled::transaction::TransactionError;

use crate::types::DedupLock;

fn key_for(user_id: &str, fetched_at: DateTime<Utc>) -> Vec<u8> {
    let mut key = user_id.as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(&fetched_at.timestamp_nanos_opt().unwrap_or(0).to_be_bytes());
    key
}

pub struct DedupLocks {
    tree: sled::Tree,
}

pub enum ClaimOutcome {
    Claimed,
    AlreadyClaimed,
}

impl DedupLocks {
    pub(super) fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }

    /// Attempts to atomically claim a `(user_id, fetched_at)` pair. Returns
    /// `AlreadyClaimed` without writing if a lock already exists.
    pub fn claim(&self, lock: &DedupLock) -> Result<ClaimOutcome> {
        let key = key_for(&lock.user_id, lock.fetched_at);
        let value = serde_json::to_vec(lock)?;

        let result: Result<ClaimOutcome, TransactionError<()>> = self.tree.transaction(|tx| {
            if tx.get(&key)?.is_some() {
                return Ok(ClaimOutcome::AlreadyClaimed);
            }
            tx.insert(key.as_slice(), value.as_slice())?;
            Ok(ClaimOutcome::Claimed)
        });

        match result {
            Ok(outcome) => Ok(outcome),
            Err(TransactionError::Storage(e)) => Err(e.into()),
            Err(TransactionError::Abort(())) => unreachable!("claim never aborts explicitly"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lock(fetched_at: DateTime<Utc>) -> DedupLock {
        DedupLock {
            user_id: "u1".into(),
            fetched_at,
            trace_id: "t".into(),
            total_samples: 10,
            claimed_at: Utc::now(),
        }
    }

    #[test]
    fn second_claim_of_the_same_batch_is_rejected() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let locks = DedupLocks::new(db.open_tree("dedup_locks").unwrap());
        let fetched_at = Utc::now();

        assert!(matches!(locks.claim(&lock(fetched_at)).unwrap(), ClaimOutcome::Claimed));
        assert!(matches!(
            locks.claim(&lock(fetched_at)).unwrap(),
            ClaimOutcome::AlreadyClaimed
        ));
    }
}
