//! `status_changes` tree: the append-only log that is the authoritative
//! source of an instance's current status. The instance row's own
//! `status` field is only the initial value, used as a fallback when no
//! status change has been recorded yet.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sled::Tree;

use crate::types::{InstanceStatus, StatusChange};

fn prefix(instance_id: &str) -> Vec<u8> {
    let mut key = instance_id.as_bytes().to_vec();
    key.push(0);
    key
}

fn key_for(change: &StatusChange) -> Vec<u8> {
    let mut key = prefix(&change.instance_id);
    key.extend_from_slice(&change.changed_at.timestamp_nanos_opt().unwrap_or(0).to_be_bytes());
    key.push(0);
    key.extend_from_slice(change.change_id.as_bytes());
    key
}

pub struct StatusChanges {
    tree: Tree,
}

impl StatusChanges {
    pub(super) fn new(tree: Tree) -> Self {
        Self { tree }
    }

    pub fn append(&self, change: &StatusChange) -> Result<()> {
        let key = key_for(change);
        let value = serde_json::to_vec(change).context("serializing status change")?;
        self.tree.insert(key, value).context("appending status change")?;
        Ok(())
    }

    /// The most recent status change recorded for an instance, if any.
    pub fn latest(&self, instance_id: &str) -> Result<Option<InstanceStatus>> {
        let mut upper = prefix(instance_id);
        upper.extend_from_slice(&i64::MAX.to_be_bytes());
        let range = prefix(instance_id)..=upper;
        match self.tree.range(range).next_back() {
            Some(entry) => {
                let (_, value) = entry.context("reading latest status change")?;
                let change: StatusChange =
                    serde_json::from_slice(&value).context("deserializing status change")?;
                Ok(Some(change.status))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn change(instance_id: &str, status: InstanceStatus, changed_at: DateTime<Utc>) -> StatusChange {
        StatusChange {
            change_id: Uuid::new_v4().to_string(),
            instance_id: instance_id.into(),
            user_id: "u1".into(),
            status,
            sent_at: None,
            changed_at,
            trace_id: "t".into(),
        }
    }

    #[test]
    fn latest_reflects_the_most_recently_appended_change() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let changes = StatusChanges::new(db.open_tree("status_changes").unwrap());
        let now = Utc::now();
        changes.append(&change("inst-1", InstanceStatus::Sent, now)).unwrap();
        changes
            .append(&change("inst-1", InstanceStatus::Accepted, now + chrono::Duration::seconds(5)))
            .unwrap();

        assert_eq!(changes.latest("inst-1").unwrap(), Some(InstanceStatus::Accepted));
    }

    #[test]
    fn latest_is_none_when_no_changes_recorded() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let changes = StatusChanges::new(db.open_tree("status_changes").unwrap());
        assert_eq!(changes.latest("inst-unknown").unwrap(), None);
    }
}
