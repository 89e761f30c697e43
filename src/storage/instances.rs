//! `intervention_instances` tree plus its `instances_by_user` secondary
//! index for per-user chronological scans.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sled::Tree;

use crate::types::InterventionInstance;

fn user_index_prefix(user_id: &str) -> Vec<u8> {
    let mut key = user_id.as_bytes().to_vec();
    key.push(0);
    key
}

fn user_index_key(user_id: &str, created_at: DateTime<Utc>, instance_id: &str) -> Vec<u8> {
    let mut key = user_index_prefix(user_id);
    key.extend_from_slice(&created_at.timestamp_nanos_opt().unwrap_or(0).to_be_bytes());
    key.push(0);
    key.extend_from_slice(instance_id.as_bytes());
    key
}

pub struct Instances {
    by_id: Tree,
    by_user: Tree,
}

impl Instances {
    pub(super) fn new(by_id: Tree, by_user: Tree) -> Self {
        Self { by_id, by_user }
    }

    pub fn insert(&self, instance: &InterventionInstance) -> Result<()> {
        let value = serde_json::to_vec(instance).context("serializing intervention instance")?;
        self.by_id
            .insert(instance.instance_id.as_bytes(), value)
            .context("inserting intervention instance")?;
        let index_key =
            user_index_key(&instance.user_id, instance.created_at, &instance.instance_id);
        self.by_user
            .insert(index_key, instance.instance_id.as_bytes())
            .context("indexing intervention instance by user")?;
        Ok(())
    }

    pub fn get(&self, instance_id: &str) -> Result<Option<InterventionInstance>> {
        match self.by_id.get(instance_id.as_bytes()).context("loading intervention instance")? {
            Some(value) => Ok(Some(
                serde_json::from_slice(&value).context("deserializing intervention instance")?,
            )),
            None => Ok(None),
        }
    }

    /// All instances for a user, oldest first.
    pub fn for_user(&self, user_id: &str) -> Result<Vec<InterventionInstance>> {
        let mut upper = user_index_prefix(user_id);
        upper.extend_from_slice(&i64::MAX.to_be_bytes());
        let range = user_index_prefix(user_id)..=upper;
        let mut out = Vec::new();
        for entry in self.by_user.range(range) {
            let (_, instance_id) = entry.context("scanning instances by user")?;
            let instance_id = String::from_utf8_lossy(&instance_id).to_string();
            if let Some(instance) = self.get(&instance_id)? {
                out.push(instance);
            }
        }
        Ok(out)
    }

    /// Instances created for a user within the last `window`, used by the
    /// rate limiter.
    pub fn created_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<InterventionInstance>> {
        Ok(self
            .for_user(user_id)?
            .into_iter()
            .filter(|instance| instance.created_at >= since)
            .collect())
    }
}
