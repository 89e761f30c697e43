//! `app_interactions` tree: the append-only interaction log that onboarding
//! flow state and saved-intervention sets are derived from.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sled::Tree;

use crate::types::AppInteraction;

fn prefix(user_id: &str) -> Vec<u8> {
    let mut key = user_id.as_bytes().to_vec();
    key.push(0);
    key
}

fn key_for(interaction: &AppInteraction) -> Vec<u8> {
    let mut key = prefix(&interaction.user_id);
    key.extend_from_slice(&interaction.timestamp.timestamp_nanos_opt().unwrap_or(0).to_be_bytes());
    key.push(0);
    key.extend_from_slice(interaction.interaction_id.as_bytes());
    key
}

pub struct Interactions {
    tree: Tree,
}

impl Interactions {
    pub(super) fn new(tree: Tree) -> Self {
        Self { tree }
    }

    pub fn append(&self, interaction: &AppInteraction) -> Result<()> {
        let key = key_for(interaction);
        let value = serde_json::to_vec(interaction).context("serializing app interaction")?;
        self.tree.insert(key, value).context("appending app interaction")?;
        Ok(())
    }

    /// The full interaction log for a user, oldest first.
    pub fn for_user(&self, user_id: &str) -> Result<Vec<AppInteraction>> {
        let mut upper = prefix(user_id);
        upper.extend_from_slice(&i64::MAX.to_be_bytes());
        let range = prefix(user_id)..=upper;
        let mut out = Vec::new();
        for entry in self.tree.range(range) {
            let (_, value) = entry.context("scanning app interactions")?;
            out.push(serde_json::from_slice(&value).context("deserializing app interaction")?);
        }
        Ok(out)
    }

    /// Interactions for a user since a given time, oldest first.
    pub fn for_user_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<AppInteraction>> {
        Ok(self
            .for_user(user_id)?
            .into_iter()
            .filter(|i| i.timestamp >= since)
            .collect())
    }
}
