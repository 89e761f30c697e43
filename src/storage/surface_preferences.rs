//! `surface_preferences` tree: a per-(user, surface) view computed
//! upstream from the interaction log. The selector treats it as read-only;
//! this crate never derives it itself, only stores and serves whatever a
//! warehouse view has written.

use anyhow::{Context, Result};
use sled::Tree;

use crate::types::SurfacePreferences;

fn key_for(user_id: &str, surface: &str) -> Vec<u8> {
    let mut key = user_id.as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(surface.as_bytes());
    key
}

pub struct SurfacePreferencesStore {
    tree: Tree,
}

impl SurfacePreferencesStore {
    pub(super) fn new(tree: Tree) -> Self {
        Self { tree }
    }

    /// Upserts the computed view for a (user, surface) pair. Called by
    /// whatever refreshes the upstream preference view; the pipeline
    /// itself never computes these numbers.
    pub fn upsert(&self, prefs: &SurfacePreferences) -> Result<()> {
        let key = key_for(&prefs.user_id, &prefs.surface);
        let value = serde_json::to_vec(prefs).context("serializing surface preferences")?;
        self.tree.insert(key, value).context("upserting surface preferences")?;
        Ok(())
    }

    /// The view for a (user, surface) pair, or the neutral default if
    /// nothing has been computed yet for this pair.
    pub fn get(&self, user_id: &str, surface: &str) -> Result<SurfacePreferences> {
        match self
            .tree
            .get(key_for(user_id, surface))
            .context("loading surface preferences")?
        {
            Some(value) => {
                Ok(serde_json::from_slice(&value).context("deserializing surface preferences")?)
            }
            None => Ok(SurfacePreferences::neutral(user_id, surface)),
        }
    }
}
