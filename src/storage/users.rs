//! `users` tree: backs `/auth/apple` and `/auth/apple/mock`. Independent
//! of the pipeline tables in the rest of this module — the identity layer
//! owns it directly.

use anyhow::{Context, Result};
use sled::Tree;

use crate::types::User;

pub struct Users {
    tree: Tree,
}

impl Users {
    pub(super) fn new(tree: Tree) -> Self {
        Self { tree }
    }

    pub fn upsert(&self, user: &User) -> Result<()> {
        let value = serde_json::to_vec(user).context("serializing user")?;
        self.tree
            .insert(user.user_id.as_bytes(), value)
            .context("upserting user")?;
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Result<Option<User>> {
        match self.tree.get(user_id.as_bytes()).context("loading user")? {
            Some(value) => Ok(Some(serde_json::from_slice(&value).context("deserializing user")?)),
            None => Ok(None),
        }
    }
}
