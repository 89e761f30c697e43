//! `device_registrations` tree: the one mutable table in the warehouse.
//! Upserts never regress a device's token to an older registration.

use anyhow::{Context, Result};
use sled::transaction::{ConflictableTransactionError, TransactionError};

use crate::types::DeviceRegistration;

pub struct Devices {
    tree: sled::Tree,
}

impl Devices {
    pub(super) fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }

    /// Upserts a device registration, keeping whichever of the existing
    /// and incoming rows has the newer `updated_at`.
    pub fn upsert(&self, registration: &DeviceRegistration) -> Result<()> {
        let key = registration.user_id.as_bytes().to_vec();
        let incoming = serde_json::to_vec(registration).context("serializing device registration")?;

        let result = self.tree.transaction(|tx| {
            if let Some(existing) = tx.get(&key)? {
                let existing: DeviceRegistration = serde_json::from_slice(&existing)
                    .map_err(|e| ConflictableTransactionError::Abort(e))?;
                if existing.updated_at > registration.updated_at {
                    return Ok(());
                }
            }
            tx.insert(key.as_slice(), incoming.as_slice())?;
            Ok(())
        });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => {
                Err(anyhow::anyhow!("decoding existing device registration: {e}"))
            }
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }

    pub fn get(&self, user_id: &str) -> Result<Option<DeviceRegistration>> {
        match self.tree.get(user_id.as_bytes()).context("loading device registration")? {
            Some(value) => Ok(Some(
                serde_json::from_slice(&value).context("deserializing device registration")?,
            )),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn registration(token: &str, updated_at: chrono::DateTime<Utc>) -> DeviceRegistration {
        DeviceRegistration {
            user_id: "u1".into(),
            device_token: token.into(),
            platform: "ios".into(),
            updated_at,
        }
    }

    #[test]
    fn upsert_ignores_older_registrations() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let devices = Devices::new(db.open_tree("device_registrations").unwrap());
        let now = Utc::now();
        devices.upsert(&registration("new-token", now)).unwrap();
        devices.upsert(&registration("stale-token", now - Duration::seconds(60))).unwrap();

        assert_eq!(devices.get("u1").unwrap().unwrap().device_token, "new-token");
    }
}
