//! The embedded append-only warehouse: one `sled` tree per table, opened
//! once at startup and shared behind an `Arc` across every pipeline task.
//!
//! A thin wrapper that opens the database, exposes typed accessors, and
//! surfaces I/O failures as the crate's error type rather than leaking
//! raw `sled::Error` or byte slices outside this module.

mod catalog;
mod dedup;
mod devices;
mod instances;
mod interactions;
mod raw_batches;
mod state_estimates;
mod status_changes;
mod surface_preferences;
mod users;

pub use catalog::Catalog;
pub use dedup::{ClaimOutcome, DedupLocks};
pub use devices::Devices;
pub use instances::Instances;
pub use interactions::Interactions;
pub use raw_batches::RawBatches;
pub use state_estimates::StateEstimates;
pub use status_changes::StatusChanges;
pub use surface_preferences::SurfacePreferencesStore;
pub use users::Users;

use std::path::Path;

use anyhow::{Context, Result};

/// The warehouse: every durable table the pipeline reads and writes,
/// backed by a single `sled::Db`.
pub struct Warehouse {
    pub raw_batches: RawBatches,
    pub state_estimates: StateEstimates,
    pub instances: Instances,
    pub status_changes: StatusChanges,
    pub interactions: Interactions,
    pub devices: Devices,
    pub dedup_locks: DedupLocks,
    pub users: Users,
    pub surface_preferences: SurfacePreferencesStore,
}

impl Warehouse {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)
            .with_context(|| format!("opening warehouse at {}", path_ref.display()))?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            raw_batches: RawBatches::new(db.open_tree("raw_batches").context("opening raw_batches tree")?),
            state_estimates: StateEstimates::new(
                db.open_tree("state_estimates").context("opening state_estimates tree")?,
            ),
            instances: Instances::new(
                db.open_tree("intervention_instances").context("opening intervention_instances tree")?,
                db.open_tree("instances_by_user").context("opening instances_by_user tree")?,
            ),
            status_changes: StatusChanges::new(
                db.open_tree("status_changes").context("opening status_changes tree")?,
            ),
            interactions: Interactions::new(
                db.open_tree("app_interactions").context("opening app_interactions tree")?,
            ),
            devices: Devices::new(
                db.open_tree("device_registrations").context("opening device_registrations tree")?,
            ),
            dedup_locks: DedupLocks::new(db.open_tree("dedup_locks").context("opening dedup_locks tree")?),
            users: Users::new(db.open_tree("users").context("opening users tree")?),
            surface_preferences: SurfacePreferencesStore::new(
                db.open_tree("surface_preferences").context("opening surface_preferences tree")?,
            ),
        })
    }

    #[cfg(test)]
    pub fn open_temporary() -> Self {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .expect("opening temporary sled db for tests");
        Self::from_db(db).expect("building warehouse from temporary db")
    }
}
