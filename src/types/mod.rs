//! Domain types shared across the ingestion gateway, state estimator,
//! intervention selector, and context aggregator.
//!
//! Wire-facing structs use `serde` directly; nothing here talks to the
//! warehouse or the bus, so this module has no dependency on the rest of
//! the crate beyond itself.

pub mod batch;
pub mod context;
pub mod dedup;
pub mod interaction;
pub mod intervention;
pub mod state;
pub mod user;

pub use batch::{HealthDataBatch, QuantitySample, SleepSample, WorkoutSample};
pub use context::{InstanceWithCatalog, OnboardingFlowState, UserContext};
pub use dedup::DedupLock;
pub use interaction::{AppInteraction, AppInteractionRequest, InteractionKind, ResetScope, ResetUserDataRequest};
pub use intervention::{
    CatalogEntry, InstanceStatus, InterventionInstance, StatusChange, SurfacePreferences,
    WatchEventsResponse,
};
pub use state::{RawBatchRow, StateEstimateRow};
pub use user::{AppleAuthRequest, AuthResponse, DeviceRegistration, User};

/// Plain string identifiers — bare `String` for ids rather than newtype
/// wrappers.
pub type UserId = String;
pub type TraceId = String;
