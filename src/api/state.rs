//! Shared Axum state: the warehouse, catalog, identity verifier, and bus
//! producer every handler needs, bundled behind `Arc`s and cheaply
//! cloneable.

use std::sync::Arc;

use crate::bus::{MessageBus, WatchEventsTrigger};
use crate::identity::IdentityVerifier;
use crate::storage::{Catalog, Warehouse};

#[derive(Clone)]
pub struct ApiState {
    pub warehouse: Arc<Warehouse>,
    pub catalog: Arc<Catalog>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub watch_events_bus: Arc<dyn MessageBus<WatchEventsTrigger>>,
}
