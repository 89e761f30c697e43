//! Intervention catalog, selector output, and their HTTP-facing shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An operator-maintained catalog entry, loaded from TOML at startup. The
/// pipeline reads this tree; it never writes to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub intervention_key: String,
    pub metric: String,
    pub level: String,
    pub surface: String,
    pub title: String,
    pub body: String,
    /// Catalog rows are never deleted; operators disable a row instead.
    /// Candidate queries filter on this.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Optional targeting metadata. Carried through the join so operators
    /// can extend scoring later; not consumed by the current algorithm.
    #[serde(default)]
    pub target_level: Option<String>,
    #[serde(default)]
    pub nudge_type: Option<String>,
    #[serde(default)]
    pub persona: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// Lifecycle status of an intervention instance, derived from the
/// append-only `status_changes` log rather than stored as a mutable column.
/// Transitions follow `created -> {sent, accepted, dismissed, failed}` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Created,
    Sent,
    Accepted,
    Dismissed,
    Failed,
}

impl InstanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Created => "created",
            InstanceStatus::Sent => "sent",
            InstanceStatus::Accepted => "accepted",
            InstanceStatus::Dismissed => "dismissed",
            InstanceStatus::Failed => "failed",
        }
    }
}

/// A materialized intervention instance: the selector's decision to show
/// a specific catalog entry to a specific user at a specific time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionInstance {
    pub instance_id: String,
    pub user_id: String,
    /// Denormalized off the catalog entry at selection time so the
    /// instance row is self-describing even if the catalog entry is later
    /// retired.
    pub metric: String,
    pub level: String,
    pub surface: String,
    pub intervention_key: String,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    /// Status at creation time; the authoritative current status is the
    /// last row in `status_changes` for this instance, or this value if
    /// none exists yet.
    pub status: InstanceStatus,
    pub trace_id: String,
}

/// One append-only status transition for an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub change_id: String,
    pub instance_id: String,
    pub user_id: String,
    pub status: InstanceStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub changed_at: DateTime<Utc>,
    pub trace_id: String,
}

/// Read-only view over a user's history with a surface, computed upstream
/// (a warehouse view over the interaction log) and treated by the selector
/// as an opaque input. Seeded/refreshed out of band; this crate never
/// derives it from scratch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfacePreferences {
    pub user_id: String,
    pub surface: String,
    pub shown_count: u64,
    pub engagement_rate: f64,
    pub ignore_rate: f64,
    pub annoyance_rate: f64,
    pub preference_score: f64,
}

impl SurfacePreferences {
    /// The neutral view used when no preference row has been computed yet
    /// for a (user, surface) pair — an unseen surface is neither favored
    /// nor suppressed.
    pub fn neutral(user_id: &str, surface: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            surface: surface.to_string(),
            shown_count: 0,
            engagement_rate: 0.0,
            ignore_rate: 0.0,
            annoyance_rate: 0.0,
            preference_score: 0.0,
        }
    }
}

/// Response shape for the ingestion endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct WatchEventsResponse {
    pub message: String,
    pub samples_received: usize,
    pub user_id: String,
    pub trace_id: String,
}
