//! Append-only interaction log: onboarding flow events, intervention
//! save/unsave, interventional feedback, and status changes the client
//! reports back.
//!
//! Nothing in this module is ever mutated in place — the current state of
//! an onboarding flow or a saved-intervention set is always derived by
//! scanning this log, never by an UPDATE. This replaces the mutate-in-place
//! status-column design the original system used.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The kind of app interaction recorded in `app_interactions`.
///
/// `Unknown` preserves any event type the pipeline doesn't recognize
/// verbatim (forward-compatibility): the client is free to ship new event
/// types before this crate knows about them, and they round-trip through
/// `payload` untouched instead of being rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum InteractionKind {
    /// An intervention surface was shown to the user.
    Shown,
    /// Client reports an intervention was tapped.
    Tapped,
    /// Client reports an intervention was dismissed.
    Dismissed,
    /// Client saved an intervention for later.
    InterventionSaved { intervention_key: String },
    /// Client removed a previously saved intervention.
    InterventionUnsaved { intervention_key: String },
    /// Client completed an onboarding flow.
    FlowCompleted { flow_id: String, flow_version: u32 },
    /// Client (or a `/user/reset` call) reset onboarding/saved state.
    FlowReset { scope: ResetScope },
    /// Client asks to re-show a completed flow.
    FlowRequested { flow_id: String },
    /// Anything the pipeline doesn't recognize yet; carried through
    /// untouched rather than rejected.
    #[serde(other)]
    Unknown,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Shown => "shown",
            InteractionKind::Tapped => "tapped",
            InteractionKind::Dismissed => "dismissed",
            InteractionKind::InterventionSaved { .. } => "intervention_saved",
            InteractionKind::InterventionUnsaved { .. } => "intervention_unsaved",
            InteractionKind::FlowCompleted { .. } => "flow_completed",
            InteractionKind::FlowReset { .. } => "flow_reset",
            InteractionKind::FlowRequested { .. } => "flow_requested",
            InteractionKind::Unknown => "unknown",
        }
    }
}

/// One row in the append-only `app_interactions` tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInteraction {
    pub interaction_id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub kind: InteractionKind,
    /// Present for intervention-scoped interactions (`shown`, `tapped`,
    /// `dismissed`), absent otherwise.
    #[serde(default)]
    pub instance_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
    /// Raw payload as submitted, kept alongside the typed `kind` so an
    /// `Unknown` event's original shape is never lost.
    #[serde(default)]
    pub payload: Option<JsonValue>,
}

/// Request body for `POST /app_interactions`. Carries the client's claimed
/// `user_id` so the handler can reject it as forbidden when it doesn't
/// match the bearer token's identity, per §4.B's
/// "authenticated-user-must-equal event.user or reject" contract.
#[derive(Debug, Clone, Deserialize)]
pub struct AppInteractionRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub kind: InteractionKind,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub payload: Option<JsonValue>,
}

/// Request body for `POST /user/reset`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetUserDataRequest {
    pub scope: ResetScope,
}

/// What `/user/reset` (and a `flow_reset` event) clears. Anything outside
/// this set is a validation error, not a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    All,
    Flows,
    Saved,
}

impl ResetScope {
    pub fn as_str(self) -> &'static str {
        match self {
            ResetScope::All => "all",
            ResetScope::Flows => "flows",
            ResetScope::Saved => "saved",
        }
    }

    /// Whether a reset of this scope clears onboarding-flow completion.
    pub fn clears_flows(self) -> bool {
        matches!(self, ResetScope::All | ResetScope::Flows)
    }

    /// Whether a reset of this scope clears the saved-intervention set.
    pub fn clears_saved(self) -> bool {
        matches!(self, ResetScope::All | ResetScope::Saved)
    }
}
