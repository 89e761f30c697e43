//! Response shape for the read-only context aggregator endpoint.

use serde::Serialize;

use super::intervention::{CatalogEntry, InterventionInstance};
use super::state::StateEstimateRow;

/// A single onboarding flow's derived completion state.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingFlowState {
    pub flow_id: String,
    pub completed: bool,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// An instance joined with its catalog entry, as handed back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceWithCatalog {
    #[serde(flatten)]
    pub instance: InterventionInstance,
    pub catalog: CatalogEntry,
}

/// Full aggregated view of a user's current state, the `/context` response.
#[derive(Debug, Clone, Serialize)]
pub struct UserContext {
    pub user_id: String,
    pub state_estimate: Option<StateEstimateRow>,
    /// Every instance currently in `created` status, joined with its
    /// catalog entry.
    pub interventions: Vec<InstanceWithCatalog>,
    /// Intervention keys currently in the user's saved set.
    pub saved_interventions: Vec<String>,
    pub onboarding: Vec<OnboardingFlowState>,
    pub trace_id: String,
}
