//! Context aggregator: the read-only join that answers `GET /context`.
//! Combines the latest state estimate, currently-pending intervention
//! instances (joined against the catalog), the saved-intervention set, and
//! derived onboarding-flow state — folding the append-only interaction and
//! status-change logs rather than reading any mutable status column.
//!
//! The one exception to "read-only": whenever a user's onboarding flow is
//! incomplete, or the client has recently asked to re-show a completed one
//! (`flow_requested`), and no instance of that onboarding card is
//! currently pending, this aggregator creates one. This is the system's
//! only read-endpoint write, and it exists so every user is guaranteed to
//! see an onboarding card on first login rather than relying on a stress
//! trigger that may never fire.

use chrono::Utc;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::storage::{Catalog, Warehouse};
use crate::types::{
    CatalogEntry, InstanceStatus, InstanceWithCatalog, InteractionKind, InterventionInstance,
    OnboardingFlowState, StatusChange, UserContext,
};

/// Builds the full aggregated view for a user. `trace_id` threads through
/// from the request if the caller has one; otherwise one is minted, since
/// this is a read endpoint with no upstream batch to inherit a trace id
/// from.
pub async fn get_context(
    warehouse: &Warehouse,
    catalog: &Catalog,
    config: &PipelineConfig,
    user_id: &str,
    trace_id: Option<String>,
) -> Result<UserContext> {
    let trace_id = trace_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let latest_state = warehouse
        .state_estimates
        .latest(user_id)
        .map_err(|e| crate::error::PipelineError::Transient(e.to_string()))?;

    let mut all_instances = warehouse
        .instances
        .for_user(user_id)
        .map_err(|e| crate::error::PipelineError::Transient(e.to_string()))?;

    let mut interactions = warehouse
        .interactions
        .for_user(user_id)
        .map_err(|e| crate::error::PipelineError::Transient(e.to_string()))?;

    if let Some(entry) = maybe_auto_create_onboarding_card(
        warehouse,
        catalog,
        &config.onboarding_flow_id,
        config.flow_requested_window_secs,
        user_id,
        &all_instances,
        &interactions,
        &trace_id,
    )
    .map_err(|e| crate::error::PipelineError::Transient(e.to_string()))?
    {
        all_instances.push(entry);
    }

    let saved_keys = saved_intervention_keys(&interactions);
    interactions.sort_by_key(|i| i.timestamp);

    let mut interventions = Vec::new();
    for instance in all_instances {
        let Some(entry) = catalog.get(&instance.intervention_key) else {
            tracing::warn!(
                intervention_key = %instance.intervention_key,
                "instance references a catalog entry that no longer exists"
            );
            continue;
        };
        let status = current_status(warehouse, &instance)
            .map_err(|e| crate::error::PipelineError::Transient(e.to_string()))?;
        if status != InstanceStatus::Created {
            continue;
        }
        interventions.push(InstanceWithCatalog { instance, catalog: entry.clone() });
    }

    let onboarding = vec![onboarding_flow_state(&interactions, &config.onboarding_flow_id)];

    Ok(UserContext {
        user_id: user_id.to_string(),
        state_estimate: latest_state,
        interventions,
        saved_interventions: saved_keys.into_iter().collect(),
        onboarding,
        trace_id,
    })
}

fn current_status(warehouse: &Warehouse, instance: &InterventionInstance) -> anyhow::Result<InstanceStatus> {
    Ok(warehouse.status_changes.latest(&instance.instance_id)?.unwrap_or(instance.status))
}

/// Ensures an onboarding card is pending whenever the flow is incomplete,
/// or the client has recently asked to re-show a completed one. Never
/// appends a second `created`-status instance for the same key while one
/// is already pending — `flow_requested` only re-opens the gate once the
/// prior instance has moved out of `created` (accepted/dismissed/etc).
fn maybe_auto_create_onboarding_card(
    warehouse: &Warehouse,
    catalog: &Catalog,
    flow_id: &str,
    flow_requested_window_secs: i64,
    user_id: &str,
    existing_instances: &[InterventionInstance],
    interactions: &[crate::types::AppInteraction],
    trace_id: &str,
) -> anyhow::Result<Option<InterventionInstance>> {
    let Some(entry) = onboarding_catalog_entry(catalog, flow_id) else {
        return Ok(None);
    };

    let now = Utc::now();
    let incomplete = !onboarding_flow_state(interactions, flow_id).completed;
    let recently_requested = interactions.iter().any(|i| {
        matches!(&i.kind, InteractionKind::FlowRequested { flow_id: id } if id == flow_id)
            && now - i.timestamp <= chrono::Duration::seconds(flow_requested_window_secs)
    });
    if !incomplete && !recently_requested {
        return Ok(None);
    }

    let already_pending = existing_instances
        .iter()
        .filter(|instance| instance.intervention_key == entry.intervention_key)
        .any(|instance| current_status(warehouse, instance).unwrap_or(instance.status) == InstanceStatus::Created);
    if already_pending {
        return Ok(None);
    }

    let instance = InterventionInstance {
        instance_id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        metric: entry.metric.clone(),
        level: entry.level.clone(),
        surface: entry.surface.clone(),
        intervention_key: entry.intervention_key.clone(),
        created_at: now,
        scheduled_at: now,
        sent_at: None,
        status: InstanceStatus::Created,
        trace_id: trace_id.to_string(),
    };
    warehouse.instances.insert(&instance)?;
    tracing::info!(
        user_id,
        intervention_key = %entry.intervention_key,
        "auto-created onboarding card on first context read"
    );
    Ok(Some(instance))
}

fn onboarding_catalog_entry<'a>(catalog: &'a Catalog, flow_id: &str) -> Option<&'a CatalogEntry> {
    catalog
        .candidates_for("onboarding", "any")
        .into_iter()
        .find(|entry| entry.intervention_key.starts_with(&format!("{flow_id}_")))
}

/// An intervention is currently saved if the most recent `saved`/`unsaved`
/// event for its key, among events after the most recent applicable
/// `flow_reset` that clears the saved set, is a save.
fn saved_intervention_keys(
    interactions: &[crate::types::AppInteraction],
) -> std::collections::HashSet<String> {
    let reset_cutoff = interactions
        .iter()
        .filter(|i| matches!(&i.kind, InteractionKind::FlowReset { scope } if scope.clears_saved()))
        .map(|i| i.timestamp)
        .max();

    let mut saved = std::collections::HashSet::new();
    for interaction in interactions {
        if let Some(cutoff) = reset_cutoff {
            if interaction.timestamp < cutoff {
                continue;
            }
        }
        match &interaction.kind {
            InteractionKind::InterventionSaved { intervention_key } => {
                saved.insert(intervention_key.clone());
            }
            InteractionKind::InterventionUnsaved { intervention_key } => {
                saved.remove(intervention_key);
            }
            _ => {}
        }
    }
    saved
}

/// A flow is complete if the most recent `flow_completed` event for it is
/// not superseded by a later `flow_reset` whose scope clears flows.
fn onboarding_flow_state(
    interactions: &[crate::types::AppInteraction],
    flow_id: &str,
) -> OnboardingFlowState {
    let mut completed_at = None;
    for interaction in interactions {
        match &interaction.kind {
            InteractionKind::FlowCompleted { flow_id: id, .. } if id == flow_id => {
                completed_at = Some(interaction.timestamp);
            }
            InteractionKind::FlowReset { scope } if scope.clears_flows() => {
                if let Some(completed) = completed_at {
                    if interaction.timestamp >= completed {
                        completed_at = None;
                    }
                }
            }
            _ => {}
        }
    }
    OnboardingFlowState {
        flow_id: flow_id.to_string(),
        completed: completed_at.is_some(),
        completed_at,
    }
}
