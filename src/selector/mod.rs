//! Intervention selector worker: consumes state-estimate triggers, picks
//! an intervention from the catalog, and attempts delivery.

mod bucket;
mod rate_limiter;
mod scoring;

pub use bucket::bucket_stress;
pub use rate_limiter::RateLimiter;
pub use scoring::{final_score, is_suppressed, select_winner, AnnoyanceSignal};

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::push::PushProvider;
use crate::storage::{Catalog, Warehouse};
use crate::types::{InstanceStatus, InterventionInstance, StatusChange};

/// The subset of config the selector needs, pulled out of `PipelineConfig`
/// so the worker and its tests don't depend on the global singleton.
#[derive(Debug, Clone)]
pub struct SelectorThresholds {
    pub stress_high: f64,
    pub stress_medium: f64,
    pub annoyance_cap: f64,
    pub suppression_shown_count: u64,
    pub suppression_annoyance: f64,
    pub rate_limit_window_secs: i64,
    pub rate_limit_max_instances: usize,
    pub onboarding_flow_id: String,
}

impl From<&PipelineConfig> for SelectorThresholds {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            stress_high: config.stress_high_threshold,
            stress_medium: config.stress_medium_threshold,
            annoyance_cap: config.annoyance_rate_cap,
            suppression_shown_count: config.suppression_shown_count_threshold,
            suppression_annoyance: config.suppression_annoyance_threshold,
            rate_limit_window_secs: config.rate_limit_window_secs,
            rate_limit_max_instances: config.rate_limit_max_instances,
            onboarding_flow_id: config.onboarding_flow_id.clone(),
        }
    }
}

impl Default for SelectorThresholds {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// Consumes triggers from `receiver` until the channel closes or `cancel`
/// fires.
pub async fn run(
    warehouse: Arc<Warehouse>,
    catalog: Arc<Catalog>,
    push: Arc<dyn PushProvider>,
    thresholds: SelectorThresholds,
    mut receiver: mpsc::Receiver<crate::bus::StateEstimateTrigger>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("intervention selector shutting down");
                return Ok(());
            }
            trigger = receiver.recv() => {
                match trigger {
                    Some(trigger) => {
                        if let Err(e) = process_trigger(&warehouse, &catalog, push.as_ref(), &thresholds, trigger).await {
                            tracing::error!(error = %e, "intervention selection failed");
                        }
                    }
                    None => {
                        tracing::info!("state_estimates channel closed, selector exiting");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Implements §4.D's nine-step algorithm: load state, bucket stress,
/// gather candidates, score against surface preferences, select a
/// winner, apply the onboarding and rate-limit gates, persist, and
/// attempt best-effort delivery.
async fn process_trigger(
    warehouse: &Warehouse,
    catalog: &Catalog,
    push: &dyn PushProvider,
    thresholds: &SelectorThresholds,
    trigger: crate::bus::StateEstimateTrigger,
) -> anyhow::Result<()> {
    // 1. Load state.
    let Some(estimate) = warehouse.state_estimates.latest(&trigger.user_id)? else {
        tracing::warn!(user_id = %trigger.user_id, "no state estimate found for trigger");
        return Ok(());
    };
    if estimate.timestamp != trigger.timestamp {
        tracing::warn!(
            user_id = %trigger.user_id,
            "latest state estimate timestamp does not match trigger, using latest anyway"
        );
    }

    // 2. Bucket.
    let Some(level) = bucket_stress(Some(estimate.stress), thresholds.stress_high, thresholds.stress_medium) else {
        return Ok(());
    };

    // 3. Candidate set.
    let candidates = catalog.candidates_for("stress", level);
    if candidates.is_empty() {
        tracing::debug!(user_id = %trigger.user_id, level, "no enabled catalog entries for this bucket");
        return Ok(());
    }

    // 4-5. Preference lookup, score & filter per surface.
    let mut scored = Vec::with_capacity(candidates.len());
    for entry in &candidates {
        let prefs = warehouse.surface_preferences.get(&trigger.user_id, &entry.surface)?;
        let signal = AnnoyanceSignal::from_preferences(&prefs, thresholds.annoyance_cap);
        scored.push(((*entry).clone(), signal));
    }

    // 6. Select.
    let Some(winner) = select_winner(&scored, thresholds.suppression_shown_count, thresholds.suppression_annoyance)
    else {
        tracing::info!(user_id = %trigger.user_id, level, "every candidate suppressed, skipping selection");
        return Ok(());
    };
    let entry = winner.clone();

    // 7. Onboarding gate: never create a second `created` onboarding card
    // for the same key while its flow is still incomplete.
    if entry.intervention_key.starts_with("getting_started_")
        && !onboarding_flow_completed(warehouse, &trigger.user_id, &thresholds.onboarding_flow_id)?
    {
        let instances = warehouse.instances.for_user(&trigger.user_id)?;
        let mut already_pending = false;
        for instance in &instances {
            if instance.intervention_key == entry.intervention_key
                && current_status(warehouse, instance)? == InstanceStatus::Created
            {
                already_pending = true;
                break;
            }
        }
        if already_pending {
            tracing::info!(
                user_id = %trigger.user_id,
                intervention_key = %entry.intervention_key,
                "onboarding card already pending, skipping duplicate"
            );
            return Ok(());
        }
    }

    // 8. Rate limit.
    let limiter = RateLimiter::new(
        chrono::Duration::seconds(thresholds.rate_limit_window_secs),
        thresholds.rate_limit_max_instances,
    );
    let now = Utc::now();
    if !limiter.can_recommend(warehouse, &trigger.user_id, now)? {
        tracing::info!(user_id = %trigger.user_id, "rate limited, skipping selection");
        return Ok(());
    }

    // 9. Persist. Inherit the trace id from the loaded state estimate, not
    // the trigger — on reordered delivery the trigger's timestamp may not
    // match the latest estimate (see the warning above), and it's the
    // estimate actually being acted on that the instance's causal chain
    // must follow.
    let trace_id = if estimate.trace_id.is_empty() {
        let minted = Uuid::new_v4().to_string();
        tracing::warn!(
            user_id = %trigger.user_id,
            minted_trace_id = %minted,
            "state estimate has no trace id — minting one"
        );
        minted
    } else {
        estimate.trace_id.clone()
    };

    let instance_id = Uuid::new_v4().to_string();
    let mut instance = InterventionInstance {
        instance_id: instance_id.clone(),
        user_id: trigger.user_id.clone(),
        metric: entry.metric.clone(),
        level: entry.level.clone(),
        surface: entry.surface.clone(),
        intervention_key: entry.intervention_key.clone(),
        created_at: now,
        scheduled_at: now,
        sent_at: None,
        status: InstanceStatus::Created,
        trace_id: trace_id.clone(),
    };

    // 10. Deliver (best-effort).
    let device = warehouse.devices.get(&trigger.user_id)?;
    let sent = push
        .send(device.as_ref().map(|d| d.device_token.as_str()), &entry, &instance_id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "push provider call failed, leaving instance as created");
            false
        });

    if sent {
        instance.status = InstanceStatus::Sent;
        instance.sent_at = Some(now);
    }
    warehouse.instances.insert(&instance)?;

    if sent {
        warehouse.status_changes.append(&StatusChange {
            change_id: Uuid::new_v4().to_string(),
            instance_id,
            user_id: instance.user_id.clone(),
            status: InstanceStatus::Sent,
            sent_at: Some(now),
            changed_at: now,
            trace_id,
        })?;
    }

    Ok(())
}

fn current_status(warehouse: &Warehouse, instance: &InterventionInstance) -> anyhow::Result<InstanceStatus> {
    Ok(warehouse.status_changes.latest(&instance.instance_id)?.unwrap_or(instance.status))
}

/// Whether the named onboarding flow has already been completed (and not
/// subsequently reset), read straight from the interaction log so the
/// selector's gate agrees with the aggregator's.
fn onboarding_flow_completed(warehouse: &Warehouse, user_id: &str, flow_id: &str) -> anyhow::Result<bool> {
    use crate::types::InteractionKind;

    let interactions = warehouse.interactions.for_user(user_id)?;
    let mut completed_at = None;
    for interaction in &interactions {
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
    Ok(completed_at.is_some())
}
