//! Ingestion gateway: accepts sensor batches and app interactions,
//! deduplicates, persists, and triggers the rest of the pipeline.

use chrono::Utc;
use uuid::Uuid;

use crate::bus::{MessageBus, WatchEventsTrigger};
use crate::error::{PipelineError, Result};
use crate::storage::{ClaimOutcome, Warehouse};
use crate::types::{
    AppInteraction, AppInteractionRequest, DedupLock, HealthDataBatch, InstanceStatus,
    InteractionKind, RawBatchRow, ResetScope, StatusChange, WatchEventsResponse,
};

/// Accepts one sensor batch: claims the dedup lock, persists the raw row,
/// and publishes a trigger for the state estimator. A missing trace id is
/// minted and logged as a traceability defect rather than rejected — the
/// client is never shown that detail.
pub async fn submit_batch(
    warehouse: &Warehouse,
    bus: &dyn MessageBus<WatchEventsTrigger>,
    user_id: &str,
    mut batch: HealthDataBatch,
) -> Result<WatchEventsResponse> {
    let trace_id = match &batch.trace_id {
        Some(id) if !id.is_empty() => id.clone(),
        _ => {
            let minted = Uuid::new_v4().to_string();
            tracing::warn!(
                user_id,
                minted_trace_id = %minted,
                "batch submitted without a trace id — minting one"
            );
            minted
        }
    };
    batch.trace_id = Some(trace_id.clone());

    let total_samples = batch.total_samples();
    let fetched_at = batch.fetched_at;

    let lock = DedupLock {
        user_id: user_id.to_string(),
        fetched_at,
        trace_id: trace_id.clone(),
        total_samples,
        claimed_at: Utc::now(),
    };

    match warehouse
        .dedup_locks
        .claim(&lock)
        .map_err(|e| PipelineError::Transient(e.to_string()))?
    {
        ClaimOutcome::AlreadyClaimed => {
            return Ok(WatchEventsResponse {
                message: "duplicate".to_string(),
                samples_received: total_samples,
                user_id: user_id.to_string(),
                trace_id,
            });
        }
        ClaimOutcome::Claimed => {}
    }

    let row = RawBatchRow {
        user_id: user_id.to_string(),
        fetched_at,
        trace_id: trace_id.clone(),
        total_samples,
        processed: false,
        payload: batch,
    };
    warehouse
        .raw_batches
        .insert(&row)
        .map_err(|e| PipelineError::Transient(e.to_string()))?;

    let trigger = WatchEventsTrigger {
        user_id: user_id.to_string(),
        fetched_at,
        trace_id: trace_id.clone(),
        total_samples,
    };
    // The dedup claim is already durable; a publish failure is logged and
    // swallowed rather than rolled back or surfaced to the client — the
    // background estimator will still pick up the persisted row eventually
    // via its own sweep, matching the at-least-once contract.
    if let Err(e) = bus.publish(trigger).await {
        tracing::warn!(user_id, trace_id = %trace_id, error = %e, "failed to publish watch_events trigger");
    }

    Ok(WatchEventsResponse {
        message: "accepted".to_string(),
        samples_received: total_samples,
        user_id: user_id.to_string(),
        trace_id,
    })
}

/// Appends one interaction row. `trace_id` is minted if absent, same as
/// batch ingestion. A `tapped`/`dismissed` event against a known instance
/// also appends the matching status change, since those are the only
/// client-reported events that move an instance off `created`.
pub async fn submit_interaction(
    warehouse: &Warehouse,
    user_id: &str,
    request: AppInteractionRequest,
) -> Result<AppInteraction> {
    validate_interaction_request(&request)?;

    let trace_id = request.trace_id.filter(|t| !t.is_empty()).unwrap_or_else(|| {
        let minted = Uuid::new_v4().to_string();
        tracing::warn!(user_id, minted_trace_id = %minted, "interaction submitted without a trace id");
        minted
    });

    let interaction = AppInteraction {
        interaction_id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind: request.kind,
        instance_id: request.instance_id,
        timestamp: Utc::now(),
        trace_id,
        payload: request.payload,
    };

    warehouse
        .interactions
        .append(&interaction)
        .map_err(|e| PipelineError::Transient(e.to_string()))?;

    // The interaction row above is already durable. A status-change failure
    // from here on must not be allowed to look like the interaction itself
    // was lost, so it's logged and swallowed rather than propagated.
    if let Some(status) = status_for(&interaction.kind) {
        if let Some(instance_id) = &interaction.instance_id {
            match warehouse.instances.get(instance_id) {
                Ok(Some(instance)) => {
                    if let Err(e) = warehouse.status_changes.append(&StatusChange {
                        change_id: Uuid::new_v4().to_string(),
                        instance_id: instance_id.clone(),
                        user_id: instance.user_id,
                        status,
                        sent_at: None,
                        changed_at: interaction.timestamp,
                        trace_id: interaction.trace_id.clone(),
                    }) {
                        tracing::error!(
                            user_id,
                            instance_id,
                            error = %e,
                            "failed to append status change, interaction was still recorded"
                        );
                    }
                }
                Ok(None) => {
                    tracing::warn!(
                        user_id,
                        instance_id,
                        "interaction references an instance that does not exist"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        user_id,
                        instance_id,
                        error = %e,
                        "failed to look up instance for status change, interaction was still recorded"
                    );
                }
            }
        }
    }

    Ok(interaction)
}

fn status_for(kind: &InteractionKind) -> Option<InstanceStatus> {
    match kind {
        InteractionKind::Tapped => Some(InstanceStatus::Accepted),
        InteractionKind::Dismissed => Some(InstanceStatus::Dismissed),
        _ => None,
    }
}

fn validate_interaction_request(request: &AppInteractionRequest) -> Result<()> {
    match &request.kind {
        InteractionKind::Shown | InteractionKind::Tapped | InteractionKind::Dismissed => {
            if request.instance_id.is_none() {
                return Err(PipelineError::Validation(
                    "instance_id is required for intervention-scoped interactions".into(),
                ));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Resets a user's derived state by writing a synthetic `flow_reset`
/// interaction scoped to the requested part of the log. Nothing is
/// deleted — downstream readers are expected to treat a reset event as a
/// cutoff when folding the log, matching the append-only data model.
pub async fn reset_user_data(warehouse: &Warehouse, user_id: &str, scope: ResetScope) -> Result<AppInteraction> {
    let interaction = AppInteraction {
        interaction_id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind: InteractionKind::FlowReset { scope },
        instance_id: None,
        timestamp: Utc::now(),
        trace_id: Uuid::new_v4().to_string(),
        payload: None,
    };
    warehouse
        .interactions
        .append(&interaction)
        .map_err(|e| PipelineError::Transient(e.to_string()))?;
    Ok(interaction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryTopic;
    use crate::types::{InterventionInstance};

    fn sample_batch(trace_id: Option<&str>) -> HealthDataBatch {
        HealthDataBatch {
            heart_rate: Vec::new(),
            hrv: Vec::new(),
            resting_heart_rate: Vec::new(),
            walking_heart_rate_average: Vec::new(),
            respiratory_rate: Vec::new(),
            oxygen_saturation: Vec::new(),
            vo2_max: Vec::new(),
            steps: Vec::new(),
            active_energy: Vec::new(),
            exercise_time: Vec::new(),
            stand_time: Vec::new(),
            time_in_daylight: Vec::new(),
            body_mass: Vec::new(),
            body_fat_percentage: Vec::new(),
            lean_body_mass: Vec::new(),
            sleep: Vec::new(),
            workouts: Vec::new(),
            fetched_at: Utc::now(),
            trace_id: trace_id.map(|s| s.to_string()),
        }
    }

    #[tokio::test]
    async fn submitting_the_same_batch_twice_is_reported_as_duplicate() {
        let warehouse = Warehouse::open_temporary();
        let (topic, _receiver) = InMemoryTopic::new(8);
        let batch = sample_batch(Some("trace-1"));

        let first = submit_batch(&warehouse, &topic, "u1", batch.clone()).await.unwrap();
        assert_eq!(first.message, "accepted");

        let second = submit_batch(&warehouse, &topic, "u1", batch).await.unwrap();
        assert_eq!(second.message, "duplicate");
    }

    #[tokio::test]
    async fn missing_trace_id_is_minted_not_rejected() {
        let warehouse = Warehouse::open_temporary();
        let (topic, _receiver) = InMemoryTopic::new(8);
        let response = submit_batch(&warehouse, &topic, "u1", sample_batch(None)).await.unwrap();
        assert_eq!(response.message, "accepted");
        assert!(!response.trace_id.is_empty());
    }

    #[tokio::test]
    async fn interaction_without_instance_id_is_rejected_for_tap() {
        let warehouse = Warehouse::open_temporary();
        let result = submit_interaction(
            &warehouse,
            "u1",
            AppInteractionRequest {
                user_id: "u1".into(),
                kind: InteractionKind::Tapped,
                instance_id: None,
                trace_id: None,
                payload: None,
            },
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn tapping_a_known_instance_records_an_accepted_status_change() {
        let warehouse = Warehouse::open_temporary();
        let now = Utc::now();
        let instance = InterventionInstance {
            instance_id: "inst-1".into(),
            user_id: "u1".into(),
            metric: "stress".into(),
            level: "high".into(),
            surface: "notification".into(),
            intervention_key: "stress_high_notification".into(),
            created_at: now,
            scheduled_at: now,
            sent_at: Some(now),
            status: InstanceStatus::Sent,
            trace_id: "t".into(),
        };
        warehouse.instances.insert(&instance).unwrap();

        submit_interaction(
            &warehouse,
            "u1",
            AppInteractionRequest {
                user_id: "u1".into(),
                kind: InteractionKind::Tapped,
                instance_id: Some("inst-1".into()),
                trace_id: Some("t".into()),
                payload: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(
            warehouse.status_changes.latest("inst-1").unwrap(),
            Some(InstanceStatus::Accepted)
        );
    }

    #[tokio::test]
    async fn reset_appends_a_flow_reset_interaction() {
        let warehouse = Warehouse::open_temporary();
        reset_user_data(&warehouse, "u1", ResetScope::All).await.unwrap();
        let log = warehouse.interactions.for_user("u1").unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, InteractionKind::FlowReset { scope: ResetScope::All });
    }
}
