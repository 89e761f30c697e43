//! End-to-end pipeline scenarios: ingestion through to a selected
//! intervention, run against a real (temporary) warehouse with no
//! internal mocking beyond the push provider and message bus.

use std::sync::Arc;

use chrono::{Duration, Utc};
use shift_pipeline::bus::{InMemoryTopic, StateEstimateTrigger, WatchEventsTrigger};
use shift_pipeline::estimator::{DefaultTransform, Transform};
use shift_pipeline::ingestion;
use shift_pipeline::push::NullProvider;
use shift_pipeline::selector::{self, SelectorThresholds};
use shift_pipeline::storage::{Catalog, Warehouse};
use shift_pipeline::types::{
    AppInteractionRequest, CatalogEntry, HealthDataBatch, InstanceStatus, InteractionKind,
    InterventionInstance, QuantitySample, ResetScope,
};

/// Opens a warehouse in a fresh temporary directory for the duration of
/// the returned guard. Keep the `TempDir` alive for as long as the
/// `Warehouse` is in use.
fn open_warehouse() -> (tempfile::TempDir, Warehouse) {
    let dir = tempfile::tempdir().unwrap();
    let warehouse = Warehouse::open(dir.path()).unwrap();
    (dir, warehouse)
}

fn empty_batch(fetched_at: chrono::DateTime<Utc>, trace_id: Option<&str>) -> HealthDataBatch {
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
        fetched_at,
        trace_id: trace_id.map(|s| s.to_string()),
    }
}

fn quantity(value: f64) -> QuantitySample {
    QuantitySample {
        sample_type: "heartRate".into(),
        value,
        unit: "count/min".into(),
        start_date: Utc::now(),
        end_date: Utc::now(),
        source_name: "watch".into(),
        source_bundle: String::new(),
    }
}

fn high_stress_catalog() -> Catalog {
    Catalog::from_entries(vec![CatalogEntry {
        intervention_key: "stress_high_notification".into(),
        metric: "stress".into(),
        level: "high".into(),
        surface: "notification".into(),
        title: "Take a breath".into(),
        body: "Your stress looks elevated.".into(),
        target_level: None,
        nudge_type: None,
        enabled: true,
        persona: None,
    }])
}

fn instance(key: &str, created_at: chrono::DateTime<Utc>) -> InterventionInstance {
    InterventionInstance {
        instance_id: uuid::Uuid::new_v4().to_string(),
        user_id: "user-1".into(),
        metric: "stress".into(),
        level: "high".into(),
        surface: "notification".into(),
        intervention_key: key.into(),
        created_at,
        scheduled_at: created_at,
        sent_at: None,
        status: InstanceStatus::Created,
        trace_id: "t".into(),
    }
}

fn thresholds() -> SelectorThresholds {
    SelectorThresholds {
        stress_high: 0.7,
        stress_medium: 0.3,
        annoyance_cap: 0.9,
        suppression_shown_count: 5,
        suppression_annoyance: 0.7,
        rate_limit_window_secs: 30 * 60,
        rate_limit_max_instances: 3,
        onboarding_flow_id: "getting_started".into(),
    }
}

#[tokio::test]
async fn happy_path_produces_one_intervention_instance() {
    let (_warehouse_dir, warehouse) = open_warehouse();
    let (watch_topic, mut watch_rx) = InMemoryTopic::<WatchEventsTrigger>::new(8);
    let (state_topic, state_rx) = InMemoryTopic::<StateEstimateTrigger>::new(8);

    let mut batch = empty_batch(Utc::now(), Some("trace-happy"));
    for _ in 0..5 {
        batch.heart_rate.push(quantity(120.0));
        batch.hrv.push(quantity(8.0));
    }

    let response = ingestion::submit_batch(&warehouse, &watch_topic, "user-1", batch).await.unwrap();
    assert_eq!(response.message, "accepted");
    assert!(watch_rx.recv().await.is_some());

    let pending = warehouse.raw_batches.unprocessed().unwrap();
    assert_eq!(pending.len(), 1);
    let (key, row) = &pending[0];
    let derived = DefaultTransform.estimate(&row.payload);
    use shift_pipeline::types::StateEstimateRow;
    let estimate = StateEstimateRow {
        user_id: row.user_id.clone(),
        timestamp: row.fetched_at,
        recovery: derived.recovery,
        readiness: derived.readiness,
        stress: derived.stress,
        fatigue: derived.fatigue,
        trace_id: row.trace_id.clone(),
    };
    warehouse.state_estimates.insert(&estimate).unwrap();
    warehouse.raw_batches.mark_processed(key).unwrap();
    state_topic
        .publish(StateEstimateTrigger {
            user_id: estimate.user_id.clone(),
            timestamp: estimate.timestamp,
            trace_id: estimate.trace_id.clone(),
        })
        .await
        .unwrap();
    drop(state_topic);

    let warehouse = Arc::new(warehouse);
    let catalog = Arc::new(high_stress_catalog());
    let push = Arc::new(NullProvider);
    let cancel = tokio_util::sync::CancellationToken::new();
    // run() drains the buffered trigger, then exits on its own once the
    // channel reports closed (we already dropped the sender above).
    selector::run(warehouse.clone(), catalog, push, thresholds(), state_rx, cancel)
        .await
        .unwrap();

    let instances = warehouse.instances.for_user("user-1").unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].intervention_key, "stress_high_notification");
    assert_eq!(instances[0].trace_id, "trace-happy");
}

#[tokio::test]
async fn duplicate_batch_submission_is_rejected_without_a_second_raw_row() {
    let (_warehouse_dir, warehouse) = open_warehouse();
    let (topic, _rx) = InMemoryTopic::<WatchEventsTrigger>::new(8);
    let fetched_at = Utc::now();

    let first = ingestion::submit_batch(&warehouse, &topic, "user-1", empty_batch(fetched_at, Some("t1")))
        .await
        .unwrap();
    let second = ingestion::submit_batch(&warehouse, &topic, "user-1", empty_batch(fetched_at, Some("t2")))
        .await
        .unwrap();

    assert_eq!(first.message, "accepted");
    assert_eq!(second.message, "duplicate");
    assert_eq!(warehouse.raw_batches.count(), 1);
}

#[tokio::test]
async fn rate_limit_caps_instances_created_within_the_window() {
    let (_warehouse_dir, warehouse) = open_warehouse();
    let now = Utc::now();
    for _ in 0..3 {
        warehouse.instances.insert(&instance("stress_high_notification", now)).unwrap();
    }
    warehouse
        .state_estimates
        .insert(&shift_pipeline::types::StateEstimateRow {
            user_id: "user-1".into(),
            timestamp: now,
            recovery: 0.5,
            readiness: 0.5,
            stress: 0.95,
            fatigue: 0.5,
            trace_id: "t".into(),
        })
        .unwrap();

    let (state_topic, state_rx) = InMemoryTopic::<StateEstimateTrigger>::new(8);
    state_topic
        .publish(StateEstimateTrigger { user_id: "user-1".into(), timestamp: now, trace_id: "t".into() })
        .await
        .unwrap();
    drop(state_topic);

    let warehouse = Arc::new(warehouse);
    let cancel = tokio_util::sync::CancellationToken::new();
    selector::run(
        warehouse.clone(),
        Arc::new(high_stress_catalog()),
        Arc::new(NullProvider),
        thresholds(),
        state_rx,
        cancel,
    )
    .await
    .unwrap();

    assert_eq!(warehouse.instances.for_user("user-1").unwrap().len(), 3);
}

#[tokio::test]
async fn onboarding_flow_completion_is_visible_in_context() {
    let (_warehouse_dir, warehouse) = open_warehouse();
    ingestion::submit_interaction(
        &warehouse,
        "user-1",
        AppInteractionRequest {
            user_id: "user-1".into(),
            kind: InteractionKind::FlowCompleted { flow_id: "getting_started".into(), flow_version: 1 },
            instance_id: None,
            trace_id: Some("t".into()),
            payload: None,
        },
    )
    .await
    .unwrap();

    let config = shift_pipeline::PipelineConfig::default();
    let context =
        shift_pipeline::aggregator::get_context(&warehouse, &high_stress_catalog(), &config, "user-1", None)
            .await
            .unwrap();

    assert!(context.onboarding.iter().any(|f| f.flow_id == "getting_started" && f.completed));
}

#[tokio::test]
async fn saved_intervention_disappears_after_a_saved_scope_reset() {
    let (_warehouse_dir, warehouse) = open_warehouse();

    ingestion::submit_interaction(
        &warehouse,
        "user-1",
        AppInteractionRequest {
            user_id: "user-1".into(),
            kind: InteractionKind::InterventionSaved { intervention_key: "stress_high_notification".into() },
            instance_id: Some("inst-1".into()),
            trace_id: Some("t".into()),
            payload: None,
        },
    )
    .await
    .unwrap();

    let config = shift_pipeline::PipelineConfig::default();
    let context =
        shift_pipeline::aggregator::get_context(&warehouse, &high_stress_catalog(), &config, "user-1", None)
            .await
            .unwrap();
    assert_eq!(context.saved_interventions, vec!["stress_high_notification".to_string()]);

    ingestion::reset_user_data(&warehouse, "user-1", ResetScope::Saved).await.unwrap();

    let context =
        shift_pipeline::aggregator::get_context(&warehouse, &high_stress_catalog(), &config, "user-1", None)
            .await
            .unwrap();
    assert!(context.saved_interventions.is_empty());
}

#[tokio::test]
async fn missing_trace_id_is_minted_and_threads_through_to_the_state_estimate() {
    let (_warehouse_dir, warehouse) = open_warehouse();
    let (topic, _rx) = InMemoryTopic::<WatchEventsTrigger>::new(8);

    let response = ingestion::submit_batch(&warehouse, &topic, "user-1", empty_batch(Utc::now(), None))
        .await
        .unwrap();
    assert!(!response.trace_id.is_empty());

    let pending = warehouse.raw_batches.unprocessed().unwrap();
    assert_eq!(pending[0].1.trace_id, response.trace_id);
}

#[tokio::test]
async fn rate_limit_window_expires_after_the_configured_duration() {
    let (_warehouse_dir, warehouse) = open_warehouse();
    let now = Utc::now();
    for _ in 0..3 {
        warehouse
            .instances
            .insert(&instance("stress_high_notification", now - Duration::minutes(45)))
            .unwrap();
    }

    let limiter = shift_pipeline::selector::RateLimiter::new(Duration::minutes(30), 3);
    assert!(limiter.can_recommend(&warehouse, "user-1", now).unwrap());
}

#[tokio::test]
async fn onboarding_auto_create_produces_a_getting_started_card_on_first_context_call() {
    let (_warehouse_dir, warehouse) = open_warehouse();
    let catalog = Catalog::from_entries(vec![CatalogEntry {
        intervention_key: "getting_started_v1".into(),
        metric: "onboarding".into(),
        level: "any".into(),
        surface: "chat_card".into(),
        title: "Welcome".into(),
        body: "b".into(),
        target_level: None,
        nudge_type: None,
        enabled: true,
        persona: None,
    }]);
    let config = shift_pipeline::PipelineConfig::default();

    let context = shift_pipeline::aggregator::get_context(&warehouse, &catalog, &config, "user-1", None)
        .await
        .unwrap();

    assert!(context.interventions.iter().any(|i| i.instance.intervention_key == "getting_started_v1"));
}
