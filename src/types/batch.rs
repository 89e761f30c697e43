//! Watch/phone sensor batch payloads ("HealthDataBatch" on the wire).
//!
//! Mirrors the iOS HealthKit export shape: a fixed set of named sample
//! arrays plus a required `fetchedAt` and `trace_id`. Field names use
//! camelCase on the wire to match the client, snake_case in Rust.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single scalar HealthKit quantity sample (heart rate, HRV, steps, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantitySample {
    #[serde(rename = "type")]
    pub sample_type: String,
    pub value: f64,
    pub unit: String,
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end_date: DateTime<Utc>,
    #[serde(rename = "sourceName")]
    pub source_name: String,
    #[serde(rename = "sourceBundle", default)]
    pub source_bundle: String,
}

/// A sleep-stage sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepSample {
    pub stage: String,
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end_date: DateTime<Utc>,
    #[serde(rename = "sourceName")]
    pub source_name: String,
}

/// A workout session sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSample {
    #[serde(rename = "activityType")]
    pub activity_type: String,
    pub duration: f64,
    #[serde(rename = "totalEnergyBurned")]
    pub total_energy_burned: Option<f64>,
    #[serde(rename = "totalDistance")]
    pub total_distance: Option<f64>,
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end_date: DateTime<Utc>,
    #[serde(rename = "sourceName")]
    pub source_name: String,
}

/// A client-assembled batch of sensor samples submitted in one call,
/// identified by `(user, fetched_at)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDataBatch {
    #[serde(default, rename = "heartRate")]
    pub heart_rate: Vec<QuantitySample>,
    #[serde(default)]
    pub hrv: Vec<QuantitySample>,
    #[serde(default, rename = "restingHeartRate")]
    pub resting_heart_rate: Vec<QuantitySample>,
    #[serde(default, rename = "walkingHeartRateAverage")]
    pub walking_heart_rate_average: Vec<QuantitySample>,
    #[serde(default, rename = "respiratoryRate")]
    pub respiratory_rate: Vec<QuantitySample>,
    #[serde(default, rename = "oxygenSaturation")]
    pub oxygen_saturation: Vec<QuantitySample>,
    #[serde(default, rename = "vo2Max")]
    pub vo2_max: Vec<QuantitySample>,
    #[serde(default)]
    pub steps: Vec<QuantitySample>,
    #[serde(default, rename = "activeEnergy")]
    pub active_energy: Vec<QuantitySample>,
    #[serde(default, rename = "exerciseTime")]
    pub exercise_time: Vec<QuantitySample>,
    #[serde(default, rename = "standTime")]
    pub stand_time: Vec<QuantitySample>,
    #[serde(default, rename = "timeInDaylight")]
    pub time_in_daylight: Vec<QuantitySample>,
    #[serde(default, rename = "bodyMass")]
    pub body_mass: Vec<QuantitySample>,
    #[serde(default, rename = "bodyFatPercentage")]
    pub body_fat_percentage: Vec<QuantitySample>,
    #[serde(default, rename = "leanBodyMass")]
    pub lean_body_mass: Vec<QuantitySample>,
    #[serde(default)]
    pub sleep: Vec<SleepSample>,
    #[serde(default)]
    pub workouts: Vec<WorkoutSample>,
    #[serde(rename = "fetchedAt")]
    pub fetched_at: DateTime<Utc>,
    /// End-to-end trace id. Required on the wire, but the gateway tolerates
    /// a missing value (mints one and logs a traceability defect) since
    /// clients have been observed to omit it.
    #[serde(default, alias = "traceId")]
    pub trace_id: Option<String>,
}

impl HealthDataBatch {
    /// Total number of samples across every array, used for the
    /// `samples_received` response field and the ingestion trigger payload.
    pub fn total_samples(&self) -> usize {
        self.heart_rate.len()
            + self.hrv.len()
            + self.resting_heart_rate.len()
            + self.walking_heart_rate_average.len()
            + self.respiratory_rate.len()
            + self.oxygen_saturation.len()
            + self.vo2_max.len()
            + self.steps.len()
            + self.active_energy.len()
            + self.exercise_time.len()
            + self.stand_time.len()
            + self.time_in_daylight.len()
            + self.body_mass.len()
            + self.body_fat_percentage.len()
            + self.lean_body_mass.len()
            + self.sleep.len()
            + self.workouts.len()
    }
}
