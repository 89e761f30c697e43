//! Deterministic replacement for the original system's opaque SQL
//! transform: turns a raw sensor batch into the four derived scalars the
//! rest of the pipeline scores against.
//!
//! The heuristics here are intentionally simple and documented rather than
//! a faithful reproduction of any particular physiological model — the
//! pipeline's contract only requires that one derived row be produced per
//! processed batch, carrying the batch's trace id forward.

use crate::types::HealthDataBatch;

/// The four scalars a `Transform` produces from one batch, each clamped
/// to `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedScalars {
    pub recovery: f64,
    pub readiness: f64,
    pub stress: f64,
    pub fatigue: f64,
}

pub trait Transform: Send + Sync {
    fn estimate(&self, batch: &HealthDataBatch) -> DerivedScalars;
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// The built-in estimator: recovery from resting-heart-rate trend,
/// readiness from HRV, stress from elevated heart rate combined with
/// suppressed HRV, fatigue from total recorded sleep.
pub struct DefaultTransform;

impl Transform for DefaultTransform {
    fn estimate(&self, batch: &HealthDataBatch) -> DerivedScalars {
        let resting_hr = mean(batch.resting_heart_rate.iter().map(|s| s.value));
        let heart_rate = mean(batch.heart_rate.iter().map(|s| s.value));
        let hrv = mean(batch.hrv.iter().map(|s| s.value));

        // Lower resting heart rate relative to a 70bpm reference reads as
        // better recovery; higher reads as worse. 70 is a population
        // average baseline, not a per-user calibration.
        let recovery = match resting_hr {
            Some(rhr) => clamp01(0.5 + (70.0 - rhr) / 60.0),
            None => 0.5,
        };

        // HRV above 60ms reads as high readiness, below 20ms as low.
        let readiness = match hrv {
            Some(value) => clamp01((value - 20.0) / 40.0),
            None => 0.5,
        };

        // Stress rises with elevated heart rate and falls with HRV.
        let hr_component = match heart_rate {
            Some(hr) => clamp01((hr - 60.0) / 60.0),
            None => 0.5,
        };
        let hrv_component = 1.0 - readiness;
        let stress = clamp01(0.6 * hr_component + 0.4 * hrv_component);

        // Fatigue falls as total recorded sleep approaches 8 hours.
        let total_sleep_hours: f64 = batch
            .sleep
            .iter()
            .map(|s| (s.end_date - s.start_date).num_seconds().max(0) as f64 / 3600.0)
            .sum();
        let fatigue = clamp01(1.0 - total_sleep_hours / 8.0);

        DerivedScalars { recovery, readiness, stress, fatigue }
    }
}
