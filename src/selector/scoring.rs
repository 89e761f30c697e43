//! Suppression and scoring: given the set of catalog entries that match a
//! stress bucket, decide whether each is currently suppressed by its
//! surface's annoyance history, score the survivors against the user's
//! preference for that surface, and pick a winner.

use crate::types::{CatalogEntry, SurfacePreferences};

/// A candidate's preference signal, read straight from the upstream
/// `surface_preferences` view (never recomputed here).
#[derive(Debug, Clone, Copy)]
pub struct AnnoyanceSignal {
    pub shown_count: u64,
    /// `annoyance_rate`, capped so no surface is permanently locked out
    /// once it crosses the cap.
    pub capped_annoyance: f64,
    pub preference_score: f64,
}

impl AnnoyanceSignal {
    pub fn from_preferences(prefs: &SurfacePreferences, cap: f64) -> Self {
        Self {
            shown_count: prefs.shown_count,
            capped_annoyance: prefs.annoyance_rate.min(cap),
            preference_score: prefs.preference_score,
        }
    }
}

/// A candidate surface is suppressed once it has been shown enough times
/// that its annoyance history is meaningful, and that history is bad
/// enough to cross the threshold. Below `shown_count_threshold` shows,
/// there isn't enough signal to suppress on.
pub fn is_suppressed(
    signal: AnnoyanceSignal,
    shown_count_threshold: u64,
    annoyance_threshold: f64,
) -> bool {
    signal.shown_count >= shown_count_threshold && signal.capped_annoyance > annoyance_threshold
}

/// `final_score = 1.0 + preference_score`, offset so every surviving
/// candidate scores positive even at the most negative preference,
/// keeping the value meaningful on its own in logs.
pub fn final_score(signal: AnnoyanceSignal) -> f64 {
    1.0 + signal.preference_score
}

/// Picks the highest-`final_score` candidate among entries that are not
/// suppressed, breaking ties by the lexicographically smallest
/// `intervention_key` so selection is fully deterministic.
pub fn select_winner<'a>(
    candidates: &'a [(CatalogEntry, AnnoyanceSignal)],
    shown_count_threshold: u64,
    annoyance_threshold: f64,
) -> Option<&'a CatalogEntry> {
    candidates
        .iter()
        .filter(|(_, signal)| !is_suppressed(*signal, shown_count_threshold, annoyance_threshold))
        .max_by(|(a_entry, a_signal), (b_entry, b_signal)| {
            final_score(*a_signal)
                .partial_cmp(&final_score(*b_signal))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b_entry.intervention_key.cmp(&a_entry.intervention_key))
        })
        .map(|(entry, _)| entry)
}
