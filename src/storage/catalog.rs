//! Intervention catalog: operator-maintained, loaded from TOML at
//! startup and held in memory. The pipeline never writes to it.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::CatalogEntry;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "intervention")]
    entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    by_key: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn load(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading intervention catalog at {path}"))?;
        let file: CatalogFile =
            toml::from_str(&raw).with_context(|| format!("parsing intervention catalog at {path}"))?;
        let by_key = file
            .entries
            .into_iter()
            .map(|entry| (entry.intervention_key.clone(), entry))
            .collect();
        Ok(Self { by_key })
    }

    pub fn get(&self, intervention_key: &str) -> Option<&CatalogEntry> {
        self.by_key.get(intervention_key)
    }

    /// Candidate rows for a selector decision: matching `metric`/`level`,
    /// enabled, in no particular order (the caller scores and picks).
    pub fn candidates_for(&self, metric: &str, level: &str) -> Vec<&CatalogEntry> {
        self.by_key
            .values()
            .filter(|entry| entry.enabled && entry.metric == metric && entry.level == level)
            .collect()
    }

    #[cfg(test)]
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let by_key = entries.into_iter().map(|e| (e.intervention_key.clone(), e)).collect();
        Self { by_key }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_none_for_unknown_key() {
        let catalog = Catalog::default();
        assert!(catalog.get("stress_high_notification").is_none());
    }

    #[test]
    fn get_returns_the_matching_entry() {
        let catalog = Catalog::from_entries(vec![CatalogEntry {
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
        }]);
        assert_eq!(catalog.get("stress_high_notification").unwrap().level, "high");
    }
}
