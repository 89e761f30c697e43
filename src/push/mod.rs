//! Push delivery: sending a selected intervention to a device. Delivery
//! failure is never fatal to the selector — an instance that fails to
//! send simply stays in `created` status instead of advancing to `sent`,
//! matching the original system's "send or log and move on" behavior.

use async_trait::async_trait;

use crate::types::CatalogEntry;

#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Attempts delivery. `Ok(true)` means the push was accepted by the
    /// provider (instance should advance to `sent`); `Ok(false)` means
    /// there was no device token to send to (not an error, just nothing
    /// to do); `Err` means the provider call itself failed. `instance_id`
    /// is embedded in the outbound payload so the client can correlate the
    /// notification with the intervention instance it came from.
    async fn send(
        &self,
        device_token: Option<&str>,
        entry: &CatalogEntry,
        instance_id: &str,
    ) -> anyhow::Result<bool>;
}

/// Sends via Apple Push Notification service. Stubbed as a single opaque
/// HTTP call — APNs wire-protocol internals are out of scope.
pub struct ApnsProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl ApnsProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into() }
    }
}

#[async_trait]
impl PushProvider for ApnsProvider {
    async fn send(&self, device_token: Option<&str>, entry: &CatalogEntry, instance_id: &str) -> anyhow::Result<bool> {
        let Some(token) = device_token else {
            tracing::info!(intervention_key = %entry.intervention_key, "no device token, skipping push");
            return Ok(false);
        };

        #[derive(serde::Serialize)]
        struct PushRequest<'a> {
            device_token: &'a str,
            title: &'a str,
            body: &'a str,
            instance_id: &'a str,
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&PushRequest { device_token: token, title: &entry.title, body: &entry.body, instance_id })
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

/// Never sends anything; used in tests so the selector's scoring and
/// suppression logic can be exercised without network calls.
pub struct NullProvider;

#[async_trait]
impl PushProvider for NullProvider {
    async fn send(&self, _device_token: Option<&str>, _entry: &CatalogEntry, _instance_id: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CatalogEntry {
        CatalogEntry {
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
        }
    }

    #[tokio::test]
    async fn null_provider_never_reports_success() {
        let provider = NullProvider;
        assert!(!provider.send(Some("token"), &entry(), "inst-1").await.unwrap());
        assert!(!provider.send(None, &entry(), "inst-1").await.unwrap());
    }
}
