//! Identity verification: exchanging an Apple identity token for a
//! verified user id. The real verification call is an opaque external
//! dependency, so this module is a thin trait boundary plus a mock
//! implementation for tests and local development.

use async_trait::async_trait;

use crate::error::{PipelineError, Result};

/// The outcome of a successful identity verification.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub user_id: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify_apple(
        &self,
        identity_token: &str,
        authorization_code: &str,
    ) -> Result<VerifiedIdentity>;

    /// Resolves a bearer token on an already-authenticated request into a
    /// user id. Production tokens are opaque session tokens issued by
    /// `/auth/apple`; a `mock.`-prefixed token always resolves to a fixed
    /// user, matching the original system's test bypass.
    async fn resolve_bearer(&self, bearer_token: &str) -> Result<String>;
}

/// Calls out to the (out-of-scope) Apple/Identity Platform verification
/// service. Treated as an opaque async collaborator per the pipeline's
/// scope — this implementation only defines the shape of the call.
pub struct ApplePlatformVerifier {
    client: reqwest::Client,
    verify_endpoint: String,
}

impl ApplePlatformVerifier {
    pub fn new(verify_endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            verify_endpoint: verify_endpoint.into(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for ApplePlatformVerifier {
    async fn verify_apple(
        &self,
        identity_token: &str,
        authorization_code: &str,
    ) -> Result<VerifiedIdentity> {
        #[derive(serde::Serialize)]
        struct VerifyRequest<'a> {
            identity_token: &'a str,
            authorization_code: &'a str,
        }
        #[derive(serde::Deserialize)]
        struct VerifyResponse {
            user_id: String,
            email: Option<String>,
        }

        let response = self
            .client
            .post(&self.verify_endpoint)
            .json(&VerifyRequest { identity_token, authorization_code })
            .send()
            .await
            .map_err(|e| PipelineError::Transient(format!("identity platform unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::Auth(format!(
                "identity platform rejected token: {}",
                response.status()
            )));
        }

        let parsed: VerifyResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Transient(format!("malformed identity response: {e}")))?;

        Ok(VerifiedIdentity { user_id: parsed.user_id, email: parsed.email })
    }

    async fn resolve_bearer(&self, bearer_token: &str) -> Result<String> {
        // Production session tokens are opaque; real verification is out
        // of scope for this crate per the pipeline's boundary.
        if bearer_token.is_empty() {
            return Err(PipelineError::Auth("missing bearer token".into()));
        }
        Ok(bearer_token.to_string())
    }
}

/// Bypasses real verification entirely. Every `mock.`-prefixed token
/// resolves to `mock-user-default`; `verify_apple` always succeeds with
/// that same user. Used in tests and local development, matching the
/// original system's `mock.` token convention.
pub struct MockVerifier;

pub const MOCK_USER_ID: &str = "mock-user-default";

#[async_trait]
impl IdentityVerifier for MockVerifier {
    async fn verify_apple(&self, _identity_token: &str, _authorization_code: &str) -> Result<VerifiedIdentity> {
        Ok(VerifiedIdentity { user_id: MOCK_USER_ID.to_string(), email: None })
    }

    async fn resolve_bearer(&self, bearer_token: &str) -> Result<String> {
        if let Some(rest) = bearer_token.strip_prefix("mock.") {
            let _ = rest;
            return Ok(MOCK_USER_ID.to_string());
        }
        Err(PipelineError::Auth("non-mock token presented to mock verifier".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_verifier_resolves_mock_prefixed_tokens() {
        let verifier = MockVerifier;
        let user_id = verifier.resolve_bearer("mock.anything").await.unwrap();
        assert_eq!(user_id, MOCK_USER_ID);
    }

    #[tokio::test]
    async fn mock_verifier_rejects_non_mock_tokens() {
        let verifier = MockVerifier;
        assert!(verifier.resolve_bearer("real-token").await.is_err());
    }

    #[tokio::test]
    async fn mock_verifier_apple_flow_always_succeeds() {
        let verifier = MockVerifier;
        let identity = verifier.verify_apple("token", "code").await.unwrap();
        assert_eq!(identity.user_id, MOCK_USER_ID);
    }
}
