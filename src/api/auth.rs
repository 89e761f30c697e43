//! Bearer-token extraction: every authenticated route pulls the caller's
//! user id out of the `Authorization` header via the configured
//! `IdentityVerifier`, matching the original system's `get_current_user`
//! dependency.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::state::ApiState;
use crate::error::PipelineError;

pub struct AuthenticatedUser(pub String);

impl FromRequestParts<ApiState> for AuthenticatedUser {
    type Rejection = PipelineError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| PipelineError::Auth("missing Authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| PipelineError::Auth("Authorization header is not a bearer token".into()))?;

        let user_id = state.identity.resolve_bearer(token).await?;
        Ok(AuthenticatedUser(user_id))
    }
}
