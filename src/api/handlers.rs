//! Request handlers: thin translation between HTTP and the pipeline
//! modules (`ingestion`, `aggregator`, `identity`). No business logic
//! lives here beyond request/response shaping — routing glue stays
//! separate from the modules that do the actual work.

use axum::extract::{Json, State};
use axum::response::Response;
use serde::Serialize;
use uuid::Uuid;

use super::auth::AuthenticatedUser;
use super::envelope::ApiResponse;
use super::state::ApiState;
use crate::error::Result;
use crate::identity::IdentityVerifier;
use crate::ingestion;
use crate::types::{
    AppInteractionRequest, AppleAuthRequest, HealthDataBatch, ResetUserDataRequest, User,
};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn get_health() -> Response {
    ApiResponse::ok(HealthResponse { status: "ok" })
}

pub async fn submit_watch_events(
    State(state): State<ApiState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(batch): Json<HealthDataBatch>,
) -> Result<Response> {
    let response = ingestion::submit_batch(
        &state.warehouse,
        state.watch_events_bus.as_ref(),
        &user_id,
        batch,
    )
    .await?;
    Ok(ApiResponse::ok(response))
}

pub async fn submit_app_interaction(
    State(state): State<ApiState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<AppInteractionRequest>,
) -> Result<Response> {
    if request.user_id != user_id {
        return Err(crate::error::PipelineError::Forbidden(
            "event user_id does not match the authenticated caller".into(),
        ));
    }
    let interaction = ingestion::submit_interaction(&state.warehouse, &user_id, request).await?;
    Ok(ApiResponse::ok(interaction))
}

pub async fn get_context(
    State(state): State<ApiState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Response> {
    let context = crate::aggregator::get_context(
        &state.warehouse,
        &state.catalog,
        crate::config::get(),
        &user_id,
        None,
    )
    .await?;
    Ok(ApiResponse::ok(context))
}

pub async fn reset_user_data(
    State(state): State<ApiState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<ResetUserDataRequest>,
) -> Result<Response> {
    let interaction = ingestion::reset_user_data(&state.warehouse, &user_id, request.scope).await?;
    Ok(ApiResponse::ok(serde_json::json!({
        "scope": request.scope.as_str(),
        "interaction_id": interaction.interaction_id,
    })))
}

pub async fn auth_apple(
    State(state): State<ApiState>,
    Json(request): Json<AppleAuthRequest>,
) -> Result<Response> {
    let identity = state
        .identity
        .verify_apple(&request.identity_token, &request.authorization_code)
        .await?;
    let response = upsert_and_issue_tokens(&state, identity.user_id, identity.email.or(request.email), request.display_name)?;
    Ok(ApiResponse::ok(response))
}

pub async fn auth_apple_mock(State(state): State<ApiState>) -> Result<Response> {
    let response =
        upsert_and_issue_tokens(&state, crate::identity::MOCK_USER_ID.to_string(), None, None)?;
    Ok(ApiResponse::ok(response))
}

fn upsert_and_issue_tokens(
    state: &ApiState,
    user_id: String,
    email: Option<String>,
    display_name: Option<String>,
) -> Result<crate::types::AuthResponse> {
    let existing = state
        .warehouse
        .users
        .get(&user_id)
        .map_err(|e| crate::error::PipelineError::Transient(e.to_string()))?;

    let user = User {
        user_id: user_id.clone(),
        email: email.or_else(|| existing.as_ref().and_then(|u| u.email.clone())),
        display_name: display_name.or_else(|| existing.as_ref().and_then(|u| u.display_name.clone())),
        created_at: existing.map(|u| u.created_at).unwrap_or_else(chrono::Utc::now),
    };
    state
        .warehouse
        .users
        .upsert(&user)
        .map_err(|e| crate::error::PipelineError::Transient(e.to_string()))?;

    Ok(crate::types::AuthResponse {
        user,
        access_token: Uuid::new_v4().to_string(),
        refresh_token: Uuid::new_v4().to_string(),
    })
}
