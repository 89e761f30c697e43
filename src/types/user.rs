//! User identity and device registration records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered app user, upserted on Apple sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Bearer/refresh token pair handed back from the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Incoming Apple sign-in request.
#[derive(Debug, Clone, Deserialize)]
pub struct AppleAuthRequest {
    pub identity_token: String,
    pub authorization_code: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Latest known push token for a user. Upserts are last-write-wins by
/// `updated_at`, never regressing to an older registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub user_id: String,
    pub device_token: String,
    pub platform: String,
    pub updated_at: DateTime<Utc>,
}
