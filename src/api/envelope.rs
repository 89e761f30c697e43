//! Response envelope: every successful JSON response is wrapped with a
//! small metadata block so clients have one consistent shape to parse
//! regardless of which endpoint they called.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

const API_VERSION: &str = "v1";

#[derive(Serialize)]
pub struct ResponseMeta {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: &'static str,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self { timestamp: chrono::Utc::now(), version: API_VERSION }
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        Json(ApiResponse { data, meta: ResponseMeta::default() }).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn ok_wraps_the_payload_under_data() {
        let response = ApiResponse::ok(serde_json::json!({"hello": "world"}));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["data"]["hello"], "world");
        assert_eq!(value["meta"]["version"], "v1");
    }
}
