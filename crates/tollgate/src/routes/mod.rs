//! HTTP route handlers for Tollgate.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use tollgate_common::{ApiResponse, TollgateError};

use crate::state::AppState;

mod captcha;
mod health;
mod lookup;
mod sms;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))

        // Image CAPTCHA
        .route("/image_codes/{image_code_id}/", get(captcha::image_code))

        // Existence lookups
        .route("/usernames/{username}/", get(lookup::check_username))
        .route("/mobiles/{mobile}/", get(lookup::check_mobile))

        // SMS codes
        .route("/sms_codes/", post(sms::registration_code))
        .route("/sms_codes/recovery/", post(sms::recovery_code))
        .route("/sms_codes/check/", post(sms::check_code))

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A verification error rendered as an API envelope
pub struct ApiError(pub TollgateError);

impl From<TollgateError> for ApiError {
    fn from(err: TollgateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Dependency details stay in the log.
        let message = match &err {
            TollgateError::StoreUnavailable(_) | TollgateError::RegistryUnavailable(_) => {
                tracing::error!(error = %err, "Dependency failure");
                "Service temporarily unavailable".to_string()
            }
            TollgateError::GatewayUnreachable(_) => {
                "SMS service unreachable, try again later".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ApiResponse::<()>::error(err.errno(), message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::diagnostics::SecretSink;
    use crate::gateway::testing::ScriptedGateway;
    use crate::registry::MemoryUserRegistry;
    use crate::store::{CacheStore, MemoryStore};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tollgate_common::constants::{cache_keys, errno};
    use tower::ServiceExt;

    const CHALLENGE_ID: &str = "5a6b7c8d-1e2f-4a3b-9c4d-5e6f7a8b9c0d";

    fn app() -> (Arc<MemoryStore>, Router) {
        let store = Arc::new(MemoryStore::new());
        let registry = MemoryUserRegistry::default();
        registry.add_user("member_01", "13900000001");

        let state = AppState::assemble(
            AppConfig::default(),
            store.clone(),
            Arc::new(ScriptedGateway::accepting()),
            Arc::new(registry),
            SecretSink::disabled(),
        );
        (store, create_router(state))
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_image_code_served_and_stored() {
        let (store, app) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/image_codes/{CHALLENGE_ID}/"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        assert!(store.exists(&cache_keys::image_code(CHALLENGE_ID)).await.unwrap());
    }

    #[tokio::test]
    async fn test_mobile_count_endpoint() {
        let (_, app) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/mobiles/13900000001/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["errno"], errno::OK);
        assert_eq!(body["data"]["count"], 1);
        assert_eq!(body["data"]["mobile"], "13900000001");
    }

    #[tokio::test]
    async fn test_sms_code_flow_over_http() {
        let (store, app) = app();
        store
            .set_with_ttl(&cache_keys::image_code(CHALLENGE_ID), "X7K9", Duration::from_secs(300))
            .await
            .unwrap();

        let body = format!(
            r#"{{"mobile":"13800000000","image_code_id":"{CHALLENGE_ID}","text":"x7k9"}}"#
        );

        let response = app
            .clone()
            .oneshot(post_json("/sms_codes/", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"]["dispatched"], true);

        let response = app.oneshot(post_json("/sms_codes/", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json_body(response).await["errno"], errno::RATE_LIMITED);
    }

    #[tokio::test]
    async fn test_empty_body_is_param_error() {
        let (_, app) = app();
        let response = app.oneshot(post_json("/sms_codes/", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["errno"], errno::PARAM_ERR);
    }

    #[tokio::test]
    async fn test_store_failure_message_is_generic() {
        let response =
            ApiError(TollgateError::StoreUnavailable("redis: connection refused".into()))
                .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["errno"], errno::STORE_ERR);
        assert_eq!(body["errmsg"], "Service temporarily unavailable");
    }
}
