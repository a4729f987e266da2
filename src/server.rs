//! # API Server
//!
//! The `axum` server used by the web client: push subscription
//! registration, the test notification, the admin banner message, and the
//! Prometheus `/metrics` endpoint when metrics are enabled.
//!
//! The server stops serving when the application's shutdown signal fires.

use crate::admin::{AdminBoard, AdminMessage, AdminMessageKind};
use crate::core::{NotificationMessage, PushSubscription};
use crate::dispatcher::Dispatcher;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::error;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, trace, warn};

/// Returned with 401 when the admin key does not match.
pub const AUTH_FAILED: &str = "認証に失敗しました";

/// Shared state behind every handler.
#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Dispatcher,
    pub admin: Arc<AdminBoard>,
    pub admin_key: String,
    /// Title of the test notification.
    pub title: String,
    pub prom_handle: Option<PrometheusHandle>,
}

impl ApiState {
    fn authorized(&self, key: Option<&str>) -> bool {
        !self.admin_key.is_empty() && key == Some(self.admin_key.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

/// Body of an admin message update. Absent fields reset to their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminMessageUpdate {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    is_visible: Option<bool>,
    #[serde(default, rename = "type")]
    kind: Option<AdminMessageKind>,
}

/// A server for the collaborator HTTP surface.
pub struct ApiServer {
    listener: TcpListener,
    state: ApiState,
    shutdown_rx: watch::Receiver<bool>,
}

impl ApiServer {
    /// Creates a new `ApiServer` but does not spawn it.
    ///
    /// # Arguments
    ///
    /// * `listener` - A `TcpListener` that has already been bound to an address.
    /// * `state` - Handles shared with the rest of the application.
    /// * `shutdown_rx` - A watch channel receiver for graceful shutdown.
    pub fn new(listener: TcpListener, state: ApiState, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            state,
            shutdown_rx,
        }
    }

    /// Builds the route table.
    pub fn router(state: ApiState) -> Router {
        let mut router = Router::new()
            .route("/subscribe", post(subscribe))
            .route("/test-notification", post(test_notification))
            .route("/api/admin-message", post(set_admin_message).get(get_admin_message))
            .route("/api/admin-message-full", get(get_admin_message_full));

        if let Some(handle) = state.prom_handle.clone() {
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        router.with_state(state)
    }

    /// Returns a future that runs the server until a shutdown signal is received.
    pub fn run(mut self) -> impl Future<Output = ()> {
        let app = Self::router(self.state.clone());

        async move {
            tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => {
                    trace!("API server received shutdown signal via select.");
                }
                result = axum::serve(self.listener, app.into_make_service()) => {
                    if let Err(e) = result {
                        error!("API server error: {}", e);
                    }
                }
            }
            trace!("API server task finished.");
        }
    }
}

async fn subscribe(
    State(state): State<ApiState>,
    Json(subscription): Json<PushSubscription>,
) -> impl IntoResponse {
    state.dispatcher.registry().register(subscription);
    (StatusCode::CREATED, Json(json!({})))
}

async fn test_notification(State(state): State<ApiState>) -> impl IntoResponse {
    info!("Test notification requested");
    drop(state.dispatcher.dispatch(NotificationMessage::test(state.title.clone())));
    (StatusCode::CREATED, Json(json!({})))
}

fn unauthorized() -> Response {
    warn!("Rejected admin request with invalid key");
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": AUTH_FAILED }))).into_response()
}

async fn set_admin_message(
    State(state): State<ApiState>,
    Query(query): Query<KeyQuery>,
    body: Result<Json<AdminMessageUpdate>, JsonRejection>,
) -> Response {
    if !state.authorized(query.key.as_deref()) {
        return unauthorized();
    }
    let Json(update) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection.into_response(),
    };

    let message = state.admin.set(
        update.text.unwrap_or_default(),
        update.is_visible.unwrap_or(false),
        update.kind.unwrap_or_default(),
    );
    Json(json!({ "success": true, "message": message })).into_response()
}

async fn get_admin_message(State(state): State<ApiState>) -> Response {
    match state.admin.public_view() {
        Some(message) => Json(message).into_response(),
        None => Json(json!({ "isVisible": false })).into_response(),
    }
}

async fn get_admin_message_full(
    State(state): State<ApiState>,
    Query(query): Query<KeyQuery>,
) -> Response {
    if !state.authorized(query.key.as_deref()) {
        return unauthorized();
    }
    Json::<AdminMessage>(state.admin.full()).into_response()
}
