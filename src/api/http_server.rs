// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::handlers::{
    AddProductResponse, HealthResponse, NonceQuery, NonceResponse, PlaceOrderResponse,
    PublicKeyResponse,
};
use super::ApiError;
use crate::auth::{AuthError, RequestKind};
use crate::config::{chain_name, Posture};
use crate::crypto::Identity;
use crate::gateway::PrivacyGateway;
use crate::version;

pub struct AppState {
    pub gateway: Arc<PrivacyGateway>,
    pub posture: Posture,
    /// Parent of every per-request token; cancelling it abandons pending waits
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(gateway: Arc<PrivacyGateway>, posture: Posture) -> Self {
        Self {
            gateway,
            posture,
            shutdown: CancellationToken::new(),
        }
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/public-key", get(public_key_handler))
        .route("/nonce/:address", get(nonce_handler))
        .route("/placeOrder", post(place_order_handler))
        .route("/addProduct", post(add_product_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let domain = state.gateway.domain();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: version::VERSION_NUMBER.to_string(),
        chain_id: domain.chain_id,
        chain_name: chain_name(domain.chain_id).to_string(),
        contract: format!("{:?}", domain.verifying_contract),
    })
}

async fn version_handler() -> Json<Value> {
    Json(version::get_version_info())
}

async fn public_key_handler(State(state): State<Arc<AppState>>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        public_key: state.gateway.public_key_hex(),
        address: state.gateway.service_identity().to_string(),
    })
}

async fn nonce_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<NonceQuery>,
) -> Result<Json<NonceResponse>, ApiErrorResponse> {
    let request_id = Uuid::new_v4();
    let fail = |error: ApiError| ApiErrorResponse::new(error, request_id, state.posture);

    let identity = address
        .parse::<Identity>()
        .map_err(|e| fail(AuthError::from(e).into()))?;

    let response = match query.pending.as_deref() {
        Some(pending) => {
            let nonce = ethers::types::U256::from_dec_str(pending.trim()).map_err(|_| {
                fail(ApiError::InvalidRequest(format!(
                    "pending nonce '{}' is not a decimal integer",
                    pending
                )))
            })?;
            let resolution = state
                .gateway
                .resolve(identity, nonce)
                .await
                .map_err(|e| fail(e.into()))?;
            NonceResponse::resolved(identity.to_string(), resolution)
        }
        None => {
            let nonce = state
                .gateway
                .next_nonce(identity)
                .await
                .map_err(|e| fail(e.into()))?;
            NonceResponse {
                address: identity.to_string(),
                nonce: nonce.to_string(),
                status: None,
            }
        }
    };
    Ok(Json(response))
}

async fn place_order_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PlaceOrderResponse>, ApiErrorResponse> {
    let outcome = relay(&state, RequestKind::PlaceOrder, body).await?;
    Ok(Json(outcome.into()))
}

async fn add_product_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AddProductResponse>, ApiErrorResponse> {
    let outcome = relay(&state, RequestKind::AddProduct, body).await?;
    Ok(Json(outcome.into()))
}

async fn relay(
    state: &AppState,
    kind: RequestKind,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<crate::contracts::LedgerOutcome, ApiErrorResponse> {
    let request_id = Uuid::new_v4();

    let Json(body) = body.map_err(|rejection| {
        ApiErrorResponse::new(
            ApiError::InvalidRequest(rejection.body_text()),
            request_id,
            state.posture,
        )
    })?;

    let cancel = state.shutdown.child_token();
    state
        .gateway
        .handle(kind, &body, request_id, &cancel)
        .await
        .map_err(|e| {
            tracing::warn!(
                request_id = %request_id,
                kind = kind.as_str(),
                error_type = e.error_type(),
                "Request rejected: {}",
                e
            );
            ApiErrorResponse::new(e.into(), request_id, state.posture)
        })
}

// Error response wrapper
pub struct ApiErrorResponse {
    error: ApiError,
    request_id: Uuid,
    posture: Posture,
}

impl ApiErrorResponse {
    fn new(error: ApiError, request_id: Uuid, posture: Posture) -> Self {
        Self {
            error,
            request_id,
            posture,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let error_response = self
            .error
            .to_response(Some(self.request_id.to_string()), self.posture);

        (status, Json(error_response)).into_response()
    }
}
