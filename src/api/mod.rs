// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod http_server;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{
    AddProductResponse, HealthResponse, NonceQuery, NonceResponse, PlaceOrderResponse,
    PublicKeyResponse,
};
pub use http_server::{create_app, start_server, ApiErrorResponse, AppState};
