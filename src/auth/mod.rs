// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request authentication: schema checks, freshness and the stage sequence
//! that turns an inbound body into an [`AuthorizedRequest`].

pub mod authenticator;
pub mod error;
pub mod replay_guard;
pub mod request;

pub use authenticator::{AuthStage, AuthorizedRequest, RequestAuthenticator, SchemeSelection};
pub use error::AuthError;
pub use replay_guard::{Clock, FixedClock, FreshnessToken, ReplayGuard, SystemClock};
pub use request::{ProtectedRequest, RequestDetails, RequestKind, UNSIGNED_FIELDS};
