//! Trusted caller identity.
//!
//! `X-User-Id` carries the authenticated user's canonical id, validated
//! upstream; this middleware only parses it. A missing header leaves the
//! context anonymous (individual handlers decide whether that is a 401); a
//! malformed header is rejected here with a 400.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::common::context::RequestContext;
use crate::common::entity_ids::UserId;
use crate::common::id::ParseIdError;
use crate::server::error::ApiError;

use super::request_id::RequestId;

pub const USER_ID_HEADER: &str = "x-user-id";

pub async fn caller_identity_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();

    let caller = match request.headers().get(USER_ID_HEADER) {
        None => None,
        Some(value) => {
            let raw = match value.to_str() {
                Ok(raw) => raw,
                Err(_) => {
                    return ApiError::bad_user_id(ParseIdError::InvalidFormat, &request_id)
                        .into_response()
                }
            };
            match UserId::parse(raw) {
                Ok(id) => Some(id),
                Err(e) => return ApiError::bad_user_id(e, &request_id).into_response(),
            }
        }
    };

    request
        .extensions_mut()
        .insert(RequestContext::new(caller, request_id));

    next.run(request).await
}
