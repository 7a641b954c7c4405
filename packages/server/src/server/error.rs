//! HTTP error surface.
//!
//! Domain errors are tagged results; this module is the single place they
//! become status codes and the `{error, message, requestId}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::common::context::RequestContext;
use crate::common::entity_ids::UserId;
use crate::common::id::ParseIdError;
use crate::domains::posts::actions::CreatePostError;
use crate::domains::social::actions::FollowError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    message: String,
    request_id: String,
}

/// A fully resolved API error, ready to render.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    request_id: String,
}

impl ApiError {
    fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        request_id: &str,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            request_id: request_id.to_string(),
        }
    }

    pub fn unauthorized(request_id: &str) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "caller identity is required",
            request_id,
        )
    }

    pub fn forbidden(request_id: &str) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "caller may only act on their own resources",
            request_id,
        )
    }

    pub fn bad_user_id(err: ParseIdError, request_id: &str) -> Self {
        let code = match err {
            ParseIdError::Empty => "USER_ID_EMPTY",
            ParseIdError::InvalidFormat => "USER_ID_INVALID_FORMAT",
        };
        Self::new(StatusCode::BAD_REQUEST, code, err.to_string(), request_id)
    }

    /// Unexpected conditions: fatal for this request only. Logged with the
    /// source chain; the caller sees an opaque 500.
    pub fn internal(err: impl std::fmt::Display, request_id: &str) -> Self {
        tracing::error!(error = %err, request_id, "Request failed unexpectedly");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "internal error",
            request_id,
        )
    }

    pub fn from_create_post(err: CreatePostError, request_id: &str) -> Self {
        match err {
            CreatePostError::EmptyContent => Self::new(
                StatusCode::BAD_REQUEST,
                "TWEET_CONTENT_EMPTY",
                err.to_string(),
                request_id,
            ),
            CreatePostError::ContentTooLong => Self::new(
                StatusCode::BAD_REQUEST,
                "TWEET_CONTENT_TOO_LONG",
                err.to_string(),
                request_id,
            ),
            CreatePostError::Database(e) => Self::internal(e, request_id),
            CreatePostError::Internal(e) => Self::internal(e, request_id),
        }
    }

    pub fn from_follow(err: FollowError, request_id: &str) -> Self {
        match err {
            FollowError::SelfFollow => Self::new(
                StatusCode::BAD_REQUEST,
                "SELF_FOLLOW",
                err.to_string(),
                request_id,
            ),
            FollowError::AlreadyFollowing => Self::new(
                StatusCode::CONFLICT,
                "ALREADY_FOLLOWING",
                err.to_string(),
                request_id,
            ),
            FollowError::NotFollowing => Self::new(
                StatusCode::CONFLICT,
                "NOT_FOLLOWING",
                err.to_string(),
                request_id,
            ),
            FollowError::Database(e) => Self::internal(e, request_id),
            FollowError::Internal(e) => Self::internal(e, request_id),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code,
            message: self.message,
            request_id: self.request_id,
        };
        (self.status, Json(body)).into_response()
    }
}

/// The authenticated caller, or 401.
pub fn require_caller(ctx: &RequestContext) -> Result<UserId, ApiError> {
    ctx.caller().ok_or_else(|| ApiError::unauthorized(&ctx.request_id))
}

/// The authenticated caller, who must be `path_user`; 403 otherwise. The
/// path id is still part of the URL shape, but the trust decision is the
/// header's.
pub fn require_self(ctx: &RequestContext, path_user: UserId) -> Result<UserId, ApiError> {
    let caller = require_caller(ctx)?;
    if caller != path_user {
        return Err(ApiError::forbidden(&ctx.request_id));
    }
    Ok(caller)
}
