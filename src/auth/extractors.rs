//! Per-request resolution of the caller and of path-addressed users.
//!
//! Neither extractor rejects a request for a missing or unknown user: absence
//! is reported as `None` and each handler decides what that means.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Path},
    http::request::Parts,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::{state::AppState, store::User, users::error::ApiError};

/// The authenticated principal, if the bearer token resolves to a live user.
#[derive(Debug)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn require(self) -> Result<User, ApiError> {
        self.0.ok_or(ApiError::NotAuthenticated)
    }
}

fn bearer_subject(parts: &Parts, keys: &JwtKeys) -> Option<Uuid> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;

    let Some(token) = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
    else {
        debug!("unsupported auth scheme");
        return None;
    };

    match keys.verify_access(token) {
        Ok(sub) => Some(sub),
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            None
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let Some(user_id) = bearer_subject(parts, &keys) else {
            return Ok(CurrentUser(None));
        };

        let user = state.repo.find_user(user_id).await.map_err(|e| {
            error!(error = %e, %user_id, "principal lookup failed");
            ApiError::Internal(e)
        })?;
        if user.is_none() {
            warn!(%user_id, "token subject no longer exists");
        }
        Ok(CurrentUser(user))
    }
}

/// The user addressed by the `:id` path segment, `None` when the segment is
/// not a UUID or matches no record.
#[derive(Debug)]
pub struct TargetUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for TargetUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(Path(raw)) = Path::<String>::from_request_parts(parts, state).await else {
            return Ok(TargetUser(None));
        };
        let Ok(id) = Uuid::parse_str(&raw) else {
            debug!(id = %raw, "path id is not a uuid");
            return Ok(TargetUser(None));
        };

        let user = state.repo.find_user(id).await.map_err(|e| {
            error!(error = %e, %id, "user lookup failed");
            ApiError::Internal(e)
        })?;
        Ok(TargetUser(user))
    }
}
