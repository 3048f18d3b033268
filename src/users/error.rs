use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Every failure a user endpoint can report.
///
/// Rendered as `{"erreur": "<message>"}` with the matching status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("could not retrieve profile, please reconnect.")]
    NotAuthenticated,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("the submitted JSON could not be interpreted")]
    MalformedInput,
    #[error("{0}")]
    ValidationFailed(String),
    #[error("password confirmation failed, please try again")]
    ConfirmationMismatch,
    #[error("current password is incorrect")]
    InvalidCredentials,
    #[error("problem saving image")]
    StorageFailure,
    #[error("an error occurred during deletion")]
    DeletionFailed,
    #[error("the account was modified concurrently, please retry")]
    Conflict,
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotAuthenticated | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MalformedInput | ApiError::DeletionFailed => StatusCode::BAD_REQUEST,
            ApiError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ConfirmationMismatch => StatusCode::EXPECTATION_FAILED,
            ApiError::InvalidCredentials => StatusCode::NOT_ACCEPTABLE,
            ApiError::StorageFailure => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!(error = %e, "internal error");
        }
        let status = self.status();
        (status, Json(json!({ "erreur": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_contract() {
        assert_eq!(ApiError::NotAuthenticated.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::MalformedInput.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::ValidationFailed(String::new()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::ConfirmationMismatch.status().as_u16(), 417);
        assert_eq!(ApiError::InvalidCredentials.status().as_u16(), 406);
        assert_eq!(ApiError::StorageFailure.status().as_u16(), 415);
        assert_eq!(ApiError::DeletionFailed.status().as_u16(), 400);
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        assert_eq!(err.to_string(), "internal server error");
    }
}
