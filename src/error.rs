//! The service's closed error taxonomy and its HTTP rendering.
//!
//! Every failure a handler can produce is one of these variants; the response
//! mapping below is the only place status codes are assigned, and it matches
//! exhaustively — no string inspection, no downcasting. Internal failures are
//! logged with full detail and rendered to the client as a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::auth::token::TokenError;
use crate::store::StoreError;

/// Everything the HTTP surface can answer with besides a success payload.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing required fields. Message is surfaced verbatim.
    #[error("{0}")]
    Validation(String),

    /// Resource id not in the expected shape.
    #[error("malformatted id")]
    MalformedId,

    /// Registration with a username that already exists.
    #[error("expected `username` to be unique")]
    DuplicateUsername,

    /// Login with an unknown username or a wrong password. Deliberately one
    /// message for both, so the response does not reveal which usernames exist.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Route requires identity and no bearer token was presented.
    #[error("token missing")]
    TokenMissing,

    /// Token is undecodable or carries a bad signature.
    #[error("token invalid")]
    TokenInvalid,

    /// Token is authentic but past its expiry. Distinct from `TokenInvalid`
    /// so clients can prompt a re-login instead of treating it as an attack.
    #[error("token expired")]
    TokenExpired,

    /// Token was authentic but its user no longer exists in the store.
    #[error("User not found")]
    UserNotFound,

    /// Well-formed note id with no matching note.
    #[error("note not found")]
    NoteNotFound,

    /// Authenticated, but not the owner of the target note.
    #[error("only the owner may delete a note")]
    PermissionDenied,

    /// Anything unexpected — store failure, programming error. The wrapped
    /// detail is logged, never sent to the client.
    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    /// Status code for each variant.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::MalformedId => StatusCode::BAD_REQUEST,
            ApiError::DuplicateUsername => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::TokenMissing => StatusCode::UNAUTHORIZED,
            ApiError::TokenInvalid => StatusCode::UNAUTHORIZED,
            ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::UserNotFound => StatusCode::NOT_FOUND,
            ApiError::NoteNotFound => StatusCode::NOT_FOUND,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            tracing::error!("unhandled error: {err:#}");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => ApiError::DuplicateUsername,
            StoreError::Sqlite(_) => ApiError::Internal(err.into()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed | TokenError::BadSignature => ApiError::TokenInvalid,
            TokenError::Expired => ApiError::TokenExpired,
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::MalformedId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::DuplicateUsername.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::TokenMissing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenInvalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NoteNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::PermissionDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn token_errors_map_to_distinct_variants() {
        assert!(matches!(
            ApiError::from(TokenError::Malformed),
            ApiError::TokenInvalid
        ));
        assert!(matches!(
            ApiError::from(TokenError::BadSignature),
            ApiError::TokenInvalid
        ));
        assert!(matches!(
            ApiError::from(TokenError::Expired),
            ApiError::TokenExpired
        ));
    }

    #[test]
    fn duplicate_username_is_not_a_generic_validation_error() {
        let err = ApiError::from(StoreError::DuplicateUsername);
        assert!(matches!(err, ApiError::DuplicateUsername));
        assert_eq!(err.to_string(), "expected `username` to be unique");
    }

    #[test]
    fn internal_detail_is_not_in_the_client_message() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused at 10.0.0.7"));
        assert_eq!(err.to_string(), "internal server error");
    }

    #[test]
    fn token_messages_are_distinct() {
        let missing = ApiError::TokenMissing.to_string();
        let invalid = ApiError::TokenInvalid.to_string();
        let expired = ApiError::TokenExpired.to_string();
        assert_ne!(missing, invalid);
        assert_ne!(invalid, expired);
        assert_ne!(missing, expired);
    }
}
