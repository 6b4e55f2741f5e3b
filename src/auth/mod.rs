//! Authentication and authorization for the notes API.
//!
//! Provides:
//! - Password hashing/verification (bcrypt, fixed cost) — [`password`]
//! - Stateless signed tokens (HMAC-SHA256, one-hour expiry) — [`token`]
//! - The ownership check gating note deletion — [`authorize_delete`]
//!
//! ## Design Decisions
//! - Tokens are self-contained and never stored server-side; there is no
//!   revocation list, so a token stays valid until its expiry even if the
//!   user logs out elsewhere.
//! - The signing secret is injected into [`TokenSigner`] at construction,
//!   never read from ambient globals — test suites swap secrets per run.
//! - Authentication outcome is one of four failures (`token missing`,
//!   `token invalid`, `token expired`, `User not found`) or a resolved user;
//!   the sequencing lives in the gateway's `require_user`.

pub mod password;
pub mod token;

pub use token::TokenSigner;

use crate::error::ApiError;
use crate::store::{Note, User};

/// May `user` delete `note`? Allowed iff the note's owning reference equals
/// the caller's id. A note with no owner denies everyone. Callers must check
/// note existence first — absence is `note not found`, not a denial.
pub fn authorize_delete(user: &User, note: &Note) -> Result<(), ApiError> {
    if note.user.as_deref() == Some(user.id.as_str()) {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: format!("user-{id}"),
            name: None,
            password_hash: "$2b$10$unused".to_string(),
        }
    }

    fn note(owner: Option<&str>) -> Note {
        Note {
            id: "note-1".to_string(),
            content: "HTML is easy".to_string(),
            important: false,
            date: Utc::now(),
            user: owner.map(str::to_string),
        }
    }

    #[test]
    fn owner_may_delete() {
        assert!(authorize_delete(&user("alice"), &note(Some("alice"))).is_ok());
    }

    #[test]
    fn non_owner_is_denied() {
        let err = authorize_delete(&user("bob"), &note(Some("alice"))).unwrap_err();
        assert!(matches!(err, ApiError::PermissionDenied));
    }

    #[test]
    fn ownerless_note_denies_everyone() {
        let err = authorize_delete(&user("alice"), &note(None)).unwrap_err();
        assert!(matches!(err, ApiError::PermissionDenied));
    }
}
