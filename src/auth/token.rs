//! Stateless signed tokens: HMAC-SHA256 over JSON claims.
//!
//! Wire format is two base64url (no padding) segments, `payload.signature`.
//! The payload is the claims object `{username, id, exp}`; the signature is
//! HMAC-SHA256 of the payload segment under a process-wide secret injected at
//! construction. Nothing is persisted — validity is signature plus expiry.
//!
//! Verification order matters: the signature is checked before the expiry so
//! an expired-but-authentic token reports `Expired`, never `BadSignature`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Token lifetime: one hour from issuance.
pub const TOKEN_TTL_SECS: i64 = 3600;

/// The signed payload carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username at issuance time. Informational; identity resolution uses `id`.
    pub username: String,
    /// The user's store id.
    pub id: String,
    /// Expiry as unix seconds. At or past this instant the token is dead.
    pub exp: i64,
}

/// Why a token failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not two base64url segments, or the payload is not a claims object.
    #[error("token is structurally malformed")]
    Malformed,
    /// Signature does not match the payload under this signer's secret.
    #[error("token signature mismatch")]
    BadSignature,
    /// Authentic, but at or past its expiry.
    #[error("token expired")]
    Expired,
}

/// Issues and verifies tokens under one injected secret.
pub struct TokenSigner {
    key: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    /// Mint a token asserting `{username, id}` for the next hour.
    pub fn issue(&self, username: &str, user_id: &str) -> String {
        self.issue_with_ttl(username, user_id, TOKEN_TTL_SECS)
    }

    /// Mint with an explicit TTL. A zero or negative TTL produces a token
    /// that is already expired.
    pub fn issue_with_ttl(&self, username: &str, user_id: &str, ttl_secs: i64) -> String {
        let claims = Claims {
            username: username.to_string(),
            id: user_id.to_string(),
            exp: epoch_secs() + ttl_secs,
        };
        let payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).expect("claims always serialize"));
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes()));
        format!("{payload}.{signature}")
    }

    /// Verify a presented token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        // Signature first, over the encoded payload segment.
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .expect("HMAC-SHA256 accepts any key length");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let raw = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)?;

        if epoch_secs() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .expect("HMAC-SHA256 accepts any key length");
        mac.update(bytes);
        mac.finalize().into_bytes().to_vec()
    }
}

fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_resolves_the_same_user() {
        let signer = TokenSigner::new("test-secret");
        let token = signer.issue("mluukkai", "user-123");

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.username, "mluukkai");
        assert_eq!(claims.id, "user-123");
        assert!(claims.exp > epoch_secs());
        assert!(claims.exp <= epoch_secs() + TOKEN_TTL_SECS);
    }

    #[test]
    fn expired_token_is_expired_not_invalid() {
        let signer = TokenSigner::new("test-secret");
        let token = signer.issue_with_ttl("mluukkai", "user-123", -10);

        assert_eq!(signer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn zero_ttl_is_already_expired() {
        let signer = TokenSigner::new("test-secret");
        let token = signer.issue_with_ttl("mluukkai", "user-123", 0);

        assert_eq!(signer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_fails_the_signature() {
        let issuing = TokenSigner::new("secret-one");
        let verifying = TokenSigner::new("secret-two");
        let token = issuing.issue("mluukkai", "user-123");

        assert_eq!(verifying.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn same_secret_across_signers_interoperates() {
        let issuing = TokenSigner::new("shared-secret");
        let verifying = TokenSigner::new("shared-secret");
        let token = issuing.issue("mluukkai", "user-123");

        assert!(verifying.verify(&token).is_ok());
    }

    #[test]
    fn tampered_payload_fails_the_signature() {
        let signer = TokenSigner::new("test-secret");
        let token = signer.issue("mluukkai", "user-123");
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = Claims {
            username: "mallory".to_string(),
            id: "user-999".to_string(),
            exp: epoch_secs() + 3600,
        };
        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert_eq!(signer.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn expired_tampered_token_still_reports_signature_first() {
        // An attacker must not learn that a forged token's claims would have
        // been expired.
        let signer = TokenSigner::new("test-secret");
        let token = signer.issue_with_ttl("mluukkai", "user-123", -10);
        let (payload, _) = token.split_once('.').unwrap();
        let forged = format!("{payload}.{}", URL_SAFE_NO_PAD.encode(b"bogus-sig"));

        assert_eq!(signer.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn garbage_tokens_are_malformed() {
        let signer = TokenSigner::new("test-secret");

        assert_eq!(signer.verify(""), Err(TokenError::Malformed));
        assert_eq!(signer.verify("no-dot-here"), Err(TokenError::Malformed));
        assert_eq!(
            signer.verify("??not-base64??.??also-not??"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn signed_non_claims_payload_is_malformed() {
        // Authentic signature over bytes that are not a claims object.
        let signer = TokenSigner::new("test-secret");
        let payload = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        let signature = URL_SAFE_NO_PAD.encode(signer.sign(payload.as_bytes()));
        let token = format!("{payload}.{signature}");

        assert_eq!(signer.verify(&token), Err(TokenError::Malformed));
    }
}
