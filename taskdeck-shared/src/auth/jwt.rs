/// Session token generation and validation
///
/// This module provides the signed session tokens presented on every
/// TaskDeck request. Tokens are signed using HS256 (HMAC-SHA256) and carry
/// the user's id and username.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: 24 hours from issuance
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
/// - **Opaque failures**: every verification failure (expired, malformed,
///   bad signature) collapses to a single [`TokenError`] so callers never
///   learn which check failed
///
/// # Example
///
/// ```
/// use taskdeck_shared::auth::jwt::{issue_token, verify_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "your-secret-key-at-least-32-bytes!!";
/// let token = issue_token(42, "alice", secret)?;
///
/// let claims = verify_token(&token, secret)?;
/// assert_eq!(claims.sub, 42);
/// assert_eq!(claims.username, "alice");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Session token lifetime
const SESSION_TTL_HOURS: i64 = 24;

/// Token issuer claim value
const ISSUER: &str = "taskdeck";

/// Opaque token failure
///
/// Expired, malformed and badly-signed tokens all produce this one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid session token")]
pub struct TokenError;

/// Session token claims
///
/// # Standard Claims
///
/// - `sub`: Subject (user id)
/// - `iss`: Issuer (always "taskdeck")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
///
/// # Custom Claims
///
/// - `username`: Username at issuance time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user id
    pub sub: i64,

    /// Username at issuance time
    pub username: String,

    /// Issuer - always "taskdeck"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims expiring 24 hours from now
    pub fn new(user_id: i64, username: &str) -> Self {
        Self::with_expiration(user_id, username, Duration::hours(SESSION_TTL_HOURS))
    }

    /// Creates claims with a custom expiration offset
    ///
    /// Negative durations produce already-expired claims, which is how the
    /// tests simulate clock advancement.
    pub fn with_expiration(user_id: i64, username: &str, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            username: username.to_string(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }

    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Issues a signed session token for a user
///
/// # Errors
///
/// Returns [`TokenError`] if encoding fails
pub fn issue_token(user_id: i64, username: &str, secret: &str) -> Result<String, TokenError> {
    sign_claims(&Claims::new(user_id, username), secret)
}

/// Signs an explicit claims value
///
/// Used directly by tests that need non-default expirations.
pub fn sign_claims(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key).map_err(|_| TokenError)
}

/// Validates a session token and extracts its claims
///
/// Verifies the signature, the expiration time, and the issuer. Which of
/// those failed is deliberately not reported.
///
/// # Errors
///
/// Returns [`TokenError`] for any invalid token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|_| TokenError)?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(7, "alice");

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.iss, "taskdeck");
        assert!(!claims.is_expired());
        // 24 hour expiry
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let token = issue_token(42, "bob", SECRET).expect("Should issue token");

        let claims = verify_token(&token, SECRET).expect("Should verify token");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "bob");
        assert_eq!(claims.iss, "taskdeck");
    }

    #[test]
    fn test_verify_with_wrong_secret() {
        let token = issue_token(1, "alice", SECRET).expect("Should issue token");

        let result = verify_token(&token, "completely-different-secret-value!!!");
        assert_eq!(result.unwrap_err(), TokenError);
    }

    #[test]
    fn test_verify_expired_token() {
        // Token that expired an hour ago (simulated clock)
        let claims = Claims::with_expiration(1, "alice", Duration::seconds(-3600));
        assert!(claims.is_expired());

        let token = sign_claims(&claims, SECRET).expect("Should sign claims");
        let result = verify_token(&token, SECRET);

        assert_eq!(result.unwrap_err(), TokenError);
    }

    #[test]
    fn test_verify_malformed_token() {
        assert_eq!(verify_token("not-a-token", SECRET).unwrap_err(), TokenError);
        assert_eq!(verify_token("", SECRET).unwrap_err(), TokenError);
    }

    #[test]
    fn test_failure_causes_are_indistinguishable() {
        // Expired, tampered and garbage tokens must all yield the same value
        let expired = sign_claims(
            &Claims::with_expiration(1, "a", Duration::seconds(-60)),
            SECRET,
        )
        .unwrap();
        let mut tampered = issue_token(1, "a", SECRET).unwrap();
        tampered.push('x');

        let e1 = verify_token(&expired, SECRET).unwrap_err();
        let e2 = verify_token(&tampered, SECRET).unwrap_err();
        let e3 = verify_token("garbage", SECRET).unwrap_err();

        assert_eq!(e1, e2);
        assert_eq!(e2, e3);
        assert_eq!(e1.to_string(), "invalid session token");
    }

    #[test]
    fn test_token_does_not_leak_password_material() {
        let token = issue_token(42, "carol", SECRET).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();

        let payload = serde_json::to_string(&claims).unwrap();
        assert!(!payload.contains("password"));
        assert!(!payload.contains("hash"));
    }
}
