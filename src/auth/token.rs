use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the claims encoded within a session token.
///
/// Only the user's identity is carried; no password material, no roles.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject of the token, the user's unique identifier.
    pub sub: Uuid,
    /// Unique token id. Keeps tokens minted in the same second distinct.
    pub jti: Uuid,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

/// Mints and verifies HS256 session tokens with a secret supplied at construction.
///
/// Issuing is pure: storing the token in the user's session list is the
/// caller's job.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

/// Longest accepted token lifetime (ten years).
pub const MAX_TTL_HOURS: i64 = 24 * 365 * 10;

impl TokenIssuer {
    /// # Arguments
    /// * `secret` - HMAC signing secret.
    /// * `ttl_hours` - Lifetime of each issued token, `1..=MAX_TTL_HOURS`.
    ///
    /// A lifetime outside that range is rejected: zero or less would mint
    /// tokens that are already expired.
    pub fn new(secret: &str, ttl_hours: i64) -> Result<Self, AppError> {
        let ttl = Some(ttl_hours)
            .filter(|hours| (1..=MAX_TTL_HOURS).contains(hours))
            .and_then(Duration::try_hours)
            .ok_or_else(|| {
                AppError::InternalServerError(format!(
                    "token lifetime must be between 1 and {} hours, got {}",
                    MAX_TTL_HOURS, ttl_hours
                ))
            })?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    /// Generates a token for the given user ID.
    ///
    /// # Returns
    /// The signed token, or `AppError::InternalServerError` if encoding fails.
    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::InternalServerError("token expiry overflow".into()))?;

        let claims = Claims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp() as usize,
            exp: expiration.timestamp() as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Verifies a token's signature and expiry and decodes its claims.
    ///
    /// # Returns
    /// `AppError::Unauthorized` with the uniform message if the token is
    /// malformed, signed with another secret, or expired.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("token rejected: {}", e);
                AppError::unauthenticated()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation_and_verification() {
        let issuer = TokenIssuer::new("test_secret_for_gen_verify", 24).unwrap();
        let user_id = Uuid::new_v4();
        let token = issuer.issue(user_id).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_tokens_for_same_user_are_distinct() {
        let issuer = TokenIssuer::new("secret", 24).unwrap();
        let user_id = Uuid::new_v4();
        let first = issuer.issue(user_id).unwrap();
        let second = issuer.issue(user_id).unwrap();
        assert_ne!(first, second);
        assert_eq!(issuer.verify(&second).unwrap().sub, user_id);
    }

    #[test]
    fn test_token_expiration() {
        let issuer = TokenIssuer::new("test_secret_for_expiration", 24).unwrap();
        let past = Utc::now() - Duration::hours(2);
        let claims_expired = Claims {
            sub: Uuid::new_v4(),
            jti: Uuid::new_v4(),
            iat: (past - Duration::hours(1)).timestamp() as usize,
            exp: past.timestamp() as usize,
        };
        let expired_token = encode(
            &Header::default(),
            &claims_expired,
            &EncodingKey::from_secret("test_secret_for_expiration".as_bytes()),
        )
        .unwrap();

        match issuer.verify(&expired_token) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, crate::error::UNAUTHENTICATED),
            other => panic!("Token should have been rejected as expired, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_token_signature() {
        let issuer = TokenIssuer::new("a_completely_different_secret", 24).unwrap();
        let other = TokenIssuer::new("someone_elses_secret", 24).unwrap();
        let forged = other.issue(Uuid::new_v4()).unwrap();

        assert!(matches!(issuer.verify(&forged), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let issuer = TokenIssuer::new("secret", 24).unwrap();
        for token in ["", "not-a-jwt", "a.b.c", "eyJhbGciOiJub25lIn0.e30."] {
            assert!(
                matches!(issuer.verify(token), Err(AppError::Unauthorized(_))),
                "token {:?} should be rejected",
                token
            );
        }
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let issuer = TokenIssuer::new("secret", 24).unwrap();
        let token = issuer.issue(Uuid::new_v4()).unwrap();
        let other = issuer.issue(Uuid::new_v4()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(issuer.verify(&spliced).is_err());
    }

    #[test]
    fn test_lifetime_out_of_range_is_rejected() {
        for hours in [0, -1, MAX_TTL_HOURS + 1, i64::MAX, i64::MIN] {
            assert!(
                matches!(TokenIssuer::new("secret", hours), Err(AppError::InternalServerError(_))),
                "lifetime {} should be rejected",
                hours
            );
        }

        let issuer = TokenIssuer::new("secret", MAX_TTL_HOURS).unwrap();
        let token = issuer.issue(Uuid::new_v4()).unwrap();
        assert!(issuer.verify(&token).is_ok());
    }
}
