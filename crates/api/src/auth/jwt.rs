//! Verification of HS256 access tokens issued by the auth provider.
//!
//! The provider signs tokens with a shared secret. The game only needs the
//! subject (the player's UUID) and whether the session is anonymous.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sleuth_core::account::Principal;
use uuid::Uuid;

/// Claims read from every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the player's user id.
    pub sub: Uuid,
    /// Anonymous sessions can later be upgraded to permanent accounts.
    #[serde(default)]
    pub is_anonymous: bool,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.sub,
            is_anonymous: self.is_anonymous,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret shared with the auth provider.
    pub secret: String,
}

impl JwtConfig {
    /// Load from `AUTH_JWT_SECRET`.
    ///
    /// # Panics
    ///
    /// Panics if `AUTH_JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret = std::env::var("AUTH_JWT_SECRET")
            .expect("AUTH_JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "AUTH_JWT_SECRET must not be empty");
        Self { secret }
    }
}

/// Validate and decode an access token.
///
/// Validates the signature and expiration. Audience is not checked; the
/// provider's tokens carry one the game does not rely on.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default(); // HS256, validates exp
    validation.validate_aud = false;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

/// Sign a token for `principal` valid for `ttl_secs`.
///
/// The auth provider issues real tokens; this is used by local tooling and
/// tests.
pub fn issue_token(
    principal: Principal,
    ttl_secs: i64,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: principal.id,
        is_anonymous: principal.is_anonymous,
        exp: chrono::Utc::now().timestamp() + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let config = test_config();
        let principal = Principal::anonymous(Uuid::new_v4());

        let token = issue_token(principal, 60, &config).unwrap();
        let claims = validate_token(&token, &config).unwrap();
        assert_eq!(claims.principal(), principal);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(Principal::permanent(Uuid::new_v4()), 60, &test_config()).unwrap();
        let other = JwtConfig {
            secret: "a-different-secret-of-reasonable-length".to_string(),
        };
        assert!(validate_token(&token, &other).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let token = issue_token(Principal::permanent(Uuid::new_v4()), -3600, &config).unwrap();
        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn missing_anonymous_claim_means_permanent() {
        let config = test_config();
        let sub = Uuid::new_v4();
        let claims = serde_json::json!({ "sub": sub, "exp": chrono::Utc::now().timestamp() + 60 });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        let decoded = validate_token(&token, &config).unwrap();
        assert_eq!(decoded.principal(), Principal::permanent(sub));
    }
}
