//! HS256 access/refresh tokens.
//!
//! Signing and verification are delegated to `jsonwebtoken`; this module only
//! fixes the claim set and lifetimes.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::TokenPair;
use super::errors::AuthError;

pub const TOKEN_INVALID_OR_EXPIRED: &str = "Token is invalid or expired";
pub const TOKEN_NOT_VALID_FOR_ANY_TYPE: &str = "Given token not valid for any token type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: Uuid,
    pub user_id: Uuid,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

/// Lifetimes are clamped to one year so expiry arithmetic cannot overflow.
const TTL_CEILING_SECS: i64 = 365 * 24 * 60 * 60;

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl: Duration::seconds(access_ttl_secs.clamp(-TTL_CEILING_SECS, TTL_CEILING_SECS)),
            refresh_ttl: Duration::seconds(refresh_ttl_secs.clamp(-TTL_CEILING_SECS, TTL_CEILING_SECS)),
        }
    }

    pub fn issue(&self, user_id: Uuid, token_type: TokenType) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            user_id,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| AuthError::TokenError(e.to_string()))
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenType::Access)?,
            refresh: self.issue(user_id, TokenType::Refresh)?,
        })
    }

    /// Verify signature and expiry and require the given token type.
    /// Any failure maps to `InvalidToken` carrying `detail`.
    pub fn verify(&self, token: &str, expected: TokenType, detail: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(err = %e, "token rejected");
                AuthError::InvalidToken(detail.to_string())
            })?;
        if data.claims.token_type != expected {
            return Err(AuthError::InvalidToken(detail.to_string()));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", 300, 86_400)
    }

    #[test]
    fn pair_round_trips_with_types() {
        let issuer = issuer();
        let uid = Uuid::new_v4();
        let pair = issuer.issue_pair(uid).unwrap();
        let access = issuer.verify(&pair.access, TokenType::Access, TOKEN_NOT_VALID_FOR_ANY_TYPE).unwrap();
        let refresh = issuer.verify(&pair.refresh, TokenType::Refresh, TOKEN_INVALID_OR_EXPIRED).unwrap();
        assert_eq!(access.user_id, uid);
        assert_eq!(refresh.user_id, uid);
        assert_ne!(access.jti, refresh.jti);
        assert!(refresh.exp - refresh.iat == 86_400);
    }

    #[test]
    fn oversized_lifetime_is_clamped() {
        let issuer = TokenIssuer::new("test-secret", i64::MAX, i64::MAX);
        let pair = issuer.issue_pair(Uuid::new_v4()).unwrap();
        let refresh = issuer.verify(&pair.refresh, TokenType::Refresh, TOKEN_INVALID_OR_EXPIRED).unwrap();
        assert_eq!(refresh.exp - refresh.iat, TTL_CEILING_SECS);
    }

    #[test]
    fn wrong_type_is_rejected() {
        let issuer = issuer();
        let pair = issuer.issue_pair(Uuid::new_v4()).unwrap();
        let err = issuer.verify(&pair.access, TokenType::Refresh, TOKEN_INVALID_OR_EXPIRED).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(ref d) if d == TOKEN_INVALID_OR_EXPIRED));
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = TokenIssuer::new("test-secret", -120, -60);
        let token = expired.issue(Uuid::new_v4(), TokenType::Refresh).unwrap();
        assert!(issuer().verify(&token, TokenType::Refresh, TOKEN_INVALID_OR_EXPIRED).is_err());
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenIssuer::new("another-secret", 300, 600);
        let token = other.issue(Uuid::new_v4(), TokenType::Access).unwrap();
        assert!(issuer().verify(&token, TokenType::Access, TOKEN_NOT_VALID_FOR_ANY_TYPE).is_err());
        assert!(issuer().verify("not.a.jwt", TokenType::Access, TOKEN_NOT_VALID_FOR_ANY_TYPE).is_err());
    }
}
