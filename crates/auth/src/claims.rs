use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_core::{TenantId, UserId};

use crate::{RequestIdentity, Role};

/// Bearer token claims once signature verification has succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the authenticated user.
    pub sub: UserId,

    /// Tenant the token is scoped to. Platform-level tokens carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// Role names held in that tenant at issue time.
    #[serde(default)]
    pub roles: Vec<Role>,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    pub fn into_identity(self) -> RequestIdentity {
        RequestIdentity::new(Some(self.sub), self.tenant_id, self.roles)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed or unverifiable token: {0}")]
    Invalid(String),
}

/// Check the time window of already-decoded claims.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Decode + verify a bearer token into claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HMAC-SHA256 shared-secret validator.
pub struct Hs256JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign claims with the same secret (dev tooling and tests).
    pub fn issue(&self, claims: &JwtClaims) -> Result<String, TokenValidationError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenValidationError::Invalid(e.to_string()))
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator").finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        // Time checks are done against the caller's clock below.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenValidationError::Invalid(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            tenant_id: Some(TenantId::new()),
            roles: vec![Role::new("Admin")],
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn issued_token_validates_into_identity() {
        let now = Utc::now();
        let validator = Hs256JwtValidator::new("secret");
        let original = claims(now);

        let token = validator.issue(&original).unwrap();
        let decoded = validator.validate(&token, now).unwrap();

        assert_eq!(decoded.sub, original.sub);
        let identity = decoded.into_identity();
        assert_eq!(identity.user_id(), Some(original.sub));
        assert_eq!(identity.tenant_id(), original.tenant_id);
        assert_eq!(identity.roles(), &[Role::new("Admin")]);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = Hs256JwtValidator::new("a").issue(&claims(now)).unwrap();

        let err = Hs256JwtValidator::new("b").validate(&token, now).unwrap_err();
        assert!(matches!(err, TokenValidationError::Invalid(_)));
    }

    #[test]
    fn expired_claims_are_rejected() {
        let now = Utc::now();
        let c = claims(now);
        assert_eq!(
            validate_claims(&c, now + Duration::hours(1)),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&c, now - Duration::hours(1)),
            Err(TokenValidationError::NotYetValid)
        );
    }
}
