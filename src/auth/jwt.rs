use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::config::{JwtConfig, MAX_TOKEN_HOURS};

/// Identity carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header is required")]
    MissingHeader,
    #[error("invalid authorization header format")]
    InvalidScheme,
    #[error("token has expired")]
    Expired,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is malformed or was issued for another audience")]
    Invalid,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Issues and verifies self-contained identity tokens.
pub trait TokenService: Send + Sync {
    fn issue(&self, user_id: i64, email: &str, role: &str) -> Result<String, AuthError>;
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: i64,
    pub email: String,
    pub role: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// HS256 signer holding only the shared secret and lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.expire_hours.clamp(0, MAX_TOKEN_HOURS) as u64 * 3600),
        }
    }

    fn issue_at(
        &self,
        user_id: i64,
        email: &str,
        role: &str,
        issued_at: OffsetDateTime,
    ) -> Result<String, AuthError> {
        let exp = issued_at + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            email: email.to_string(),
            role: role.to_string(),
            iat: issued_at.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::Signing)?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation
    }
}

impl TokenService for JwtKeys {
    fn issue(&self, user_id: i64, email: &str, role: &str) -> Result<String, AuthError> {
        self.issue_at(user_id, email, role, OffsetDateTime::now_utc())
    }

    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation()).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Invalid,
            }
        })?;
        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(Identity {
            user_id: data.claims.user_id,
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            expire_hours: 1,
        })
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.issue(42, "ada@example.com", "admin").expect("sign");
        let identity = keys.verify(&token).expect("verify");
        assert_eq!(
            identity,
            Identity {
                user_id: 42,
                email: "ada@example.com".into(),
                role: "admin".into(),
            }
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let token = keys.issue_at(7, "a@b.io", "user", issued).expect("sign");
        assert!(matches!(keys.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let good = make_keys("secret-a", "iss", "aud");
        let other = make_keys("secret-b", "iss", "aud");
        let token = other.issue(1, "a@b.io", "user").expect("sign");
        assert!(matches!(good.verify(&token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let bad = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good.issue(1, "a@b.io", "user").expect("sign");
        assert!(matches!(bad.verify(&token), Err(AuthError::Invalid)));
    }

    #[test]
    fn oversized_lifetime_is_clamped() {
        let keys = JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            expire_hours: i64::MAX,
        });
        assert_eq!(keys.ttl, Duration::from_secs(MAX_TOKEN_HOURS as u64 * 3600));
        let token = keys.issue(7, "g@h.io", "user").expect("sign");
        assert_eq!(keys.verify(&token).expect("verify").user_id, 7);
    }

    #[test]
    fn garbage_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(matches!(keys.verify("not.a.jwt"), Err(AuthError::Invalid)));
        assert!(matches!(keys.verify(""), Err(AuthError::Invalid)));
    }
}
