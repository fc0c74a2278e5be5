use std::sync::Arc;

use anyhow::Context;

use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{AuthIdentity, Claims, TokenKind};
use crate::config::JwtConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token is malformed")]
    Malformed,
    #[error("wrong token type")]
    WrongKind,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// Freshly signed access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

struct Keys {
    access: KeyPair,
    refresh: KeyPair,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

/// Signs and verifies both token kinds. Each kind has its own secret.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<Keys>,
}

impl TokenIssuer {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            keys: Arc::new(Keys {
                access: KeyPair::from_secret(&cfg.access_secret),
                refresh: KeyPair::from_secret(&cfg.refresh_secret),
                issuer: cfg.issuer.clone(),
                audience: cfg.audience.clone(),
                access_ttl: Duration::minutes(cfg.access_ttl_minutes),
                refresh_ttl: Duration::minutes(cfg.refresh_ttl_minutes),
            }),
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.keys.refresh_ttl
    }

    fn key_pair(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.keys.access,
            TokenKind::Refresh => &self.keys.refresh,
        }
    }

    fn sign_with_kind(&self, identity: &AuthIdentity, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.keys.access_ttl,
            TokenKind::Refresh => self.keys.refresh_ttl,
        };
        let exp = now
            .checked_add(ttl)
            .with_context(|| format!("{kind:?} token expiry out of range"))?;
        let claims = Claims {
            sub: identity.id,
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.keys.issuer.clone(),
            aud: self.keys.audience.clone(),
            kind,
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &self.key_pair(kind).encoding)?;
        debug!(user_id = %identity.id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn issue(&self, identity: &AuthIdentity) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign_with_kind(identity, TokenKind::Access)?,
            refresh_token: self.sign_with_kind(identity, TokenKind::Refresh)?,
        })
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.keys.audience));
        validation.set_issuer(std::slice::from_ref(&self.keys.issuer));
        let data = decode::<Claims>(token, &self.key_pair(kind).decoding, &validation)?;
        if data.claims.kind != kind {
            return Err(TokenError::WrongKind);
        }
        debug!(user_id = %data.claims.sub, kind = ?kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenKind::Refresh)
    }
}

#[cfg(test)]
pub(crate) fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        access_secret: "access-test-secret".into(),
        refresh_secret: "refresh-test-secret".into(),
        issuer: "test-issuer".into(),
        audience: "test-aud".into(),
        access_ttl_minutes: 5,
        refresh_ttl_minutes: 25,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> AuthIdentity {
        AuthIdentity {
            id: Uuid::new_v4(),
            email: "alice@example.com".into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&test_jwt_config())
    }

    #[test]
    fn access_claims_round_trip() {
        let keys = issuer();
        let who = identity();
        let pair = keys.issue(&who).expect("issue");
        let claims = keys.verify_access(&pair.access_token).expect("verify access");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(AuthIdentity::from(claims), who);
    }

    #[test]
    fn refresh_claims_round_trip_and_outlive_access() {
        let keys = issuer();
        let who = identity();
        let pair = keys.issue(&who).expect("issue");
        let access = keys.verify_access(&pair.access_token).unwrap();
        let refresh = keys.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert_eq!(AuthIdentity::from(refresh.clone()), who);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn pair_uses_distinct_secrets() {
        let keys = issuer();
        let pair = keys.issue(&identity()).unwrap();
        // Each token fails against the other kind's secret.
        assert_eq!(
            keys.verify_refresh(&pair.access_token).unwrap_err(),
            TokenError::BadSignature
        );
        assert_eq!(
            keys.verify_access(&pair.refresh_token).unwrap_err(),
            TokenError::BadSignature
        );
    }

    #[test]
    fn tokens_issued_back_to_back_differ() {
        let keys = issuer();
        let who = identity();
        let a = keys.issue(&who).unwrap();
        let b = keys.issue(&who).unwrap();
        assert_ne!(a.access_token, b.access_token);
        assert_ne!(a.refresh_token, b.refresh_token);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let keys = issuer();
        let who = identity();
        let past = OffsetDateTime::now_utc() - Duration::hours(2);
        let claims = Claims {
            sub: who.id,
            email: who.email,
            first_name: who.first_name,
            last_name: who.last_name,
            iat: past.unix_timestamp() as usize,
            exp: (past + Duration::minutes(5)).unix_timestamp() as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
            kind: TokenKind::Access,
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &keys.keys.access.encoding).unwrap();
        assert_eq!(keys.verify_access(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn kind_mismatch_under_shared_key_is_rejected() {
        let keys = issuer();
        let who = identity();
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: who.id,
            email: who.email,
            first_name: who.first_name,
            last_name: who.last_name,
            iat: now.unix_timestamp() as usize,
            exp: (now + Duration::minutes(5)).unix_timestamp() as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
            kind: TokenKind::Refresh,
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &keys.keys.access.encoding).unwrap();
        assert_eq!(keys.verify_access(&token).unwrap_err(), TokenError::WrongKind);
    }

    #[test]
    fn unrepresentable_expiry_is_an_error() {
        let mut cfg = test_jwt_config();
        cfg.refresh_ttl_minutes = 10_000_000_000;
        let err = TokenIssuer::new(&cfg).issue(&identity()).unwrap_err();
        assert!(err.to_string().contains("expiry out of range"));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(
            issuer().verify_access("not.a.jwt").unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let good = issuer();
        let mut cfg = test_jwt_config();
        cfg.issuer = "bad-iss".into();
        cfg.audience = "bad-aud".into();
        let bad = TokenIssuer::new(&cfg);
        let pair = good.issue(&identity()).unwrap();
        assert!(bad.verify_access(&pair.access_token).is_err());
    }
}
