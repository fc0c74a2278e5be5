use std::marker::PhantomData;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use thiserror::Error;
use tracing::warn;

use super::{
    claims::{AuthIdentity, Claims},
    cookies::{read_cookie, REFRESH_COOKIE},
    jwt::{TokenError, TokenIssuer},
};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("Missing Authorization header")]
    MissingAuthorization,
    #[error("Invalid Authorization header")]
    InvalidScheme,
    #[error("Refresh token not found")]
    MissingRefreshCookie,
    #[error("{0}")]
    Token(#[from] TokenError),
}

/// Where a token comes from and which secret checks it.
pub trait TokenGuard: Send + Sync + 'static {
    fn extract(headers: &HeaderMap) -> Result<String, GuardError>;
    fn verify(tokens: &TokenIssuer, token: &str) -> Result<Claims, TokenError>;
}

/// `Authorization: Bearer <access token>`.
pub struct AccessGuard;

impl TokenGuard for AccessGuard {
    fn extract(headers: &HeaderMap) -> Result<String, GuardError> {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(GuardError::MissingAuthorization)?;
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(GuardError::InvalidScheme)?;
        Ok(token.to_string())
    }

    fn verify(tokens: &TokenIssuer, token: &str) -> Result<Claims, TokenError> {
        tokens.verify_access(token)
    }
}

/// `refresh_token` cookie.
pub struct RefreshGuard;

impl TokenGuard for RefreshGuard {
    fn extract(headers: &HeaderMap) -> Result<String, GuardError> {
        read_cookie(headers, REFRESH_COOKIE)
            .filter(|t| !t.is_empty())
            .ok_or(GuardError::MissingRefreshCookie)
    }

    fn verify(tokens: &TokenIssuer, token: &str) -> Result<Claims, TokenError> {
        tokens.verify_refresh(token)
    }
}

/// A request whose token passed guard `G`.
pub struct Authenticated<G> {
    pub identity: AuthIdentity,
    pub token: String,
    _guard: PhantomData<fn() -> G>,
}

pub type AccessUser = Authenticated<AccessGuard>;
pub type RefreshUser = Authenticated<RefreshGuard>;

pub fn authenticate<G: TokenGuard>(
    tokens: &TokenIssuer,
    headers: &HeaderMap,
) -> Result<Authenticated<G>, GuardError> {
    let token = G::extract(headers)?;
    let claims = G::verify(tokens, &token).map_err(|e| {
        warn!(reason = %e, "token rejected");
        GuardError::Token(e)
    })?;
    Ok(Authenticated {
        identity: claims.into(),
        token,
        _guard: PhantomData,
    })
}

#[async_trait]
impl<S, G> FromRequestParts<S> for Authenticated<G>
where
    S: Send + Sync,
    TokenIssuer: FromRef<S>,
    G: TokenGuard,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenIssuer::from_ref(state);
        Ok(authenticate::<G>(&tokens, &parts.headers)?)
    }
}
