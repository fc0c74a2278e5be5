use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::AuthIdentity,
        jwt::TokenIssuer,
        password::PasswordHasher,
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    error::{AppError, ForbiddenReason},
};

/// Registration does not collect profile fields.
pub const DEFAULT_FIRST_NAME: &str = "User";
pub const DEFAULT_LAST_NAME: &str = "One";

/// Tokens produced by register, login or refresh. `refresh_token` goes to the
/// client as the refresh cookie; `None` leaves the client's cookie as is.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Credential and session lifecycle on top of a [`UserStore`].
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    hasher: PasswordHasher,
}

impl SessionManager {
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenIssuer, hasher: PasswordHasher) -> Self {
        Self {
            store,
            tokens,
            hasher,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    async fn hash_password(&self, plain: &str) -> anyhow::Result<String> {
        let hasher = self.hasher.clone();
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .context("password hashing task")?
    }

    async fn verify_password(&self, plain: &str, hash: Option<&str>) -> anyhow::Result<bool> {
        let hasher = self.hasher.clone();
        let plain = plain.to_owned();
        let hash = hash.map(str::to_owned);
        tokio::task::spawn_blocking(move || match hash {
            Some(hash) => hasher.verify(&plain, &hash),
            None => {
                hasher.verify_dummy(&plain);
                Ok(false)
            }
        })
        .await
        .context("password verification task")?
    }

    /// Signs a pair for `user` and records its refresh token. A failed write
    /// is logged only: the caller still gets both tokens.
    async fn start_session(&self, user: &User) -> Result<IssuedSession, AppError> {
        let pair = self.tokens.issue(&AuthIdentity::from(user))?;
        if let Err(e) = self
            .store
            .set_refresh_token(user.id, Some(pair.refresh_token.as_str()))
            .await
        {
            warn!(user_id = %user.id, error = %e, "failed to persist refresh token");
        }
        Ok(IssuedSession {
            access_token: pair.access_token,
            refresh_token: Some(pair.refresh_token),
        })
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<IssuedSession, AppError> {
        if self.store.find_by_email(email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(ForbiddenReason::EmailExists.into());
        }

        let hash = self.hash_password(password).await?;
        let user = self
            .store
            .create(NewUser {
                email,
                password_hash: &hash,
                first_name: DEFAULT_FIRST_NAME,
                last_name: DEFAULT_LAST_NAME,
            })
            .await?;

        let session = self.start_session(&user).await?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(session)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AppError> {
        let user = self.store.find_by_email(email).await?;
        let valid = self
            .verify_password(password, user.as_ref().map(|u| u.password_hash.as_str()))
            .await?;

        let user = match user {
            Some(u) if valid => u,
            Some(u) => {
                warn!(user_id = %u.id, "login invalid password");
                return Err(ForbiddenReason::InvalidCredentials.into());
            }
            None => {
                warn!(email = %email, "login unknown email");
                return Err(ForbiddenReason::InvalidCredentials.into());
            }
        };

        let session = self.start_session(&user).await?;
        info!(user_id = %user.id, "user logged in");
        Ok(session)
    }

    /// Trades the stored refresh token for a new pair and rotates it.
    pub async fn refresh(
        &self,
        id: Uuid,
        presented: Option<&str>,
    ) -> Result<IssuedSession, AppError> {
        let presented = presented
            .filter(|t| !t.is_empty())
            .ok_or(ForbiddenReason::MissingRefreshToken)?;

        let user = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ForbiddenReason::UserNotFound)?;

        if user.refresh_token.as_deref() != Some(presented) {
            warn!(user_id = %id, "refresh token does not match stored token");
            return Err(ForbiddenReason::Unauthorized.into());
        }

        let pair = self.tokens.issue(&AuthIdentity::from(&user))?;
        let refresh_token = match self
            .store
            .rotate_refresh_token(user.id, presented, &pair.refresh_token)
            .await
        {
            Ok(true) => Some(pair.refresh_token),
            Ok(false) => {
                warn!(user_id = %id, "refresh token replaced by a concurrent request");
                return Err(ForbiddenReason::Unauthorized.into());
            }
            Err(e) => {
                // The previous token is still the stored one; keep it in use.
                warn!(user_id = %id, error = %e, "failed to rotate refresh token");
                None
            }
        };

        info!(user_id = %id, rotated = refresh_token.is_some(), "session refreshed");
        Ok(IssuedSession {
            access_token: pair.access_token,
            refresh_token,
        })
    }

    pub async fn logout(&self, id: Uuid) -> Result<(), AppError> {
        self.store.set_refresh_token(id, None).await?;
        info!(user_id = %id, "user logged out");
        Ok(())
    }

    /// Replaces the password and revokes the stored refresh token.
    pub async fn reset_password(
        &self,
        id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ForbiddenReason::Unauthorized)?;

        if !self
            .verify_password(current_password, Some(user.password_hash.as_str()))
            .await?
        {
            warn!(user_id = %id, "reset password with incorrect current password");
            return Err(ForbiddenReason::IncorrectPassword.into());
        }

        let hash = self.hash_password(new_password).await?;
        // Revoke first: if that fails the old password is left in place.
        self.store.set_refresh_token(id, None).await?;
        self.store.set_password_hash(id, &hash).await?;
        info!(user_id = %id, "password reset");
        Ok(())
    }
}
