use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::User;

/// Type of JWT: access or refresh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload shared by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,          // user ID
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub iat: usize,         // issued at (unix timestamp)
    pub exp: usize,         // expires at (unix timestamp)
    pub iss: String,        // issuer
    pub aud: String,        // audience
    pub kind: TokenKind,    // token type
    pub jti: Uuid,          // unique per token
}

/// Identity attached to a request once its token has been verified.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthIdentity {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<Claims> for AuthIdentity {
    fn from(c: Claims) -> Self {
        Self {
            id: c.sub,
            email: c.email,
            first_name: c.first_name,
            last_name: c.last_name,
        }
    }
}

impl From<&User> for AuthIdentity {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
        }
    }
}
