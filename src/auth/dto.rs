use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} should not be empty")));
    }
    Ok(())
}

/// Request body for registration and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl CredentialsRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_non_empty("email", &self.email)?;
        if !is_valid_email(&self.email) {
            return Err(AppError::BadRequest("email must be an email".into()));
        }
        require_non_empty("password", &self.password)
    }
}

/// Request body for password reset.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_non_empty("currentPassword", &self.current_password)?;
        require_non_empty("newPassword", &self.new_password)
    }
}

/// Response returned after register, login or refresh. The refresh token
/// travels in a cookie, never in the body.
#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}
