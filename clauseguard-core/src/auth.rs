use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::UserId;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl User {
    /// `full_name` metadata, else the email local-part, else "User".
    pub fn display_name(&self) -> String {
        if let Some(name) = self.full_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            return name.to_string();
        }
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|s| !s.is_empty())
            .unwrap_or("User")
            .to_string()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Session {
    pub fn expires_within(&self, now_unix: i64, skew_secs: i64) -> bool {
        self.expires_at - now_unix <= skew_secs
    }
}

/// Observable authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Initializing,
    SignedOut,
    SignedIn(User),
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::SignedIn(u) => Some(u),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please enter your password")]
    MissingPassword,

    #[error("New passwords do not match")]
    Mismatch,

    #[error("Password must be at least 8 characters long")]
    TooShort,
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

pub fn validate_email(email: &str) -> Result<(), CredentialError> {
    if email_re().is_match(email.trim()) {
        Ok(())
    } else {
        Err(CredentialError::InvalidEmail)
    }
}

pub fn validate_credentials(email: &str, password: &str) -> Result<(), CredentialError> {
    validate_email(email)?;
    if password.is_empty() {
        return Err(CredentialError::MissingPassword);
    }
    Ok(())
}

pub fn validate_new_password(new: &str, confirm: &str) -> Result<(), CredentialError> {
    if new != confirm {
        return Err(CredentialError::Mismatch);
    }
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(CredentialError::TooShort);
    }
    Ok(())
}
