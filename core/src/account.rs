//! Login accounts and sessions.

use crate::error::{HostelError, Result};
use crate::types::{AccountId, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A login account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID
    pub id: AccountId,
    /// Email, stored lower-cased
    pub email: String,
    /// Argon2 PHC string; never serialized to clients
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Student or admin
    pub role: Role,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// A bearer session issued at login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token
    pub token: String,
    /// Owning account
    pub account_id: AccountId,
    /// Role at issue time
    pub role: Role,
    /// When it was issued
    pub created_at: DateTime<Utc>,
    /// When it stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// True once `now` has reached the expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Credentials submitted to register or log in.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Credentials {
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Plain-text password
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    /// Trimmed, lower-cased email.
    #[must_use]
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }

    /// Checks both fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Validation`] when either field is blank.
    pub fn require_present(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(HostelError::validation("Email and password are required"));
        }
        Ok(())
    }

    /// Registration rules: fields present, plausible email, long enough password.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Validation`] describing the first failed rule.
    pub fn validate_for_registration(&self) -> Result<()> {
        self.require_present()?;
        let email = self.normalized_email();
        let plausible = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !plausible {
            return Err(HostelError::validation(format!("Invalid email '{email}'")));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(HostelError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}
