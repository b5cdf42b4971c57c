//! Accounts and bearer sessions.

use super::password;
use hostel_core::account::{Account, Credentials, Session};
use hostel_core::environment::Clock;
use hostel_core::store::HostelStore;
use hostel_core::types::{AccountId, Role};
use hostel_core::{HostelError, Result};
use std::sync::Arc;
use tracing::{info, instrument, warn};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Registration, login and session validation.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn HostelStore>,
    clock: Arc<dyn Clock>,
    session_ttl: chrono::Duration,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub fn new(
        store: Arc<dyn HostelStore>,
        clock: Arc<dyn Clock>,
        session_ttl: chrono::Duration,
    ) -> Self {
        Self {
            store,
            clock,
            session_ttl,
        }
    }

    /// Register a student account.
    ///
    /// # Errors
    ///
    /// - [`HostelError::Validation`] for missing fields, a malformed email or
    ///   a short password
    /// - [`HostelError::Conflict`] when the email is taken
    #[instrument(skip_all)]
    pub async fn register(&self, credentials: Credentials) -> Result<Account> {
        credentials.validate_for_registration()?;
        let email = credentials.normalized_email();
        if self.store.find_account_by_email(&email).await?.is_some() {
            return Err(HostelError::conflict("User already exists"));
        }

        let account = Account {
            id: AccountId::new(),
            email,
            password_hash: hash(credentials.password).await?,
            role: Role::Student,
            created_at: self.clock.now(),
        };
        self.store.create_account(&account).await?;
        info!(account_id = %account.id, "Student registered");
        Ok(account)
    }

    /// Check credentials and issue a session.
    ///
    /// With `required_role = Some(Role::Admin)` only admin accounts match.
    ///
    /// # Errors
    ///
    /// - [`HostelError::Validation`] when a field is blank
    /// - [`HostelError::Unauthorized`] for unknown accounts or wrong passwords
    #[instrument(skip_all, fields(required_role = ?required_role))]
    pub async fn login(
        &self,
        credentials: Credentials,
        required_role: Option<Role>,
    ) -> Result<(Session, Account)> {
        credentials.require_present()?;
        let email = credentials.normalized_email();

        let account = self
            .store
            .find_account_by_email(&email)
            .await?
            .filter(|account| required_role.is_none_or(|role| account.role == role))
            .ok_or_else(|| HostelError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !verify(credentials.password, account.password_hash.clone()).await? {
            warn!(account_id = %account.id, "Login with wrong password");
            return Err(HostelError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let now = self.clock.now();
        let session = Session {
            token: password::generate_session_token(),
            account_id: account.id,
            role: account.role,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        self.store.create_session(&session).await?;
        info!(account_id = %account.id, role = %account.role, "Session issued");
        Ok((session, account))
    }

    /// End a session. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Storage`] if the store fails.
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.store.delete_session(token).await
    }

    /// Resolve a bearer token to a live session.
    ///
    /// Expired sessions are deleted on sight.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Unauthorized`] for unknown or expired tokens.
    pub async fn authenticate(&self, token: &str) -> Result<Session> {
        let session = self
            .store
            .find_session(token)
            .await?
            .ok_or_else(|| HostelError::Unauthorized("Invalid or expired session".to_string()))?;

        if session.is_expired(self.clock.now()) {
            self.store.delete_session(token).await?;
            return Err(HostelError::Unauthorized(
                "Invalid or expired session".to_string(),
            ));
        }
        Ok(session)
    }

    /// Create an admin account unless the email is already registered.
    ///
    /// Returns `true` when an account was created. An existing student
    /// account with the same email is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Validation`] for unusable credentials, or a
    /// store error.
    pub async fn ensure_admin(&self, credentials: Credentials) -> Result<bool> {
        credentials.validate_for_registration()?;
        let email = credentials.normalized_email();
        if let Some(existing) = self.store.find_account_by_email(&email).await? {
            if existing.role != Role::Admin {
                warn!(account_id = %existing.id, "Bootstrap admin email belongs to a student account");
            }
            return Ok(false);
        }

        let account = Account {
            id: AccountId::new(),
            email,
            password_hash: hash(credentials.password).await?,
            role: Role::Admin,
            created_at: self.clock.now(),
        };
        self.store.create_account(&account).await?;
        info!(account_id = %account.id, "Bootstrap admin created");
        Ok(true)
    }
}

async fn hash(plain: String) -> Result<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| HostelError::Internal(format!("Password hashing task failed: {e}")))?
}

async fn verify(plain: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
        .await
        .map_err(|e| HostelError::Internal(format!("Password check task failed: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hostel_testing::{FixedClock, InMemoryHostelStore, test_clock};

    fn service() -> (AuthService, InMemoryHostelStore, Arc<FixedClock>) {
        let store = InMemoryHostelStore::new();
        let clock = Arc::new(test_clock());
        let auth = AuthService::new(
            Arc::new(store.clone()),
            clock.clone(),
            chrono::Duration::hours(1),
        );
        (auth, store, clock)
    }

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (auth, store, _) = service();
        let account = auth.register(creds("Jane@Uni.ac.ke", "password123")).await.unwrap();
        assert_eq!(account.email, "jane@uni.ac.ke");
        assert_eq!(account.role, Role::Student);

        let (session, _) = auth.login(creds("jane@uni.ac.ke", "password123"), None).await.unwrap();
        assert_eq!(session.account_id, account.id);
        assert_eq!(store.session_count(), 1);
        assert_eq!(auth.authenticate(&session.token).await.unwrap(), session);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (auth, _, _) = service();
        auth.register(creds("jane@uni.ac.ke", "password123")).await.unwrap();
        let err = auth.register(creds("JANE@uni.ac.ke", "password456")).await.unwrap_err();
        assert!(matches!(err, HostelError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_and_student_on_admin_login_are_unauthorized() {
        let (auth, _, _) = service();
        auth.register(creds("jane@uni.ac.ke", "password123")).await.unwrap();

        let wrong = auth.login(creds("jane@uni.ac.ke", "password999"), None).await.unwrap_err();
        assert!(matches!(wrong, HostelError::Unauthorized(_)));

        let not_admin = auth
            .login(creds("jane@uni.ac.ke", "password123"), Some(Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(not_admin, HostelError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_removed() {
        let (auth, store, clock) = service();
        auth.register(creds("jane@uni.ac.ke", "password123")).await.unwrap();
        let (session, _) = auth.login(creds("jane@uni.ac.ke", "password123"), None).await.unwrap();

        clock.advance(chrono::Duration::hours(2));
        let err = auth.authenticate(&session.token).await.unwrap_err();
        assert!(matches!(err, HostelError::Unauthorized(_)));
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let (auth, _, _) = service();
        assert!(auth.ensure_admin(creds("warden@hostel.ac.ke", "password123")).await.unwrap());
        assert!(!auth.ensure_admin(creds("warden@hostel.ac.ke", "password123")).await.unwrap());

        let (session, account) = auth
            .login(creds("warden@hostel.ac.ke", "password123"), Some(Role::Admin))
            .await
            .unwrap();
        assert_eq!(account.role, Role::Admin);
        assert_eq!(session.role, Role::Admin);
    }
}
