//! Startup provisioning of the bootstrap admin account.

use super::AuthService;
use crate::config::AuthConfig;
use hostel_core::Result;
use hostel_core::account::Credentials;
use tracing::{info, warn};

/// Create the admin named by `ADMIN_EMAIL`/`ADMIN_PASSWORD` when absent.
///
/// Does nothing unless both are set.
///
/// # Errors
///
/// Returns the registration or store error.
pub async fn bootstrap_admin(auth: &AuthService, config: &AuthConfig) -> Result<()> {
    match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => {
            let created = auth
                .ensure_admin(Credentials {
                    email: email.clone(),
                    password: password.clone(),
                })
                .await?;
            if !created {
                info!("Bootstrap admin already present");
            }
        }
        (Some(_), None) | (None, Some(_)) => {
            warn!("ADMIN_EMAIL and ADMIN_PASSWORD must both be set to create an admin");
        }
        (None, None) => {}
    }
    Ok(())
}
