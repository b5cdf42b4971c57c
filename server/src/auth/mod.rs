//! Accounts, sessions and role checks.

pub mod handlers;
pub mod middleware;
pub mod password;
pub mod service;
pub mod setup;

pub use middleware::{BearerToken, RequireAdmin, SessionUser};
pub use service::AuthService;
