//! `PostgreSQL` storage for the hostel booking service.
//!
//! This crate provides [`PostgresHostelStore`], the production implementation
//! of [`HostelStore`](hostel_core::store::HostelStore). It uses sqlx with:
//!
//! - Connection pooling
//! - Embedded migrations (`./migrations`)
//! - One transaction per booking transition, guarded by a conditional
//!   `UPDATE ... WHERE status = <expected>`
//! - Unique constraints mapped to [`HostelError::Conflict`](hostel_core::HostelError::Conflict)
//!
//! # Example
//!
//! ```no_run
//! use hostel_postgres::PostgresHostelStore;
//!
//! # async fn example() -> hostel_core::Result<()> {
//! let store = PostgresHostelStore::connect("postgres://localhost/hostel", 10).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;
mod store;

pub use store::{PoolConfig, PostgresHostelStore};
