//! Call Dispatcher Database Layer
//!
//! This crate provides PostgreSQL database access and repository implementations
//! for the call dispatch scheduler. It includes:
//!
//! - Connection pool management and embedded migrations with sqlx
//! - Repository implementations for queue entries, campaigns and accounts
//! - `PgAllocationStore`, the transactional select-and-stamp backend

pub mod allocation_store;
pub mod pool;
pub mod repositories;

pub use allocation_store::{PgAllocationStore, PgAllocationTx};
pub use pool::{create_pool, create_pool_from_config, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use dialer_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
