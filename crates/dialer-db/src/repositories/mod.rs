//! Repository implementations
//!
//! This module contains concrete implementations of the repository traits
//! defined in dialer-core, using sqlx for PostgreSQL access.

pub mod account_repo;
pub mod campaign_repo;
pub mod queue_repo;

pub use account_repo::PgAccountRepository;
pub use campaign_repo::PgCampaignRepository;
pub use queue_repo::PgQueueRepository;
