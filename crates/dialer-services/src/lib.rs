//! Dispatch scheduling services
//!
//! Decides which queued call an account's dialer should place next.
//!
//! # Services
//!
//! - `TimezoneResolver` - Effective IANA zone for a campaign or account
//! - `EligibilityFilter` - Due time, campaign status and calling window checks
//! - `CallAllocator` - Ranks eligible calls and claims the winner atomically
//! - `MemoryAllocationStore` - In-process allocation store for tests and
//!   single-node tooling
//!
//! The allocator is generic over `AllocationStore`; production wiring uses
//! `PgCallAllocator`.

pub mod allocator;
pub mod eligibility;
pub mod memory_store;
pub mod timezone;

pub use allocator::{dispatch_order, fairness_key, CallAllocator};
pub use eligibility::{CallWindow, Eligibility, EligibilityFilter};
pub use memory_store::MemoryAllocationStore;
pub use timezone::{resolve_effective_timezone, TimezoneResolver};

/// Allocator backed by PostgreSQL
pub type PgCallAllocator = CallAllocator<dialer_db::PgAllocationStore>;

/// Scheduling constants
pub mod constants {
    /// Zone used when neither campaign nor account configures one
    pub const DEFAULT_TIMEZONE: &str = "UTC";
}
