//! API layer for the call dispatcher
//!
//! HTTP handlers for allocation, queue management, campaign status and
//! window inspection, and account timezones.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod dto;
pub mod handlers;

// Re-export DTOs (common types)
pub use dto::ApiResponse;

// Re-export handler configuration functions
pub use handlers::{
    configure_accounts, configure_campaigns, configure_dispatch, configure_queue, health_check,
};
