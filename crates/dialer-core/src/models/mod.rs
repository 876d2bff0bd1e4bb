//! Domain models for the call dispatcher
//!
//! This module contains the core domain models used throughout the application.

pub mod account;
pub mod campaign;
pub mod candidate;
pub mod queue_entry;

pub use account::Account;
pub use campaign::{Campaign, CampaignStatus};
pub use candidate::DispatchCandidate;
pub use queue_entry::{CallType, NewQueueEntry, QueueEntry, QueueStatus};
