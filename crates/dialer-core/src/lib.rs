//! Campaign Dialer Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the call dispatch scheduler. It includes:
//!
//! - Domain models (QueueEntry, Campaign, Account, DispatchCandidate)
//! - Repository traits and the transactional allocation store seam
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::{AppConfig, FairnessScope, SchedulerConfig};
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
