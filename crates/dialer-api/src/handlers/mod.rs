//! HTTP request handlers

pub mod account;
pub mod campaign;
pub mod dispatch;
pub mod health;
pub mod queue;

pub use account::configure as configure_accounts;
pub use campaign::configure as configure_campaigns;
pub use dispatch::configure as configure_dispatch;
pub use health::health_check;
pub use queue::configure as configure_queue;
