//! Data Transfer Objects (DTOs) for API requests and responses

pub mod account;
pub mod campaign;
pub mod common;
pub mod dispatch;
pub mod queue;

pub use account::*;
pub use campaign::*;
pub use common::*;
pub use dispatch::*;
pub use queue::*;
