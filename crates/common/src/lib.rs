//! Shared identifier types for the order management service.

pub mod types;

pub use types::{ItemId, LineId, OrderId, UserId, Version};
