//! Collaborators the order service calls out to, with in-memory
//! implementations for tests and local runs.

pub mod publisher;
pub mod users;

pub use publisher::{EventPublisher, InMemoryEventPublisher, LoggingEventPublisher, PublishError};
pub use users::{DirectoryError, InMemoryUserDirectory, UserDirectory};
