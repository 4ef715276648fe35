//! Domain error types.

use common::{ItemId, OrderId, UserId, Version};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::order::OrderError;
use crate::services::{DirectoryError, PublishError};
use crate::store::StoreError;

/// Broad classification of a [`DomainError`], for callers that map errors
/// onto transport responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is invalid.
    BadInput,
    /// A referenced order, item or user does not exist.
    NotFound,
    /// The request raced with another writer or clashes with stored data.
    Conflict,
    /// A collaborator could not be reached.
    Unavailable,
    /// Anything else.
    Internal,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the order model.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Catalog validation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// An error occurred in a store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Some of the requested orders do not exist.
    #[error("Missing orders: {}", join(.0))]
    OrdersNotFound(Vec<OrderId>),

    /// The catalog item does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// Some of the referenced catalog items do not exist.
    #[error("Missing items: {}", join(.0))]
    ItemsNotFound(Vec<ItemId>),

    /// The user does not exist.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The user directory could not answer.
    #[error("User directory unavailable: {0}")]
    UserDirectoryUnavailable(String),

    /// The client's copy of the order is stale.
    #[error("Order {order_id} is at version {actual}, not {expected}")]
    StaleVersion {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// The event could not be published.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl DomainError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Order(OrderError::PriceMissing { .. }) => ErrorKind::NotFound,
            DomainError::Order(_) => ErrorKind::BadInput,
            DomainError::Catalog(_) => ErrorKind::BadInput,
            DomainError::Store(StoreError::ConcurrencyConflict { .. }) => ErrorKind::Conflict,
            DomainError::Store(StoreError::DuplicateOrder(_)) => ErrorKind::Conflict,
            DomainError::Store(StoreError::DuplicateItemName(_)) => ErrorKind::BadInput,
            DomainError::Store(StoreError::ItemInUse(_)) => ErrorKind::Conflict,
            DomainError::Store(StoreError::Backend(_)) => ErrorKind::Internal,
            DomainError::OrderNotFound(_)
            | DomainError::OrdersNotFound(_)
            | DomainError::ItemNotFound(_)
            | DomainError::ItemsNotFound(_)
            | DomainError::UserNotFound(_) => ErrorKind::NotFound,
            DomainError::StaleVersion { .. } => ErrorKind::Conflict,
            DomainError::UserDirectoryUnavailable(_) => ErrorKind::Unavailable,
            DomainError::Publish(_) => ErrorKind::Internal,
        }
    }
}

impl From<DirectoryError> for DomainError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::UserNotFound(user_id) => DomainError::UserNotFound(user_id),
            DirectoryError::Unavailable(reason) => DomainError::UserDirectoryUnavailable(reason),
        }
    }
}

fn join<T: std::fmt::Display>(ids: &[T]) -> String {
    let parts: Vec<String> = ids.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}
