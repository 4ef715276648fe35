//! Domain layer for the order service.
//!
//! This crate provides:
//! - The line-item reconciliation engine: [`normalize`], [`reconcile`] and
//!   [`calculate_total`]
//! - The order aggregate, its commands and outbound events
//! - The catalog of priced items
//! - Ports for storage, the user directory and event publication
//! - [`OrderService`] and [`CatalogService`], which sequence the above

pub mod catalog;
pub mod error;
pub mod order;
pub mod services;
pub mod store;

pub use catalog::{CatalogError, CatalogItem, CatalogService, NewCatalogItem};
pub use error::{DomainError, ErrorKind};
pub use order::{
    BatchOutcome, CreateOrder, DomainEvent, LineChange, LineItem, LineItemBatch, Money,
    Operation, OperationMap, Order, OrderError, OrderEvent, OrderService, OrderStatus,
    PaymentStatus, PriceLookup, RecordPayment, ReconcileOutcome, TotalChange, UpdateOrder,
    UpdatedOrder, calculate_total, normalize, reconcile,
};
pub use services::{
    DirectoryError, EventPublisher, InMemoryEventPublisher, InMemoryUserDirectory,
    LoggingEventPublisher, PublishError, UserDirectory,
};
pub use store::{CatalogStore, OrderStore, StoreError, StoreResult};
