//! Storage implementations for the domain's order and catalog ports.

pub mod memory;
pub mod postgres;

pub use domain::{CatalogStore, OrderStore, StoreError, StoreResult};
pub use memory::{InMemoryCatalogStore, InMemoryOrderStore};
pub use postgres::{PostgresCatalogStore, PostgresOrderStore, run_migrations};
