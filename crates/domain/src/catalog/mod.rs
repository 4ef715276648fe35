//! Catalog of priced items that order lines reference.

mod service;

pub use service::CatalogService;

use common::ItemId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::Money;

/// Shortest accepted item name, after trimming.
pub const MIN_NAME_LEN: usize = 2;

/// Longest accepted item name, after trimming.
pub const MAX_NAME_LEN: usize = 30;

/// Lowest accepted item price.
pub const MIN_PRICE: Decimal = Decimal::ONE;

/// Highest accepted item price.
pub const MAX_PRICE: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// A stored catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub price: Money,
}

/// A catalog entry that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogItem {
    pub name: String,
    pub price: Money,
}

impl NewCatalogItem {
    /// Validates and normalizes the name and price.
    pub fn new(name: &str, price: Money) -> Result<Self, CatalogError> {
        Ok(Self {
            name: validate_name(name)?,
            price: validate_price(price)?,
        })
    }
}

/// Errors raised by catalog validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Item name must be between 2 and 30 characters")]
    InvalidName,

    #[error("Item price must be between 1 and 100000, got {0}")]
    InvalidPrice(Money),

    #[error("Item with name {0} already exists")]
    DuplicateName(String),
}

/// Trims the name and checks its length in characters.
pub fn validate_name(name: &str) -> Result<String, CatalogError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(CatalogError::InvalidName);
    }
    Ok(trimmed.to_string())
}

/// Checks that the price lies within the accepted range.
pub fn validate_price(price: Money) -> Result<Money, CatalogError> {
    if !(MIN_PRICE..=MAX_PRICE).contains(&price.amount()) {
        return Err(CatalogError::InvalidPrice(price));
    }
    Ok(price)
}
