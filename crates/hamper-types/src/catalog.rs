//! Product catalog and delivery address types
//!
//! The billing engine reads these as lookups only; catalog and address CRUD
//! belong to other services.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UserId;

/// Unique product identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub Uuid);

impl ProductId {
    /// Create a new random product ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a product ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog product as the billing engine sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Product ID
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Base price in cents
    pub price_cents: i64,
    /// Whether the product is currently sold
    pub active: bool,
}

/// Unique delivery address identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressId(pub Uuid);

impl AddressId {
    /// Create a new random address ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an address ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AddressId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AddressId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A delivery address as the billing engine sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    /// Address ID
    pub id: AddressId,
    /// Owning user
    pub user_id: UserId,
    /// Street line
    pub line1: String,
    /// Optional second line
    pub line2: Option<String>,
    /// City
    pub city: String,
    /// Postal code
    pub postal_code: String,
}
