use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ordermgmt_core::{DomainError, DomainResult, Entity, Money, PersistenceResult, ProductId};

/// A catalog product with finite stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub unit_price: Money,
    /// Units available. Never negative.
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn has_stock_for(&self, quantity: i32) -> bool {
        self.stock >= quantity
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Editable product fields, used for both creation and edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub unit_price: Money,
    pub stock: i32,
}

impl ProductDetails {
    /// Validate and normalize the fields (trimmed text, price rounded to cents).
    pub fn validated(&self) -> DomainResult<ProductDetails> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let unit_price = self.unit_price.rounded();
        if !unit_price.is_positive() {
            return Err(DomainError::validation("unit_price must be positive"));
        }
        if !unit_price.is_storable() {
            return Err(DomainError::validation(format!(
                "unit_price cannot exceed {}",
                Money::MAX_STORABLE
            )));
        }
        if self.stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }

        Ok(ProductDetails {
            name: name.to_string(),
            description: self.description.trim().to_string(),
            unit_price,
            stock: self.stock,
        })
    }
}

/// Outcome of an atomic conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
    /// Stock was reduced. Carries the row as it was read by the same statement.
    Applied { remaining: i32, unit_price: Money },
    /// Current stock is lower than the requested quantity; nothing changed.
    Insufficient { available: i32 },
    /// No product with that id.
    Missing,
}

/// Product lookups and stock mutation, performed under a caller-owned transaction.
///
/// `decrement_stock` must be a single atomic conditional update: decrement only
/// if current stock is at least `quantity`, in one step. A read followed by a
/// separate write lets two concurrent transactions both see enough stock and
/// oversell.
#[async_trait]
pub trait ProductCatalog<Tx: Send>: Send + Sync {
    async fn find_by_id(&self, tx: &mut Tx, id: ProductId) -> PersistenceResult<Option<Product>>;

    async fn decrement_stock(
        &self,
        tx: &mut Tx,
        id: ProductId,
        quantity: i32,
    ) -> PersistenceResult<StockDecrement>;
}

/// Product maintenance port (outside any order transaction).
///
/// Implementations refuse to delete a product referenced by order lines,
/// returning `PersistenceError::Conflict`.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// All products, ordered by id.
    async fn list(&self) -> PersistenceResult<Vec<Product>>;

    async fn get(&self, id: ProductId) -> PersistenceResult<Option<Product>>;

    /// Persist a new product; `details` must already be validated.
    async fn insert(&self, details: &ProductDetails) -> PersistenceResult<Product>;

    /// Returns `None` when the product does not exist.
    async fn update(&self, id: ProductId, details: &ProductDetails) -> PersistenceResult<Option<Product>>;

    /// Returns `false` when the product does not exist.
    async fn delete(&self, id: ProductId) -> PersistenceResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(price_cents: i64, stock: i32) -> ProductDetails {
        ProductDetails {
            name: " Widget ".to_string(),
            description: "  blue ".to_string(),
            unit_price: Money::from_cents(price_cents),
            stock,
        }
    }

    #[test]
    fn validation_trims_text() {
        let d = details(1999, 5).validated().unwrap();
        assert_eq!(d.name, "Widget");
        assert_eq!(d.description, "blue");
        assert_eq!(d.unit_price, Money::from_cents(1999));
    }

    #[test]
    fn price_must_be_positive() {
        let err = details(0, 5).validated().unwrap_err();
        assert_eq!(err, DomainError::validation("unit_price must be positive"));
    }

    #[test]
    fn price_is_capped_at_the_column_range() {
        let mut d = details(1999, 5);
        d.unit_price = Money::MAX_STORABLE;
        assert_eq!(d.validated().unwrap().unit_price, Money::MAX_STORABLE);

        for too_large in [
            Money::MAX_STORABLE.checked_add(Money::from_cents(1)).unwrap(),
            Money::MAX_STORABLE.checked_mul(1_000_000).unwrap(),
        ] {
            d.unit_price = too_large;
            assert_eq!(
                d.validated().unwrap_err(),
                DomainError::validation("unit_price cannot exceed 9999999999999999.99")
            );
        }
    }

    #[test]
    fn stock_cannot_be_negative() {
        let err = details(100, -1).validated().unwrap_err();
        assert_eq!(err, DomainError::validation("stock cannot be negative"));
    }

    #[test]
    fn zero_stock_is_allowed() {
        assert!(details(100, 0).validated().is_ok());
    }

    #[test]
    fn has_stock_for_is_inclusive() {
        let product = Product {
            id: ProductId::from_raw(1),
            name: "Widget".into(),
            description: String::new(),
            unit_price: Money::from_cents(100),
            stock: 4,
            created_at: Utc::now(),
        };
        assert!(product.has_stock_for(4));
        assert!(!product.has_stock_for(5));
    }
}
