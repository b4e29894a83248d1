use thiserror::Error;

use ordermgmt_core::{ClientId, PersistenceError, ProductId};

/// Why an order could not be created.
///
/// `EmptyOrder`, `InvalidQuantity` and `ClientNotFound` are detected before any
/// transaction is opened. Every other variant is returned only after the order's
/// transaction has been rolled back, so the caller never has partial state to
/// clean up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("an order must contain at least one line")]
    EmptyOrder,

    #[error("quantity for product {product_id} must be positive, got {quantity}")]
    InvalidQuantity { product_id: ProductId, quantity: i32 },

    #[error("client {0} does not exist")]
    ClientNotFound(ClientId),

    #[error("product {0} does not exist")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    #[error("amounts for product {product_id} x {quantity} exceed the storable range")]
    LineAmountOutOfRange { product_id: ProductId, quantity: i32 },

    #[error("order totals exceed the storable range")]
    OrderTotalOutOfRange,

    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] PersistenceError),
}

impl OrderError {
    /// Stable machine-readable code, for callers that branch on the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::EmptyOrder => "empty_order",
            OrderError::InvalidQuantity { .. } => "invalid_quantity",
            OrderError::ClientNotFound(_) => "client_not_found",
            OrderError::ProductNotFound(_) => "product_not_found",
            OrderError::InsufficientStock { .. } => "insufficient_stock",
            OrderError::LineAmountOutOfRange { .. } | OrderError::OrderTotalOutOfRange => {
                "amount_out_of_range"
            }
            OrderError::PersistenceFailure(_) => "persistence_failure",
        }
    }
}
