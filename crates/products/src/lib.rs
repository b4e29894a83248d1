//! Products domain module.
//!
//! Catalog records, their validation rules, and the ports storage backends
//! implement: maintenance (`ProductRepository`) and the transactional lookup +
//! stock decrement used when placing orders (`ProductCatalog`).

pub mod product;

pub use product::{Product, ProductCatalog, ProductDetails, ProductRepository, StockDecrement};
