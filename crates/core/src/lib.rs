//! `ordermgmt-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the client, product
//! and sales modules, plus the storage-agnostic transaction contract the order
//! workflow composes its collaborators under.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod transaction;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, PersistenceError, PersistenceResult};
pub use id::{ClientId, OrderId, OrderLineId, ProductId};
pub use money::Money;
pub use transaction::{TransactionScope, TransactionSource};
pub use value_object::ValueObject;
