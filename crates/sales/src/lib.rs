//! Sales orders domain module.
//!
//! Order records, line pricing, the order storage ports, and the order-creation
//! workflow that ties client lookup, catalog stock and order storage together in
//! one transaction. Storage backends live in `ordermgmt-infra`.

pub mod error;
pub mod order;
pub mod pricing;
pub mod store;
pub mod workflow;

pub use error::OrderError;
pub use order::{CreateOrder, Order, OrderLine, OrderLineRequest};
pub use pricing::{LineAmounts, PricingPolicy};
pub use store::{OrderQueries, OrderStore};
pub use workflow::{OrderPlacement, OrderWorkflow};
