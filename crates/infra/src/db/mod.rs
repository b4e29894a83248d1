//! Storage backends.
//!
//! Both backends implement the same ports (`ClientRepository`,
//! `ProductRepository`, `ProductCatalog`, `OrderStore`, `OrderQueries`) and the
//! transaction contract from `ordermgmt-core`, so the order workflow runs
//! unchanged on either.

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryDatabase, InMemoryTransaction};
pub use postgres::{PgClientStore, PgDatabase, PgOrderStore, PgProductStore, PgTransaction};
