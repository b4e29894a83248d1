//! Explicit unit-of-work contract.
//!
//! A transaction is a value: it is acquired once from a [`TransactionSource`],
//! passed by `&mut` to every collaborator that must write under it, and consumed
//! by [`TransactionScope::commit`] or [`TransactionScope::rollback`].
//!
//! Implementations must roll back when a transaction is dropped without being
//! committed. Cancelling a future that owns a transaction (timeout, client
//! disconnect) therefore undoes everything written under it.

use crate::error::PersistenceResult;

/// An open transaction handle.
#[async_trait::async_trait]
pub trait TransactionScope: Send {
    /// Make every write performed under this transaction durable and visible.
    async fn commit(self) -> PersistenceResult<()>;

    /// Discard every write performed under this transaction.
    async fn rollback(self) -> PersistenceResult<()>;
}

/// Something that can open transactions (a connection pool, an in-memory store).
#[async_trait::async_trait]
pub trait TransactionSource: Send + Sync {
    type Tx: TransactionScope;

    async fn begin(&self) -> PersistenceResult<Self::Tx>;
}
