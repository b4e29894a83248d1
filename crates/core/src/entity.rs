//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Clients, products and orders are entities: two records with the same id are
/// the same record, even if an edit changed their other fields.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
