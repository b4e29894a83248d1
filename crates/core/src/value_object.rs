//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**; they are defined entirely by their
/// attribute values and are immutable once built.
///
/// - **Value Object**: `Money`, an order line request, computed line amounts
/// - **Entity**: `Client`, `Product`, `Order` (compared by id)
///
/// To "modify" a value object, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
