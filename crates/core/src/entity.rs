//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Master records and stock documents implement this so stores can key them
/// without knowing their concrete shape.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
