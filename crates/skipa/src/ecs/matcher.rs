//! # Matcher: Which Entities a System Cares About
//!
//! A [`Matcher`] is three [`ComponentBits`] and one rule:
//!
//! ```text
//! matches(sig) = (sig & all_of) == all_of     every required kind present
//!              && (sig & none_of) == 0        no excluded kind present
//!              && (any_of empty || sig & any_of != 0)
//! ```
//!
//! An empty matcher matches everything, including an entity with no
//! components at all. Matchers are immutable once built.
//!
//! Build one from raw kinds, or let [`MatcherBuilder`] resolve types through a
//! [`TypeIndexRegistry`]:
//!
//! ```ignore
//! let matcher = Matcher::builder(&registry)
//!     .all::<Transform>()
//!     .all::<Velocity>()
//!     .none::<Frozen>()
//!     .build();
//! ```

use super::bits::ComponentBits;
use super::kind::{ComponentKind, TypeIndexRegistry};

/// Immutable interest predicate over entity signatures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matcher {
    all_of: ComponentBits,
    none_of: ComponentBits,
    any_of: ComponentBits,
}

impl Matcher {
    /// The matcher that accepts every signature.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start a typed matcher. Kinds are allocated in `registry` as needed.
    pub fn builder(registry: &TypeIndexRegistry) -> MatcherBuilder<'_> {
        MatcherBuilder {
            registry,
            matcher: Matcher::empty(),
        }
    }

    /// Require every kind in `kinds`.
    pub fn all(mut self, kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        for kind in kinds {
            self.all_of.set(kind);
        }
        self
    }

    /// Reject any signature holding one of `kinds`.
    pub fn none(mut self, kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        for kind in kinds {
            self.none_of.set(kind);
        }
        self
    }

    /// Require at least one of `kinds`.
    pub fn any(mut self, kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        for kind in kinds {
            self.any_of.set(kind);
        }
        self
    }

    pub fn matches(&self, signature: &ComponentBits) -> bool {
        signature.contains_all(&self.all_of)
            && !signature.intersects(&self.none_of)
            && (self.any_of.is_empty() || signature.intersects(&self.any_of))
    }

    pub fn is_empty(&self) -> bool {
        self.all_of.is_empty() && self.none_of.is_empty() && self.any_of.is_empty()
    }

    pub fn all_of(&self) -> &ComponentBits {
        &self.all_of
    }

    pub fn none_of(&self) -> &ComponentBits {
        &self.none_of
    }

    pub fn any_of(&self) -> &ComponentBits {
        &self.any_of
    }
}

/// Typed construction of a [`Matcher`].
pub struct MatcherBuilder<'a> {
    registry: &'a TypeIndexRegistry,
    matcher: Matcher,
}

impl MatcherBuilder<'_> {
    pub fn all<T: 'static>(mut self) -> Self {
        self.matcher.all_of.set(self.registry.index_for::<T>());
        self
    }

    pub fn none<T: 'static>(mut self) -> Self {
        self.matcher.none_of.set(self.registry.index_for::<T>());
        self
    }

    pub fn any<T: 'static>(mut self) -> Self {
        self.matcher.any_of.set(self.registry.index_for::<T>());
        self
    }

    pub fn build(self) -> Matcher {
        self.matcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(indices: &[u32]) -> Vec<ComponentKind> {
        indices.iter().map(|&i| ComponentKind(i)).collect()
    }

    fn sig(indices: &[u32]) -> ComponentBits {
        kinds(indices).into_iter().collect()
    }

    #[test]
    fn all_and_none() {
        let s = sig(&[1, 3]);
        let m = Matcher::empty().all(kinds(&[1])).none(kinds(&[2]));
        assert!(m.matches(&s));
    }

    #[test]
    fn all_requires_every_kind() {
        let m = Matcher::empty().all(kinds(&[1, 2]));
        assert!(!m.matches(&sig(&[1, 3])));
        assert!(m.matches(&sig(&[1, 2, 3])));
    }

    #[test]
    fn none_rejects_any_overlap() {
        let m = Matcher::empty().none(kinds(&[3, 8]));
        assert!(!m.matches(&sig(&[1, 3])));
        assert!(m.matches(&sig(&[1, 2])));
    }

    #[test]
    fn any_needs_one_overlap() {
        let m = Matcher::empty().any(kinds(&[5, 6]));
        assert!(!m.matches(&sig(&[1, 3])));
        assert!(m.matches(&sig(&[1, 6])));
    }

    #[test]
    fn empty_matches_everything() {
        let m = Matcher::empty();
        assert!(m.is_empty());
        assert!(m.matches(&sig(&[1, 3])));
        assert!(m.matches(&ComponentBits::new()));
    }

    #[test]
    fn typed_builder_uses_registry_kinds() {
        struct Health;
        struct Dead;
        struct Armor;

        let registry = TypeIndexRegistry::new();
        let m = Matcher::builder(&registry)
            .all::<Health>()
            .none::<Dead>()
            .any::<Armor>()
            .build();

        let health = registry.lookup::<Health>().unwrap();
        let dead = registry.lookup::<Dead>().unwrap();
        let armor = registry.lookup::<Armor>().unwrap();
        assert!(m.all_of().contains(health));
        assert!(m.none_of().contains(dead));
        assert!(m.any_of().contains(armor));

        assert!(m.matches(&[health, armor].into_iter().collect()));
        assert!(!m.matches(&[health].into_iter().collect()));
        assert!(!m.matches(&[health, armor, dead].into_iter().collect()));
    }
}
