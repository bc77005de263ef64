//! # Component Kinds: Stable Small Indices per Component Type
//!
//! Signatures are bitsets, so every component type needs a small integer to
//! address its bit. The [`TypeIndexRegistry`] hands these out on first use:
//! the first type it sees gets `0`, the next `1`, and so on. An index is never
//! freed or reassigned, so two signatures built at any point in the run can be
//! compared bit for bit.
//!
//! ```text
//! index_for::<Health>()   → ComponentKind(0)   (allocated)
//! index_for::<Velocity>() → ComponentKind(1)   (allocated)
//! index_for::<Health>()   → ComponentKind(0)   (remembered)
//! ```
//!
//! ## Shared vs. Isolated
//!
//! [`TypeIndexRegistry::global`] is the process-wide instance every
//! [`Scene`](crate::scene::Scene) uses unless told otherwise. It is never
//! reset. Tests and embedders that want predictable indices build their own
//! with [`TypeIndexRegistry::new`] and inject it; nothing in the ECS reaches
//! for the global behind your back.
//!
//! The table sits behind a `Mutex` so one registry can be shared through an
//! `Arc` and stored in a `static`. The simulation itself is single-threaded,
//! so the lock is never contended.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Bit index assigned to one component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKind(pub(crate) u32);

impl ComponentKind {
    /// Build a kind from a raw index. Mostly useful for hand-written matchers
    /// and tests; real kinds come from [`TypeIndexRegistry::index_for`].
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// The bit position this kind occupies in a signature.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentKind({})", self.0)
    }
}

#[derive(Default)]
struct KindTable {
    by_type: HashMap<TypeId, ComponentKind>,
    /// Type names, indexed by kind.
    names: Vec<&'static str>,
}

/// Assigns each component type a stable, never-reused [`ComponentKind`].
#[derive(Default)]
pub struct TypeIndexRegistry {
    table: Mutex<KindTable>,
}

impl TypeIndexRegistry {
    /// An empty registry. The first kind it allocates is `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<TypeIndexRegistry> {
        static GLOBAL: OnceLock<Arc<TypeIndexRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(TypeIndexRegistry::new())).clone()
    }

    /// Returns the kind for `T`, allocating the next free index the first
    /// time `T` is seen.
    pub fn index_for<T: 'static>(&self) -> ComponentKind {
        self.index_for_type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Untyped form of [`index_for`](Self::index_for).
    pub fn index_for_type(&self, type_id: TypeId, name: &'static str) -> ComponentKind {
        let mut table = self.lock();
        if let Some(&kind) = table.by_type.get(&type_id) {
            return kind;
        }
        let kind = ComponentKind(table.names.len() as u32);
        table.by_type.insert(type_id, kind);
        table.names.push(name);
        log::trace!("component kind {} assigned to `{}`", kind.0, name);
        kind
    }

    /// Returns the kind for `T` if it has been allocated, without allocating.
    pub fn lookup<T: 'static>(&self) -> Option<ComponentKind> {
        self.lock().by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Full type name registered for `kind`.
    pub fn name_of(&self, kind: ComponentKind) -> Option<&'static str> {
        self.lock().names.get(kind.index()).copied()
    }

    /// Number of kinds allocated so far.
    pub fn len(&self) -> usize {
        self.lock().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, KindTable> {
        // The table is only ever appended to, so a poisoned lock still holds
        // consistent data.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TypeIndexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeIndexRegistry")
            .field("kinds", &self.lock().names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Health;
    struct Velocity;
    struct Sprite;

    #[test]
    fn first_kind_is_zero_and_increments() {
        let registry = TypeIndexRegistry::new();
        assert_eq!(registry.index_for::<Health>(), ComponentKind(0));
        assert_eq!(registry.index_for::<Velocity>(), ComponentKind(1));
        assert_eq!(registry.index_for::<Sprite>(), ComponentKind(2));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn same_type_same_kind() {
        let registry = TypeIndexRegistry::new();
        let a = registry.index_for::<Health>();
        registry.index_for::<Velocity>();
        let b = registry.index_for::<Health>();
        assert_eq!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn distinct_types_never_share() {
        let registry = TypeIndexRegistry::new();
        assert_ne!(registry.index_for::<Health>(), registry.index_for::<Velocity>());
    }

    #[test]
    fn lookup_does_not_allocate() {
        let registry = TypeIndexRegistry::new();
        assert_eq!(registry.lookup::<Health>(), None);
        assert!(registry.is_empty());

        let kind = registry.index_for::<Health>();
        assert_eq!(registry.lookup::<Health>(), Some(kind));
    }

    #[test]
    fn names_are_recorded() {
        let registry = TypeIndexRegistry::new();
        let kind = registry.index_for::<Health>();
        assert!(registry.name_of(kind).unwrap().ends_with("Health"));
        assert_eq!(registry.name_of(ComponentKind(9)), None);
    }

    #[test]
    fn global_is_shared() {
        let a = TypeIndexRegistry::global();
        let b = TypeIndexRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.index_for::<Sprite>(), b.index_for::<Sprite>());
    }
}
