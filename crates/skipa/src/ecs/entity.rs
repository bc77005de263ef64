//! # Entity: A Named Object That Owns Its Components
//!
//! An [`Entity`] is a name, an enabled flag, a [`Transform`] and the
//! [`ComponentList`] that owns every component attached to it. Components
//! never hold a reference back to their entity; hooks learn which entity they
//! belong to through an [`EntityId`] handle on the
//! [`ComponentContext`](super::component_list::ComponentContext).
//!
//! ## Design: Generational Indices
//!
//! Entity handles are recycled when entities are destroyed. A bare counter
//! would let a stale handle silently address whichever entity got the slot
//! next:
//!
//! ```text
//! 1. Spawn entity #5
//! 2. Store a reference: saved = Entity(5)
//! 3. Destroy entity #5
//! 4. Spawn a new entity, which gets recycled index #5
//! 5. Use `saved`: it now refers to the wrong entity!
//! ```
//!
//! So each index is paired with a **generation** counter, bumped every time
//! the slot is recycled:
//!
//! ```text
//! EntityId { index: 5, generation: 0 }  ← first use
//! EntityId { index: 5, generation: 1 }  ← after recycle
//! ```
//!
//! The stale handle still says `generation: 0`, so lookups fail safely.

use std::fmt;
use std::sync::Arc;

use super::bits::ComponentBits;
use super::component::{Component, ComponentId, TransformChange};
use super::component_list::{ComponentList, SceneLinks};
use super::kind::TypeIndexRegistry;
use crate::math::{Quat, Transform, Vec3};
use crate::time::Time;

/// A lightweight handle to an entity in an
/// [`EntityList`](super::entity_list::EntityList).
///
/// Only valid for the list that created it, and only while its generation
/// matches.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    /// Slot index in the allocator. Recycled when the entity is destroyed.
    pub(crate) index: u32,
    /// Generation counter. Incremented each time this slot is reused, so stale
    /// handles can be detected.
    pub(crate) generation: u32,
}

impl EntityId {
    /// Returns the raw index. Useful for diagnostics, not for general use.
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Manages entity id allocation and recycling.
///
/// ```text
/// generations: [0, 1, 0, 2, 0]   ← one generation per slot ever allocated
/// free_list:   [1, 3]            ← slots available for reuse
/// len:         5                 ← next fresh index (if free_list is empty)
/// ```
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    free_list: Vec<u32>,
    len: u32,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Reuses a freed slot if one is available, otherwise allocates a fresh
    /// index.
    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free_list.pop() {
            // Generation was already bumped on dealloc.
            let generation = self.generations[index as usize];
            EntityId { index, generation }
        } else {
            let index = self.len;
            self.len += 1;
            self.generations.push(0);
            EntityId {
                index,
                generation: 0,
            }
        }
    }

    /// Returns `false` if the handle was already stale.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.generations[id.index as usize] += 1;
        self.free_list.push(id.index);
        true
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.generations
            .get(id.index as usize)
            .is_some_and(|&generation| generation == id.generation)
    }
}

/// A simulation object: identity, transform, and attached components.
pub struct Entity {
    id: EntityId,
    name: String,
    enabled: bool,
    transform: Transform,
    components: ComponentList,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: String, kinds: Arc<TypeIndexRegistry>) -> Self {
        Self {
            id,
            name,
            enabled: true,
            transform: Transform::IDENTITY,
            components: ComponentList::new(id, kinds),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabled entities still flush their pending components each frame, but
    /// none of their components update.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.components.set_container_enabled(enabled);
    }

    // ── Transform ────────────────────────────────────────────────────

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        if self.transform.translation != translation {
            self.transform.translation = translation;
            self.components
                .on_entity_transform_changed(TransformChange::Translation);
        }
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        if self.transform.rotation != rotation {
            self.transform.rotation = rotation;
            self.components
                .on_entity_transform_changed(TransformChange::Rotation);
        }
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        if self.transform.scale != scale {
            self.transform.scale = scale;
            self.components.on_entity_transform_changed(TransformChange::Scale);
        }
    }

    /// Replace the whole transform. Components hear about each part that
    /// actually changed.
    pub fn set_transform(&mut self, transform: Transform) {
        self.set_translation(transform.translation);
        self.set_rotation(transform.rotation);
        self.set_scale(transform.scale);
    }

    // ── Components ───────────────────────────────────────────────────

    /// Queue a component. It becomes active on this entity's next update.
    pub fn attach<T: Component>(&mut self, component: T) -> ComponentId {
        self.components.attach(component)
    }

    pub fn detach(&mut self, id: ComponentId) -> bool {
        self.components.detach(id)
    }

    pub fn find<T: Component>(&self, include_pending: bool) -> Option<&T> {
        self.components.find::<T>(include_pending)
    }

    pub fn find_mut<T: Component>(&mut self, include_pending: bool) -> Option<&mut T> {
        self.components.find_mut::<T>(include_pending)
    }

    pub fn find_all<T: Component>(&self, include_pending: bool) -> Vec<&T> {
        self.components.find_all::<T>(include_pending)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.components.has::<T>()
    }

    pub fn set_component_enabled(&mut self, id: ComponentId, enabled: bool) -> bool {
        self.components.set_enabled(id, enabled)
    }

    pub fn signature(&self) -> &ComponentBits {
        self.components.signature()
    }

    pub fn components(&self) -> &ComponentList {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentList {
        &mut self.components
    }

    pub(crate) fn update(&mut self, links: &mut SceneLinks<'_>, time: &Time) {
        self.components.update(links, time);
    }

    pub(crate) fn teardown(&mut self, links: &mut SceneLinks<'_>) {
        self.components.remove_all(links);
    }

    /// Withdraw from the scene without running hooks.
    pub(crate) fn leave(&mut self, links: &mut SceneLinks<'_>) {
        self.components.deregister_all(links);
    }

    /// Rejoin under a new handle, possibly in another scene.
    pub(crate) fn join(
        &mut self,
        id: EntityId,
        kinds: Arc<TypeIndexRegistry>,
        links: &mut SceneLinks<'_>,
    ) {
        self.id = id;
        self.components.rebind(id, kinds);
        self.components.register_all(links);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("signature", self.components.signature())
            .finish()
    }
}
