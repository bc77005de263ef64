//! Entity storage with deferred spawn and destroy.
//!
//! Entities follow the same rule as components: structural changes are
//! queued and committed at one point in the frame. [`EntityList::spawn`]
//! hands back an [`EntityId`] right away, and the new entity can be reached
//! through [`get_mut`](EntityList::get_mut) to attach components, but it is
//! not iterated, updated, or offered to any system until
//! [`update_lists`](EntityList::update_lists) commits it. Destroys are
//! committed in the same place, removals first.
//!
//! ```text
//! entities:  [e3, e0, e7]          ← committed, commit order
//! positions: [Some(1), None, None, Some(0), .., Some(2)]
//!                                  ← EntityId::index → position in entities
//! to_add:    [e9]                  ← spawned, not yet committed
//! to_remove: [e0]                  ← destroyed, not yet committed
//! ```

use std::mem;
use std::sync::Arc;

use super::component_list::SceneLinks;
use super::entity::{Entity, EntityAllocator, EntityId};
use super::kind::TypeIndexRegistry;
use crate::time::Time;

pub struct EntityList {
    kinds: Arc<TypeIndexRegistry>,
    allocator: EntityAllocator,
    entities: Vec<Entity>,
    positions: Vec<Option<usize>>,
    to_add: Vec<Entity>,
    to_remove: Vec<EntityId>,
}

impl EntityList {
    pub fn new(kinds: Arc<TypeIndexRegistry>) -> Self {
        Self::with_capacity(kinds, 0)
    }

    pub fn with_capacity(kinds: Arc<TypeIndexRegistry>, capacity: usize) -> Self {
        Self {
            kinds,
            allocator: EntityAllocator::new(),
            entities: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            to_add: Vec::new(),
            to_remove: Vec::new(),
        }
    }

    /// Create an entity. It joins the list on the next commit.
    pub fn spawn(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.allocator.allocate();
        let name = name.into();
        log::trace!("spawn {} ({})", id, name);
        self.to_add.push(Entity::new(id, name, self.kinds.clone()));
        id
    }

    /// Queue an entity for destruction. A spawn that was never committed is
    /// cancelled on the spot. Returns `false` for stale handles and repeated
    /// destroys.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if !self.allocator.is_alive(id) {
            log::warn!("destroy of dead entity {}", id);
            return false;
        }
        if self.to_remove.contains(&id) {
            log::warn!("entity {} is already queued for destruction", id);
            return false;
        }
        if let Some(index) = self.to_add.iter().position(|e| e.id() == id) {
            self.to_add.remove(index);
            self.allocator.deallocate(id);
            return true;
        }
        self.to_remove.push(id);
        true
    }

    /// Take an entity out of the list right now, components and all.
    ///
    /// Its active components are deregistered without hooks, every system
    /// drops it, and `id` goes stale. A queued destroy is cancelled. Hand the
    /// entity to [`insert`](Self::insert), here or in another scene, to bring
    /// it back.
    pub fn take(&mut self, id: EntityId, links: &mut SceneLinks<'_>) -> Option<Entity> {
        if !self.allocator.is_alive(id) {
            log::warn!("take of dead entity {}", id);
            return None;
        }
        self.to_remove.retain(|&queued| queued != id);
        let entity = match self.to_add.iter().position(|e| e.id() == id) {
            Some(index) => self.to_add.remove(index),
            None => {
                let pos = self.position(id)?;
                let mut entity = self.remove_committed(pos);
                entity.leave(links);
                links.membership.entity_removed(id);
                entity
            }
        };
        self.allocator.deallocate(id);
        log::debug!("took {} ({}) out", id, entity.name());
        Some(entity)
    }

    /// Adopt an entity previously [taken](Self::take) from this or another
    /// list. It gets a fresh handle and is committed on the spot: active
    /// components are registered again without hooks, pending ones still
    /// wait for the entity's next flush.
    pub fn insert(&mut self, mut entity: Entity, links: &mut SceneLinks<'_>) -> EntityId {
        let id = self.allocator.allocate();
        let old = entity.id();
        entity.join(id, self.kinds.clone(), links);
        log::debug!("adopted {} ({}) as {}", old, entity.name(), id);
        self.commit(entity, links);
        id
    }

    /// `true` from spawn until the destroy is committed.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    /// Committed or pending entity by handle.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        match self.position(id) {
            Some(pos) => Some(&self.entities[pos]),
            None => self.to_add.iter().find(|e| e.id() == id),
        }
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        match self.position(id) {
            Some(pos) => Some(&mut self.entities[pos]),
            None => self.to_add.iter_mut().find(|e| e.id() == id),
        }
    }

    /// Committed entities in commit order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    /// Number of committed entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities spawned but not yet committed.
    pub fn pending_len(&self) -> usize {
        self.to_add.len()
    }

    /// Commit queued destroys, then queued spawns.
    ///
    /// A destroyed entity has every component removed immediately, is dropped
    /// from every system, and its handle goes stale. A spawned entity is
    /// offered to every system so that matchers with no requirements pick it
    /// up before it has any components.
    pub fn update_lists(&mut self, links: &mut SceneLinks<'_>) {
        for id in mem::take(&mut self.to_remove) {
            let Some(pos) = self.position(id) else {
                continue;
            };
            let mut entity = self.remove_committed(pos);
            entity.teardown(links);
            links.membership.entity_removed(id);
            self.allocator.deallocate(id);
            log::debug!("destroyed {} ({})", id, entity.name());
        }

        for entity in mem::take(&mut self.to_add) {
            log::debug!("committed {} ({})", entity.id(), entity.name());
            self.commit(entity, links);
        }
    }

    fn commit(&mut self, entity: Entity, links: &mut SceneLinks<'_>) {
        let id = entity.id();
        let index = id.index as usize;
        if index >= self.positions.len() {
            self.positions.resize(index + 1, None);
        }
        self.positions[index] = Some(self.entities.len());
        links.membership.signature_changed(id, entity.signature());
        self.entities.push(entity);
    }

    fn remove_committed(&mut self, pos: usize) -> Entity {
        let entity = self.entities.remove(pos);
        self.positions[entity.id().index as usize] = None;
        for (offset, shifted) in self.entities[pos..].iter().enumerate() {
            self.positions[shifted.id().index as usize] = Some(pos + offset);
        }
        entity
    }

    /// Update every committed entity in commit order.
    pub fn update_entities(&mut self, links: &mut SceneLinks<'_>, time: &Time) {
        for entity in &mut self.entities {
            entity.update(links, time);
        }
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        let pos = (*self.positions.get(id.index as usize)?)?;
        (self.entities[pos].id() == id).then_some(pos)
    }
}
