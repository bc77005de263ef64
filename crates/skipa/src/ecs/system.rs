//! # System: Per-Frame Work Over a Set of Entities
//!
//! Components handle behaviour local to one entity. A system handles work
//! across every entity that matches a [`Matcher`]: integrate all velocities,
//! keep a camera on its target, count enemies.
//!
//! ## Membership
//!
//! An [`EntitySystem`] keeps its member list as a cache of
//! `matcher.matches(signature)` over every entity. The cache is only as fresh
//! as the notifications it receives: every time an entity's signature changes,
//! somebody must call [`EntitySystem::on_changed`]. Inside a
//! [`Scene`](crate::scene::Scene) that somebody is the component list itself,
//! which reports to [`EntitySystems`] (the [`MembershipObserver`]) on every
//! flush. Used standalone, the caller owns that obligation.
//!
//! ## Two Phases
//!
//! ```text
//! EntitySystems::update()        EntitySystems::late_update()
//!   physics.begin()                physics.late_process()
//!   physics.process()              physics.end()
//!   camera.begin()                 camera.late_process()
//!   camera.process()               camera.end()
//! ```
//!
//! Every system's `process` runs before any system's `late_process`, so a
//! camera following in its late phase always sees this frame's physics. Within
//! a phase, systems run in the order they were added. There is no parallelism.
//!
//! ## Closures
//!
//! Any `FnMut(&[EntityId], &mut EntityList, &Time)` is a system whose only
//! phase is `process`:
//!
//! ```ignore
//! scene.add_system(matcher, |members: &[EntityId], entities: &mut EntityList, time: &Time| {
//!     for &id in members { /* ... */ }
//! });
//! ```

use std::collections::HashSet;

#[cfg(feature = "diagnostics")]
use serde::Serialize;

use super::bits::ComponentBits;
use super::component::AsAny;
use super::entity::EntityId;
use super::entity_list::EntityList;
use super::matcher::Matcher;
use crate::time::Time;

/// Behaviour of an [`EntitySystem`]. Every hook defaults to a no-op.
pub trait System: AsAny {
    /// Called once, when the system is added to a scene.
    fn initialize(&mut self) {}

    /// An entity started matching.
    fn on_added(&mut self, _entity: EntityId) {}

    /// An entity stopped matching or was destroyed.
    fn on_removed(&mut self, _entity: EntityId) {}

    fn begin(&mut self) {}

    fn process(&mut self, _members: &[EntityId], _entities: &mut EntityList, _time: &Time) {}

    /// Runs after every system's `process` this frame.
    fn late_process(&mut self, _members: &[EntityId], _entities: &mut EntityList, _time: &Time) {}

    fn end(&mut self) {}
}

/// Blanket impl: any `FnMut(&[EntityId], &mut EntityList, &Time)` is a
/// process-only `System`.
impl<F> System for F
where
    F: FnMut(&[EntityId], &mut EntityList, &Time) + 'static,
{
    fn process(&mut self, members: &[EntityId], entities: &mut EntityList, time: &Time) {
        (self)(members, entities, time);
    }
}

/// Receiver for entity signature changes.
pub trait MembershipObserver {
    /// `entity` now has `signature`. Also sent once when an entity is
    /// committed, before it has any components.
    fn signature_changed(&mut self, entity: EntityId, signature: &ComponentBits);

    /// `entity` has been destroyed or taken out of the scene.
    fn entity_removed(&mut self, entity: EntityId);
}

/// A [`System`] together with its [`Matcher`] and current members.
pub struct EntitySystem {
    name: String,
    matcher: Matcher,
    /// Members in the order they started matching.
    members: Vec<EntityId>,
    member_set: HashSet<EntityId>,
    system: Box<dyn System>,
}

impl EntitySystem {
    pub fn new<S: System>(matcher: Matcher, system: S) -> Self {
        Self {
            name: short_system_name(std::any::type_name::<S>()),
            matcher,
            members: Vec::new(),
            member_set: HashSet::new(),
            system: Box::new(system),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.member_set.contains(&entity)
    }

    /// Re-test `entity` against the matcher and update membership. Calling
    /// it again with the same signature does nothing.
    pub fn on_changed(&mut self, entity: EntityId, signature: &ComponentBits) {
        let interested = self.matcher.matches(signature);
        let member = self.member_set.contains(&entity);
        if interested && !member {
            self.member_set.insert(entity);
            self.members.push(entity);
            log::debug!("{}: {} joined", self.name, entity);
            self.system.on_added(entity);
        } else if !interested && member {
            self.remove(entity);
        }
    }

    /// Drop `entity` from the members, if present.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        if !self.member_set.remove(&entity) {
            return false;
        }
        self.members.retain(|&m| m != entity);
        log::debug!("{}: {} left", self.name, entity);
        self.system.on_removed(entity);
        true
    }

    pub fn initialize(&mut self) {
        self.system.initialize();
    }

    /// `begin` then `process`.
    pub fn update(&mut self, entities: &mut EntityList, time: &Time) {
        self.system.begin();
        self.system.process(&self.members, entities, time);
    }

    /// `late_process` then `end`.
    pub fn late_update(&mut self, entities: &mut EntityList, time: &Time) {
        self.system.late_process(&self.members, entities, time);
        self.system.end();
    }

    /// The behaviour, if it is an `S`.
    pub fn downcast_ref<S: System>(&self) -> Option<&S> {
        (*self.system).as_any().downcast_ref::<S>()
    }

    pub fn downcast_mut<S: System>(&mut self) -> Option<&mut S> {
        (*self.system).as_any_mut().downcast_mut::<S>()
    }
}

/// Per-system timing recorded during a single frame, both phases combined.
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone, Serialize)]
pub struct SystemTiming {
    pub name: String,
    pub duration_us: f64,
}

/// Every system in a scene, in the order they were added.
#[derive(Default)]
pub struct EntitySystems {
    systems: Vec<EntitySystem>,
    /// Per-system timings from the most recent frame.
    #[cfg(feature = "diagnostics")]
    timings: Vec<SystemTiming>,
}

impl EntitySystems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, system: EntitySystem) {
        log::debug!("added system {}", system.name());
        self.systems.push(system);
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntitySystem> {
        self.systems.iter()
    }

    /// The first system whose behaviour is an `S`.
    pub fn entry<S: System>(&self) -> Option<&EntitySystem> {
        self.systems.iter().find(|s| s.downcast_ref::<S>().is_some())
    }

    pub fn get<S: System>(&self) -> Option<&S> {
        self.systems.iter().find_map(|s| s.downcast_ref::<S>())
    }

    pub fn get_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems.iter_mut().find_map(|s| s.downcast_mut::<S>())
    }

    /// Early phase: `begin` + `process` for every system.
    pub fn update(&mut self, entities: &mut EntityList, time: &Time) {
        #[cfg(feature = "diagnostics")]
        {
            self.timings.clear();
            for system in &mut self.systems {
                let start = std::time::Instant::now();
                system.update(entities, time);
                self.timings.push(SystemTiming {
                    name: system.name.clone(),
                    duration_us: start.elapsed().as_secs_f64() * 1_000_000.0,
                });
            }
        }
        #[cfg(not(feature = "diagnostics"))]
        {
            for system in &mut self.systems {
                system.update(entities, time);
            }
        }
    }

    /// Late phase: `late_process` + `end` for every system.
    pub fn late_update(&mut self, entities: &mut EntityList, time: &Time) {
        #[cfg(feature = "diagnostics")]
        {
            for (index, system) in self.systems.iter_mut().enumerate() {
                let start = std::time::Instant::now();
                system.late_update(entities, time);
                if let Some(timing) = self.timings.get_mut(index) {
                    timing.duration_us += start.elapsed().as_secs_f64() * 1_000_000.0;
                }
            }
        }
        #[cfg(not(feature = "diagnostics"))]
        {
            for system in &mut self.systems {
                system.late_update(entities, time);
            }
        }
    }

    #[cfg(feature = "diagnostics")]
    pub fn timings(&self) -> &[SystemTiming] {
        &self.timings
    }
}

impl MembershipObserver for EntitySystems {
    fn signature_changed(&mut self, entity: EntityId, signature: &ComponentBits) {
        for system in &mut self.systems {
            system.on_changed(entity, signature);
        }
    }

    fn entity_removed(&mut self, entity: EntityId) {
        for system in &mut self.systems {
            system.remove(entity);
        }
    }
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// last meaningful segment (e.g. `follow_camera::Physics` → `Physics`,
/// `{{closure}}` → `<closure>`).
fn short_system_name(full: &str) -> String {
    let name = full.rsplit("::").next().unwrap_or(full);
    if name.contains("closure") {
        "<closure>".to_string()
    } else {
        name.to_string()
    }
}
