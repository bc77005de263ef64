//! # Scene: The Frame Loop
//!
//! A [`Scene`] owns everything: entities, systems, the renderable list and the
//! clock. It is the only place that can lend the entity storage, the systems
//! and the renderable list out at the same time, which is what a flush needs:
//! entities are mutated while the systems hear about the new signatures and
//! the renderable list hears about drawable components.
//!
//! ## Frame Order
//!
//! ```text
//! Scene::update()
//!   1. time.update()             (or advance by the fixed timestep)
//!   2. entities.update_lists()   commit destroys, then spawns
//!   3. entities.update_entities()
//!        per entity: flush components → update components
//!        (each flush reports signature changes to the systems)
//!   4. systems.update()          begin + process, every system
//!   5. systems.late_update()     late_process + end, every system
//! ```
//!
//! Anything a system does to an entity (attach, detach, spawn, destroy) is
//! queued, and lands in steps 2–3 of the next frame.

use std::sync::Arc;
use std::time::Duration;

use crate::config::SceneConfig;
use crate::ecs::{
    Entity, EntityId, EntityList, EntitySystem, EntitySystems, Matcher, MatcherBuilder,
    SceneLinks, System, TypeIndexRegistry,
};
use crate::render::RenderableList;
use crate::time::Time;

pub struct Scene {
    config: SceneConfig,
    kinds: Arc<TypeIndexRegistry>,
    entities: EntityList,
    systems: EntitySystems,
    renderables: RenderableList,
    time: Time,
    fixed_step: Option<Duration>,
}

impl Scene {
    /// A scene using the process-wide [`TypeIndexRegistry`].
    pub fn new(config: SceneConfig) -> Self {
        Self::with_registry(config, TypeIndexRegistry::global())
    }

    /// A scene with its own kind registry, so kind indices start from zero.
    ///
    /// A config that fails [`SceneConfig::validate`] still builds a scene, but
    /// its fixed timestep is ignored and the clock follows the wall clock.
    pub fn with_registry(config: SceneConfig, kinds: Arc<TypeIndexRegistry>) -> Self {
        log::info!("scene `{}` created", config.name);
        let fixed_step = match config.validate() {
            Ok(()) => config
                .fixed_timestep
                .and_then(|step| Duration::try_from_secs_f32(step).ok()),
            Err(err) => {
                log::warn!("scene `{}`: {}; using the wall clock", config.name, err);
                None
            }
        };
        Self {
            fixed_step,
            entities: EntityList::with_capacity(kinds.clone(), config.entity_capacity),
            kinds,
            systems: EntitySystems::new(),
            renderables: RenderableList::new(),
            time: Time::new(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TypeIndexRegistry> {
        &self.kinds
    }

    /// Start a typed matcher against this scene's kind registry.
    pub fn matcher(&self) -> MatcherBuilder<'_> {
        Matcher::builder(&self.kinds)
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn renderables(&self) -> &RenderableList {
        &self.renderables
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// Create an entity. Attach components through [`entity_mut`](Self::entity_mut);
    /// the entity joins the scene at the start of the next frame.
    pub fn spawn(&mut self, name: impl Into<String>) -> EntityId {
        self.entities.spawn(name)
    }

    pub fn destroy(&mut self, id: EntityId) -> bool {
        self.entities.destroy(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Committed entities in commit order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    pub fn entity_list(&self) -> &EntityList {
        &self.entities
    }

    /// Move an entity out of this scene with its components. Renderables and
    /// system membership are withdrawn, no component hook runs, and `id`
    /// goes stale. Pass the result to [`adopt_entity`](Self::adopt_entity)
    /// on any scene.
    pub fn take_entity(&mut self, id: EntityId) -> Option<Entity> {
        let mut links = SceneLinks {
            renderables: &mut self.renderables,
            membership: &mut self.systems,
        };
        self.entities.take(id, &mut links)
    }

    /// Bring in an entity taken from a scene. It gets a handle in this
    /// scene, and its active components are registered here without hooks.
    pub fn adopt_entity(&mut self, entity: Entity) -> EntityId {
        let mut links = SceneLinks {
            renderables: &mut self.renderables,
            membership: &mut self.systems,
        };
        self.entities.insert(entity, &mut links)
    }

    // ── Systems ──────────────────────────────────────────────────────

    /// Add a system. It is initialized, then offered every committed entity.
    pub fn add_system<S: System>(&mut self, matcher: Matcher, system: S) {
        let mut system = EntitySystem::new(matcher, system);
        system.initialize();
        for entity in self.entities.iter() {
            system.on_changed(entity.id(), entity.signature());
        }
        self.systems.add(system);
    }

    pub fn system<S: System>(&self) -> Option<&S> {
        self.systems.get::<S>()
    }

    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems.get_mut::<S>()
    }

    /// Current members of the system whose behaviour is an `S`.
    pub fn members_of<S: System>(&self) -> Option<&[EntityId]> {
        self.systems.entry::<S>().map(EntitySystem::members)
    }

    pub fn systems(&self) -> &EntitySystems {
        &self.systems
    }

    // ── Frame ────────────────────────────────────────────────────────

    /// Run one frame. The clock advances by the configured fixed timestep,
    /// or by wall-clock time if there is none.
    pub fn update(&mut self) {
        match self.fixed_step {
            Some(step) => self.time.advance(step),
            None => self.time.update(),
        }
        self.run_frame();
    }

    /// Run one frame, advancing the clock by exactly `delta`.
    pub fn step(&mut self, delta: Duration) {
        self.time.advance(delta);
        self.run_frame();
    }

    fn run_frame(&mut self) {
        log::trace!("{}: frame {}", self.config.name, self.time.frame_count());
        let mut links = SceneLinks {
            renderables: &mut self.renderables,
            membership: &mut self.systems,
        };
        self.entities.update_lists(&mut links);
        self.entities.update_entities(&mut links, &self.time);

        self.systems.update(&mut self.entities, &self.time);
        self.systems.late_update(&mut self.entities, &self.time);
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}
