//! # Component: Behaviour Attached to an Entity
//!
//! A component is a boxed trait object owned by exactly one entity's
//! [`ComponentList`](super::component_list::ComponentList). Unlike an
//! archetype ECS, where components are plain data and systems hold all the
//! logic, components here carry their own lifecycle hooks and per-frame
//! `update`. Systems ([`System`](super::system::System)) sit alongside them
//! for work that spans many entities.
//!
//! ## Lifecycle
//!
//! ```text
//! attach ──► PendingAdd ──flush──► Active ──detach──► PendingRemove ──flush──► Removed
//!                │                                                              ▲
//!                └──────────────── detach before flush (no hooks) ──────────────┘
//! ```
//!
//! Hooks fire only on flush: `on_added_to_entity` then `on_enabled` when a
//! component becomes active, `on_removed_from_entity` when it leaves. A
//! component cancelled while still pending never sees a hook.
//!
//! ## Capabilities
//!
//! Rendering is opt-in: a component that wants to be drawn returns itself
//! from [`Component::as_renderable`]. The list checks this at registration
//! time and reports the component to the scene's
//! [`RenderableRegistry`](crate::render::RenderableRegistry).

use std::any::Any;
use std::fmt;

use super::component_list::ComponentContext;
use crate::render::Renderable;
use crate::time::Time;

/// Handle to one attached component, unique within its entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// Which part of an entity's [`Transform`](crate::math::Transform) changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformChange {
    Translation,
    Rotation,
    Scale,
}

/// Downcasting support for trait objects. Blanket-implemented for every
/// `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A behaviour module attached to an entity.
///
/// Every hook has an empty default, so a component only implements what it
/// needs. Hooks receive a [`ComponentContext`] for reaching the owning entity:
/// attaching or detaching from inside a hook is always deferred to the next
/// flush.
///
/// ```ignore
/// struct Spin { speed: f32 }
///
/// impl Component for Spin {
///     fn update(&mut self, ctx: &mut ComponentContext<'_>, time: &Time) {
///         if let Some(angle) = ctx.find_mut::<Angle>(false) {
///             angle.0 += self.speed * time.delta_secs();
///         }
///     }
/// }
/// ```
pub trait Component: AsAny {
    /// Called once, on the flush that makes this component active.
    fn on_added_to_entity(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called after `on_added_to_entity` if enabled, and on every later
    /// transition to enabled.
    fn on_enabled(&mut self, _ctx: &mut ComponentContext<'_>) {}

    fn on_disabled(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// The owning entity's transform changed.
    fn on_entity_transform_changed(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        _change: TransformChange,
    ) {
    }

    /// Per-frame work. Runs on frames where
    /// `frame_count % update_interval() == 0`.
    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _time: &Time) {}

    /// Called once, on the flush that removes this component. The component
    /// is dropped right after.
    fn on_removed_from_entity(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Run `update` every N frames. Values below 1 are treated as 1.
    fn update_interval(&self) -> u32 {
        1
    }

    fn as_renderable(&self) -> Option<&dyn Renderable> {
        None
    }
}
