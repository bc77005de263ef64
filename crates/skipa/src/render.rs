//! Renderable registration.
//!
//! Drawing is not this crate's business. What it does own is the bookkeeping
//! of *which* components are drawable: whenever a component with the
//! [`Renderable`] capability becomes active or is removed, its entity's
//! [`ComponentList`](crate::ecs::ComponentList) reports it to a
//! [`RenderableRegistry`]. A renderer walks [`RenderableList`] each frame and
//! looks the components up by handle.

use crate::ecs::{ComponentId, EntityId};

/// Capability implemented by components that can be drawn.
pub trait Renderable {
    /// Draw-order bucket. Lower layers are drawn first.
    fn render_layer(&self) -> i32 {
        0
    }
}

/// Receiver for renderable add/remove notifications.
pub trait RenderableRegistry {
    fn add(&mut self, entity: EntityId, component: ComponentId, renderable: &dyn Renderable);
    fn remove(&mut self, entity: EntityId, component: ComponentId);
}

/// One registered renderable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderableRef {
    pub entity: EntityId,
    pub component: ComponentId,
    pub layer: i32,
}

/// The scene's list of active renderable components, in registration order.
#[derive(Debug, Default)]
pub struct RenderableList {
    entries: Vec<RenderableRef>,
}

impl RenderableList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entity: EntityId, component: ComponentId) -> bool {
        self.entries
            .iter()
            .any(|r| r.entity == entity && r.component == component)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderableRef> {
        self.entries.iter()
    }

    /// Entries belonging to one render layer.
    pub fn in_layer(&self, layer: i32) -> impl Iterator<Item = &RenderableRef> {
        self.entries.iter().filter(move |r| r.layer == layer)
    }
}

impl RenderableRegistry for RenderableList {
    fn add(&mut self, entity: EntityId, component: ComponentId, renderable: &dyn Renderable) {
        if self.contains(entity, component) {
            return;
        }
        self.entries.push(RenderableRef {
            entity,
            component,
            layer: renderable.render_layer(),
        });
    }

    fn remove(&mut self, entity: EntityId, component: ComponentId) {
        self.entries
            .retain(|r| !(r.entity == entity && r.component == component));
    }
}
