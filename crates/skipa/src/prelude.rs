//! Convenience re-exports: `use skipa::prelude::*` for the common items.

pub use crate::config::{ConfigError, SceneConfig};
pub use crate::ecs::{
    Component, ComponentContext, ComponentId, Entity, EntityId, EntityList, Matcher, System,
    TransformChange,
};
pub use crate::math::{Quat, Transform, Vec3};
pub use crate::render::{Renderable, RenderableList};
pub use crate::scene::Scene;
pub use crate::time::Time;
#[cfg(feature = "diagnostics")]
pub use crate::diag::DiagSnapshot;
