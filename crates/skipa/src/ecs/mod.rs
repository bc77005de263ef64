//! # Component Lifecycle and Interest Groups
//!
//! This is an object-style ECS: entities own boxed components with their own
//! lifecycle hooks, and systems process the entities whose component set
//! matches a predicate. The hard part is keeping everything consistent while
//! code running inside a hook changes the very lists being walked. The answer
//! throughout is deferral: structural changes are queued and committed at one
//! well-defined point per frame.
//!
//! ## Module Overview
//!
//! - [`kind`]: stable bit index per component type
//! - [`bits`]: growable signature bitsets
//! - [`matcher`]: all-of / none-of / any-of predicates over signatures
//! - [`component`]: the `Component` trait and its hooks
//! - [`component_list`]: per-entity deferred attach/detach and flush
//! - [`entity`]: generational ids and the `Entity` container
//! - [`entity_list`]: deferred spawn/destroy
//! - [`system`]: systems, membership and the two-phase pass

pub mod bits;
pub mod component;
pub mod component_list;
pub mod entity;
pub mod entity_list;
pub mod kind;
pub mod matcher;
pub mod system;

pub use bits::ComponentBits;
pub use component::{AsAny, Component, ComponentId, TransformChange};
pub use component_list::{ComponentContext, ComponentList, SceneLinks};
pub use entity::{Entity, EntityId};
pub use entity_list::EntityList;
pub use kind::{ComponentKind, TypeIndexRegistry};
pub use matcher::{Matcher, MatcherBuilder};
#[cfg(feature = "diagnostics")]
pub use system::SystemTiming;
pub use system::{EntitySystem, EntitySystems, MembershipObserver, System};
