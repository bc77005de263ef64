//! # Skipa: Component Lifecycle Core
//!
//! Entities own components, components carry behaviour, and systems process
//! every entity whose components match a [`Matcher`](ecs::Matcher). Attaching,
//! detaching, spawning and destroying are all deferred to a fixed point in the
//! frame, so hooks and systems can change the world while it is being walked.
//!
//! Start with `use skipa::prelude::*` and build a [`Scene`](scene::Scene).

pub mod config;
pub mod ecs;
pub mod math;
pub mod prelude;
pub mod render;
pub mod scene;
pub mod time;

#[cfg(feature = "diagnostics")]
pub mod diag;
