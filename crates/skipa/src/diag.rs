//! Frame diagnostics snapshot.
//!
//! Enabled by the `diagnostics` feature flag. [`Scene::diagnostics`] collects
//! a [`DiagSnapshot`] of the most recent frame: timing, entity counts, and
//! per-system membership and cost. The snapshot serializes to JSON, ready to
//! be logged or shipped to an external viewer.

use serde::Serialize;

use crate::scene::Scene;

// ── Snapshot types (wire format) ────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DiagSnapshot {
    pub scene: String,
    pub fps: f32,
    pub delta_ms: f32,
    pub frame_count: u64,
    pub elapsed_secs: f32,
    pub entity_count: usize,
    pub pending_entities: usize,
    pub renderable_count: usize,
    pub component_kinds: usize,
    pub systems: Vec<SystemInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub name: String,
    pub member_count: usize,
    /// Time spent in both phases last frame. Zero before the first frame.
    pub duration_us: f64,
}

impl DiagSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Scene {
    pub fn diagnostics(&self) -> DiagSnapshot {
        let time = self.time();
        let timings = self.systems().timings();
        let systems = self
            .systems()
            .iter()
            .enumerate()
            .map(|(index, system)| SystemInfo {
                name: system.name().to_string(),
                member_count: system.members().len(),
                duration_us: timings.get(index).map_or(0.0, |t| t.duration_us),
            })
            .collect();

        DiagSnapshot {
            scene: self.name().to_string(),
            fps: time.fps(),
            delta_ms: time.delta_secs() * 1000.0,
            frame_count: time.frame_count(),
            elapsed_secs: time.elapsed_secs(),
            entity_count: self.entity_list().len(),
            pending_entities: self.entity_list().pending_len(),
            renderable_count: self.renderables().len(),
            component_kinds: self.registry().len(),
            systems,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::SceneConfig;
    use crate::ecs::{EntityId, EntityList, Matcher, System, TypeIndexRegistry};
    use crate::scene::Scene;
    use crate::time::Time;

    struct Idle;
    impl System for Idle {}

    fn noop(_members: &[EntityId], _entities: &mut EntityList, _time: &Time) {}

    #[test]
    fn snapshot_reports_last_frame() {
        let mut scene =
            Scene::with_registry(SceneConfig::default(), Arc::new(TypeIndexRegistry::new()));
        scene.add_system(Matcher::empty(), Idle);
        scene.add_system(Matcher::empty(), noop);
        scene.spawn("a");
        scene.spawn("b");
        scene.step(Duration::from_millis(20));
        scene.spawn("c");

        let snap = scene.diagnostics();
        assert_eq!(snap.scene, "scene");
        assert_eq!(snap.frame_count, 1);
        assert_eq!(snap.entity_count, 2);
        assert_eq!(snap.pending_entities, 1);
        assert!((snap.delta_ms - 20.0).abs() < 1e-3);
        let names: Vec<&str> = snap.systems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Idle", "noop"]);
        assert!(snap.systems.iter().all(|s| s.member_count == 2));

        let json = snap.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["entity_count"], 2);
        assert_eq!(value["systems"][1]["name"], "noop");
    }
}
