//! Follow camera: physics in the early phase, camera in the late phase.
//!
//! A ball moves under gravity and bounces off the floor. A camera entity eases
//! toward it every frame. Because the camera runs in `late_process`, it always
//! chases this frame's ball position, never last frame's.
//!
//! Run with `RUST_LOG=debug cargo run --example follow_camera` to see
//! membership changes as they happen.

use std::time::Duration;

use skipa::prelude::*;

fn main() {
    env_logger::init();

    let config = SceneConfig {
        name: "follow camera".to_string(),
        fixed_timestep: Some(1.0 / 60.0),
        ..SceneConfig::default()
    };
    let mut scene = Scene::new(config);

    let ball = scene.spawn("ball");
    let mut velocity = None;
    if let Some(entity) = scene.entity_mut(ball) {
        entity.set_translation(Vec3::new(0.0, 5.0, 0.0));
        velocity = Some(entity.attach(Velocity(Vec3::new(2.0, 0.0, 0.0))));
        entity.attach(Sprite { layer: 1 });
        entity.attach(Heartbeat::default());
    }

    let camera = scene.spawn("camera");
    if let Some(entity) = scene.entity_mut(camera) {
        entity.attach(CameraRig {
            target: ball,
            stiffness: 4.0,
        });
    }

    let physics = scene.matcher().all::<Velocity>().build();
    scene.add_system(physics, Physics { gravity: -9.81 });
    let rigs = scene.matcher().all::<CameraRig>().build();
    scene.add_system(rigs, FollowCamera);

    for _ in 0..180 {
        scene.update();
    }

    let ball_at = scene.entity(ball).map(|e| e.transform().translation);
    let camera_at = scene.entity(camera).map(|e| e.transform().translation);
    log::info!("after {:?}: ball {:?}, camera {:?}", scene.time().elapsed(), ball_at, camera_at);
    log::info!("renderables: {}", scene.renderables().len());
    if let Ok(json) = scene.diagnostics().to_json() {
        log::info!("diagnostics: {}", json);
    }

    // Removing the velocity takes the ball out of the physics system.
    if let (Some(entity), Some(id)) = (scene.entity_mut(ball), velocity) {
        entity.detach(id);
    }
    scene.step(Duration::from_millis(16));
    let moving = scene.members_of::<Physics>().map_or(0, <[EntityId]>::len);
    println!(
        "ball {:?}, camera {:?}, frames {}, moving entities {}",
        ball_at,
        camera_at,
        scene.time().frame_count(),
        moving
    );
}

// ── Components ──────────────────────────────────────────────────────────

struct Velocity(Vec3);
impl Component for Velocity {}

struct Sprite {
    layer: i32,
}

impl Renderable for Sprite {
    fn render_layer(&self) -> i32 {
        self.layer
    }
}

impl Component for Sprite {
    fn as_renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }
}

/// Logs once a second at 60 fps.
#[derive(Default)]
struct Heartbeat {
    beats: u32,
}

impl Component for Heartbeat {
    fn update(&mut self, ctx: &mut ComponentContext<'_>, time: &Time) {
        self.beats += 1;
        log::debug!("{} heartbeat {} at frame {}", ctx.entity(), self.beats, time.frame_count());
    }

    fn update_interval(&self) -> u32 {
        60
    }
}

struct CameraRig {
    target: EntityId,
    stiffness: f32,
}

impl Component for CameraRig {}

// ── Systems ─────────────────────────────────────────────────────────────

struct Physics {
    gravity: f32,
}

impl System for Physics {
    fn process(&mut self, members: &[EntityId], entities: &mut EntityList, time: &Time) {
        let dt = time.delta_secs();
        for &id in members {
            let Some(entity) = entities.get_mut(id) else {
                continue;
            };
            let mut position = entity.transform().translation;
            let Some(velocity) = entity.find_mut::<Velocity>(false) else {
                continue;
            };
            velocity.0.y += self.gravity * dt;
            position += velocity.0 * dt;
            if position.y < 0.0 {
                position.y = -position.y;
                velocity.0.y = -velocity.0.y * 0.8;
            }
            entity.set_translation(position);
        }
    }
}

struct FollowCamera;

impl System for FollowCamera {
    fn late_process(&mut self, members: &[EntityId], entities: &mut EntityList, time: &Time) {
        for &id in members {
            let Some(rig) = entities.get(id).and_then(|e| e.find::<CameraRig>(false)) else {
                continue;
            };
            let (target, stiffness) = (rig.target, rig.stiffness);
            let Some(goal) = entities.get(target).map(|e| e.transform().translation) else {
                continue;
            };
            if let Some(camera) = entities.get_mut(id) {
                let t = (stiffness * time.delta_secs()).min(1.0);
                let next = camera.transform().translation.lerp(goal, t);
                camera.set_translation(next);
            }
        }
    }
}
