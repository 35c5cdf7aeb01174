//! The running scene: owns camera, controls, pointer, viewport and scene
//! graph, and advances them once per frame.

use crate::camera::Camera;
use crate::config::SceneConfig;
use crate::controls::OrbitControls;
use crate::error::{CoreError, CoreResult};
use crate::light::DirectionalLight;
use crate::material::{EyeSide, ToonMaterial};
use crate::pointer::PointerTracker;
use crate::scene::{DrawItem, ModelDesc, NodeId, Scene};
use crate::viewport::Viewport;
use crate::{Mat4, Vec3};

const MODEL_ROOT_NAME: &str = "door";

/// Node ids of the two eye meshes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EyePair {
    pub left: NodeId,
    pub right: NodeId,
}

/// Model availability as seen by the update loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelSlot {
    /// Still loading, or loaded without both eyes.
    #[default]
    NotLoaded,
    Ready(EyePair),
    /// Loading failed; eye tracking stays off for the session.
    Failed,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug)]
pub struct Frame {
    pub view_proj: Mat4,
    pub camera_position: Vec3,
    /// Unit vector towards the light.
    pub light_dir: Vec3,
    pub light_radiance: Vec3,
    pub toon: ToonMaterial,
    pub draws: Vec<DrawItem>,
}

pub struct Session {
    config: SceneConfig,
    viewport: Viewport,
    pointer: PointerTracker,
    camera: Camera,
    controls: OrbitControls,
    scene: Scene,
    slot: ModelSlot,
    model_attached: bool,
    toon: ToonMaterial,
}

impl Session {
    pub fn new(config: SceneConfig, width: f64, height: f64, device_pixel_ratio: f64) -> CoreResult<Self> {
        let viewport = Viewport::new(width, height, device_pixel_ratio, config.max_pixel_ratio)?;
        let camera = Camera::from_config(&config, viewport.aspect());
        let controls = OrbitControls::from_config(&config);
        let scene = Scene::new(DirectionalLight::from_config(&config));
        let toon = ToonMaterial::from_config(&config);
        Ok(Self {
            config,
            viewport,
            pointer: PointerTracker::new(),
            camera,
            controls,
            scene,
            slot: ModelSlot::NotLoaded,
            model_attached: false,
            toon,
        })
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn slot(&self) -> ModelSlot {
        self.slot
    }

    /// Resize handler: viewport, camera aspect. Returns the new surface
    /// size in physical pixels.
    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) -> CoreResult<(u32, u32)> {
        self.viewport.resize(width, height, device_pixel_ratio)?;
        self.camera.set_aspect(self.viewport.aspect());
        Ok(self.viewport.surface_size())
    }

    /// Pointer moved to logical window coordinates.
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        self.pointer
            .on_move(x, y, self.viewport.width, self.viewport.height);
        self.controls.on_pointer_move(x, y, self.viewport.height);
    }

    pub fn drag_started(&mut self, x: f64, y: f64) {
        self.controls.on_pointer_down(x, y);
    }

    pub fn drag_ended(&mut self) {
        self.controls.on_pointer_up();
    }

    /// Pointer left the window. A drag in progress ends there, since the
    /// button release may never reach us. Returns whether a drag was cut.
    pub fn pointer_left(&mut self) -> bool {
        let was_dragging = self.controls.is_dragging();
        if was_dragging {
            self.controls.on_pointer_up();
        }
        was_dragging
    }

    pub fn scrolled(&mut self, delta: f32) {
        self.controls.on_scroll(delta);
    }

    /// Attach the loaded model: offset it into frame, assign materials and
    /// look up the eyes. Eye tracking turns on only if both eyes exist.
    pub fn attach_model(&mut self, model: &ModelDesc) -> CoreResult<ModelSlot> {
        if self.model_attached {
            return Err(CoreError::ModelAlreadyAttached);
        }
        let offset = Vec3::new(0.0, self.config.model_offset_y, 0.0);
        let (_, ids) = self.scene.insert_model(MODEL_ROOT_NAME, offset, model)?;
        self.model_attached = true;

        let mut left = None;
        let mut right = None;
        for &id in &ids {
            let side = self
                .scene
                .node(id)
                .and_then(|n| n.material)
                .and_then(|m| m.eye_side());
            match side {
                Some(EyeSide::Left) => left = left.or(Some(id)),
                Some(EyeSide::Right) => right = right.or(Some(id)),
                None => {}
            }
        }

        match (left, right) {
            (Some(left), Some(right)) => {
                log::info!("Model attached ({} nodes), eye tracking ready", ids.len());
                self.slot = ModelSlot::Ready(EyePair { left, right });
            }
            _ => {
                log::warn!(
                    "Model attached ({} nodes) without both eye meshes; eye tracking disabled",
                    ids.len()
                );
            }
        }
        Ok(self.slot)
    }

    /// Record a failed load. The scene keeps rendering without the model.
    pub fn mark_load_failed(&mut self, reason: &str) {
        log::error!("Model load failed: {reason}");
        if !self.model_attached {
            self.slot = ModelSlot::Failed;
        }
    }

    /// World-space point the eyes look at for the current pointer.
    pub fn eye_target(&self) -> Vec3 {
        let p = self.pointer.position();
        Vec3::new(
            p.x * self.config.eye_target_scale,
            p.y * self.config.eye_target_scale,
            self.config.eye_target_depth,
        )
    }

    /// One frame: controls, eyes, light, then the snapshot to draw.
    pub fn tick(&mut self, dt: f32) -> Frame {
        self.controls.update(&mut self.camera);

        if let ModelSlot::Ready(eyes) = self.slot {
            let target = self.eye_target();
            for id in [eyes.left, eyes.right] {
                if let Err(e) = self.scene.look_at(id, target) {
                    log::warn!("Eye orientation skipped: {e}");
                }
            }
        }

        self.scene
            .light
            .advance_yaw(self.config.light_yaw_speed, dt.max(0.0));

        Frame {
            view_proj: self.camera.view_proj(),
            camera_position: self.camera.position,
            light_dir: self.scene.light.to_light(),
            light_radiance: self.scene.light.radiance(),
            toon: self.toon,
            draws: self.scene.draw_items(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialKind;
    use crate::scene::NodeDesc;
    use crate::transform::Transform;
    use crate::{Quat, vec3};

    const DT: f32 = 1.0 / 60.0;

    fn session() -> Session {
        Session::new(SceneConfig::default(), 800.0, 600.0, 1.0).unwrap()
    }

    fn mesh_node(name: &str, parent: Option<usize>, translation: Vec3, mesh: u32) -> NodeDesc {
        NodeDesc {
            name: name.into(),
            parent,
            transform: Transform::from_translation(translation),
            mesh: Some(mesh),
        }
    }

    /// Door with both eyes placed so that, after the -2 offset, they sit
    /// on the world Y = 0 plane at x = 0.
    fn door_model() -> ModelDesc {
        ModelDesc {
            nodes: vec![
                mesh_node("Door", None, Vec3::ZERO, 0),
                mesh_node("EyeLeft", Some(0), vec3(0.0, 2.0, 0.0), 1),
                mesh_node("EyeRight", Some(0), vec3(0.0, 2.0, 0.0), 2),
                mesh_node("Frame", None, Vec3::ZERO, 3),
            ],
        }
    }

    fn eye_rotations(s: &Session) -> (Quat, Quat) {
        let ModelSlot::Ready(eyes) = s.slot() else {
            panic!("eyes not ready");
        };
        let scene = s.scene();
        (
            scene.node(eyes.left).unwrap().transform.rotation,
            scene.node(eyes.right).unwrap().transform.rotation,
        )
    }

    fn node_named(s: &Session, name: &str) -> NodeId {
        (0..s.scene().node_count() as NodeId)
            .find(|&id| s.scene().node(id).is_some_and(|n| n.name == name))
            .unwrap()
    }

    fn world_forward(s: &Session, id: NodeId) -> Vec3 {
        s.scene()
            .world_matrix(id)
            .transform_vector3(Vec3::Z)
            .normalize()
    }

    #[test]
    fn ticks_before_load_are_harmless() {
        let mut s = session();
        for _ in 0..100 {
            let frame = s.tick(DT);
            assert!(frame.draws.is_empty());
        }
        assert_eq!(s.slot(), ModelSlot::NotLoaded);
        assert_eq!(s.scene().node_count(), 0);
    }

    #[test]
    fn attach_makes_eyes_ready_once() {
        let mut s = session();
        let slot = s.attach_model(&door_model()).unwrap();
        let ModelSlot::Ready(eyes) = slot else {
            panic!("expected ready slot, got {slot:?}");
        };
        assert_eq!(s.scene().node(eyes.left).unwrap().name, "EyeLeft");
        assert_eq!(s.scene().node(eyes.right).unwrap().name, "EyeRight");

        assert_eq!(
            s.attach_model(&door_model()),
            Err(CoreError::ModelAlreadyAttached)
        );
        assert_eq!(s.slot(), slot);
    }

    #[test]
    fn model_is_offset_down() {
        let mut s = session();
        s.attach_model(&door_model()).unwrap();
        let door = node_named(&s, "Door");
        let p = s.scene().world_matrix(door).transform_point3(Vec3::ZERO);
        assert!((p - vec3(0.0, -2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn centred_pointer_makes_eyes_face_forward() {
        let mut s = session();
        s.attach_model(&door_model()).unwrap();
        s.pointer_moved(400.0, 300.0);
        assert_eq!(s.eye_target(), vec3(0.0, 0.0, 1.8));
        s.tick(DT);
        let ModelSlot::Ready(eyes) = s.slot() else {
            unreachable!()
        };
        for id in [eyes.left, eyes.right] {
            assert!((world_forward(&s, id) - Vec3::Z).length() < 1e-4);
        }
    }

    #[test]
    fn eyes_follow_pointer_every_tick() {
        let mut s = session();
        s.attach_model(&door_model()).unwrap();

        s.pointer_moved(0.0, 0.0);
        s.tick(DT);
        let first = eye_rotations(&s);
        let ModelSlot::Ready(eyes) = s.slot() else {
            unreachable!()
        };
        let expected = vec3(-2.0, 2.0, 1.8).normalize();
        assert!((world_forward(&s, eyes.left) - expected).length() < 1e-4);

        s.pointer_moved(800.0, 600.0);
        s.tick(DT);
        let second = eye_rotations(&s);
        assert_ne!(first, second);
        let expected = vec3(2.0, -2.0, 1.8).normalize();
        assert!((world_forward(&s, eyes.right) - expected).length() < 1e-4);
    }

    #[test]
    fn eyes_orient_independently() {
        let mut s = session();
        let mut model = door_model();
        model.nodes[1].transform.translation = vec3(-0.5, 2.0, 0.0);
        model.nodes[2].transform.translation = vec3(0.5, 2.0, 0.0);
        s.attach_model(&model).unwrap();
        s.pointer_moved(400.0, 300.0);
        s.tick(DT);
        let (l, r) = eye_rotations(&s);
        assert_ne!(l, r);
    }

    #[test]
    fn load_failure_keeps_rendering_light_only() {
        let mut s = session();
        s.mark_load_failed("missing file");
        for _ in 0..10 {
            let frame = s.tick(DT);
            assert!(frame.draws.is_empty());
            assert!(frame.light_dir.is_normalized());
        }
        assert_eq!(s.slot(), ModelSlot::Failed);
    }

    #[test]
    fn model_without_eyes_is_drawn_but_not_tracked() {
        let mut s = session();
        let model = ModelDesc {
            nodes: vec![mesh_node("Door", None, Vec3::ZERO, 0)],
        };
        assert_eq!(s.attach_model(&model).unwrap(), ModelSlot::NotLoaded);
        let frame = s.tick(DT);
        assert_eq!(frame.draws.len(), 1);
        assert_eq!(frame.draws[0].material, MaterialKind::Toon);
    }

    #[test]
    fn non_eye_meshes_are_toon_in_any_order() {
        let mut reordered = door_model();
        reordered.nodes.swap(1, 2);
        reordered.nodes.swap(0, 3);
        // Keep parents ahead of children after the shuffle.
        reordered.nodes[1].parent = None;
        reordered.nodes[2].parent = None;

        for model in [door_model(), reordered] {
            let mut s = session();
            s.attach_model(&model).unwrap();
            let frame = s.tick(DT);
            assert_eq!(frame.draws.len(), 4);
            for d in &frame.draws {
                let name = &s.scene().node(d.node).unwrap().name;
                match name.as_str() {
                    "EyeLeft" | "EyeRight" => {
                        assert!(matches!(d.material, MaterialKind::Eye(_)))
                    }
                    _ => assert_eq!(d.material, MaterialKind::Toon),
                }
            }
        }
    }

    #[test]
    fn resize_twice_equals_resize_once() {
        let mut a = session();
        let mut b = session();
        let once = a.resize(1280.0, 720.0, 3.0).unwrap();
        b.resize(1280.0, 720.0, 3.0).unwrap();
        let twice = b.resize(1280.0, 720.0, 3.0).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, (2560, 1440));
        assert_eq!(a.camera().aspect, b.camera().aspect);
        assert_eq!(a.viewport(), b.viewport());
    }

    #[test]
    fn drag_then_ticks_orbit_the_camera() {
        let mut s = session();
        let start = s.camera().position;
        s.drag_started(100.0, 300.0);
        s.pointer_moved(300.0, 300.0);
        s.drag_ended();
        s.tick(DT);
        assert_ne!(s.camera().position, start);
        assert!((s.camera().position.length() - start.length()).abs() < 1e-4);
    }

    #[test]
    fn leaving_the_window_ends_the_drag() {
        let mut s = session();
        let start = s.camera().position;
        s.drag_started(100.0, 300.0);
        assert!(s.pointer_left());
        assert!(!s.pointer_left());
        // Hovering back in without a button must not orbit.
        s.pointer_moved(300.0, 300.0);
        s.pointer_moved(500.0, 100.0);
        for _ in 0..10 {
            s.tick(DT);
        }
        assert!((s.camera().position - start).abs().max_element() < 1e-5);
    }

    #[test]
    fn light_turns_with_time() {
        let mut s = session();
        let a = s.tick(DT).light_dir;
        let b = s.tick(0.5).light_dir;
        assert_ne!(a, b);
    }
}
