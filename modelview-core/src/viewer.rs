//! The viewer instance behind one `<three-d-viewer>` element.
//!
//! Lifecycle:
//!
//! ```text
//! Unmounted -> Initializing -> Rendering(Absent) -> Rendering(Present)
//!                                   |                      |
//!                                   +------> Disposed <----+
//! ```
//!
//! `Rendering(Absent)` is terminal when the model fails to load. A disposed
//! viewer can be mounted again and starts over with a fresh scene.

use nalgebra::Point3;

use crate::camera::{PerspectiveCamera, SurfaceSize};
use crate::config::ViewerConfig;
use crate::controls::{ControlInput, OrbitControls};
use crate::error::LoadError;
use crate::frame_loop::FrameLoop;
use crate::loader::{CancelToken, LoadEvent, LoadProgress, LoadRequest};
use crate::renderer::Renderer;
use crate::scene::{Light, Scene, SceneNode};
use crate::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Absent,
    Present,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Unmounted,
    Initializing,
    Rendering(ModelStatus),
    Disposed,
}

pub struct Viewer<R: Renderer> {
    config: ViewerConfig,
    renderer: R,
    state: ViewerState,
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    container: SurfaceSize,
    frame_loop: FrameLoop,
    pending_load: Option<LoadRequest>,
    next_load_id: u64,
    progress: Option<LoadProgress>,
    load_error: Option<LoadError>,
}

impl<R: Renderer> Viewer<R> {
    pub fn new(config: ViewerConfig, renderer: R) -> Self {
        let camera = PerspectiveCamera::from_config(&config.camera, 1.0);
        let controls = OrbitControls::new(&config.controls, SurfaceSize::default());
        Self {
            config,
            renderer,
            state: ViewerState::Unmounted,
            scene: Scene::new(),
            camera,
            controls,
            container: SurfaceSize::default(),
            frame_loop: FrameLoop::new(),
            pending_load: None,
            next_load_id: 0,
            progress: None,
            load_error: None,
        }
    }

    /// Build the scene for a container of `container` CSS pixels.
    ///
    /// Returns the model fetch the host must perform, or `None` when the
    /// viewer is already mounted.
    pub fn mount(&mut self, container: SurfaceSize, pixel_ratio: f32) -> Option<LoadRequest> {
        if self.is_mounted() {
            log::debug!("viewer already mounted, ignoring mount");
            return None;
        }
        self.state = ViewerState::Initializing;
        self.container = container;
        self.scene = Scene::new();
        self.progress = None;
        self.load_error = None;

        let aspect = container.aspect().unwrap_or_else(|| {
            log::warn!(
                "container is {}x{}, using aspect 1.0 until the next resize",
                container.width,
                container.height
            );
            1.0
        });
        self.camera = PerspectiveCamera::from_config(&self.config.camera, aspect);
        log::debug!("camera position set to z={}", self.config.camera.distance);

        self.renderer.set_pixel_ratio(pixel_ratio);
        self.renderer.set_size(container);
        log::debug!(
            "renderer sized to {}x{} at pixel ratio {}",
            container.width,
            container.height,
            pixel_ratio
        );

        self.controls = OrbitControls::new(&self.config.controls, container);
        log::debug!("orbit controls initialized");

        let lighting = &self.config.lighting;
        self.scene.add(
            SceneNode::light(Light::Ambient {
                color: lighting.ambient_color,
                intensity: lighting.ambient_intensity,
            })
            .with_name("ambient"),
        );
        self.scene.add(
            SceneNode::light(Light::Directional {
                color: lighting.directional_color,
                intensity: lighting.directional_intensity,
                position: Point3::from(lighting.directional_position),
            })
            .with_name("directional"),
        );

        let request = LoadRequest {
            id: self.next_load_id,
            url: self.config.model_url.clone(),
            cancel: CancelToken::new(),
        };
        self.next_load_id += 1;
        self.pending_load = Some(request.clone());

        self.frame_loop.start();
        self.state = ViewerState::Rendering(ModelStatus::Absent);
        Some(request)
    }

    pub fn is_mounted(&self) -> bool {
        matches!(
            self.state,
            ViewerState::Initializing | ViewerState::Rendering(_)
        )
    }

    /// Track a new container size: camera aspect, projection, renderer size.
    ///
    /// A zero-sized container keeps the previous aspect ratio.
    pub fn resize(&mut self, container: SurfaceSize) {
        if !self.is_mounted() {
            return;
        }
        self.container = container;
        match container.aspect() {
            Some(aspect) => self.camera.aspect = aspect,
            None => log::warn!(
                "container resized to {}x{}, keeping aspect {}",
                container.width,
                container.height,
                self.camera.aspect
            ),
        }
        self.camera.update_projection_matrix();
        self.renderer.set_size(container);
        self.controls.set_surface(container);
    }

    /// One frame: advance the controls, then draw.
    ///
    /// Returns `Ok(false)` once the frame loop has stopped; hosts must not
    /// schedule another frame after that.
    pub fn frame(&mut self) -> Result<bool, R::Error> {
        if !self.frame_loop.tick() {
            return Ok(false);
        }
        self.controls.update(&mut self.camera);
        self.renderer.render(&self.scene, &self.camera)?;
        Ok(true)
    }

    pub fn handle_input(&mut self, input: ControlInput) {
        if self.is_mounted() {
            self.controls.handle(input, &self.camera);
        }
    }

    /// Feed back an event for load request `id`.
    ///
    /// Events for stale or cancelled requests are dropped, so a model can
    /// never be attached twice or after disposal. Returns whether the event
    /// was applied.
    pub fn handle_load_event(&mut self, id: u64, event: LoadEvent) -> bool {
        let Some(pending) = &self.pending_load else {
            log::debug!("dropping event for load {id}: nothing pending");
            return false;
        };
        if pending.id != id || pending.cancel.is_cancelled() {
            log::debug!("dropping event for stale load {id}");
            return false;
        }

        match event {
            LoadEvent::Progress(progress) => {
                match progress.percent() {
                    Some(percent) => log::info!("{percent:.0}% loaded"),
                    None => log::info!("{} bytes loaded", progress.loaded),
                }
                self.progress = Some(progress);
            }
            LoadEvent::Loaded(mut model) => {
                self.pending_load = None;
                if self.scene.model_count() > 0 {
                    log::warn!("model already attached, dropping second load");
                    return false;
                }
                let [x, y, z] = self.config.model_rotation;
                model.transform.rotate(Transform::euler_xyz(x, y, z));
                log::debug!(
                    "model loaded ({} triangles), rotated by [{x}, {y}, {z}] rad",
                    model.triangle_count()
                );
                self.scene.add(model);
                self.state = ViewerState::Rendering(ModelStatus::Present);
            }
            LoadEvent::Failed(err) => {
                let url = self.pending_load.take().map(|p| p.url).unwrap_or_default();
                log::error!("failed to load model {url}: {err}");
                self.load_error = Some(err);
            }
        }
        true
    }

    /// Release the instance: stop the frame loop and cancel any pending load
    pub fn dispose(&mut self) {
        if let Some(pending) = self.pending_load.take() {
            pending.cancel.cancel();
        }
        self.frame_loop.stop();
        if self.state != ViewerState::Disposed {
            log::debug!("viewer disposed after {} frames", self.frame_loop.frames());
        }
        self.state = ViewerState::Disposed;
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn container(&self) -> SurfaceSize {
        self.container
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    pub fn pending_load(&self) -> Option<&LoadRequest> {
        self.pending_load.as_ref()
    }

    pub fn load_progress(&self) -> Option<LoadProgress> {
        self.progress
    }

    pub fn load_error(&self) -> Option<&LoadError> {
        self.load_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mesh;
    use crate::renderer::SoftwareRenderer;
    use crate::scene::NodeKind;
    use nalgebra::{UnitQuaternion, Vector3};
    use std::convert::Infallible;
    use std::f32::consts::FRAC_PI_2;

    /// Records what the viewer asked of its surface
    #[derive(Default)]
    struct RecordingRenderer {
        pixel_ratio: f32,
        size: SurfaceSize,
        renders: usize,
    }

    impl Renderer for RecordingRenderer {
        type Error = Infallible;

        fn set_pixel_ratio(&mut self, ratio: f32) {
            self.pixel_ratio = ratio;
        }

        fn set_size(&mut self, size: SurfaceSize) {
            self.size = size;
        }

        fn size(&self) -> SurfaceSize {
            self.size
        }

        fn render(
            &mut self,
            _scene: &Scene,
            _camera: &PerspectiveCamera,
        ) -> Result<(), Infallible> {
            self.renders += 1;
            Ok(())
        }
    }

    fn mounted(width: u32, height: u32) -> (Viewer<RecordingRenderer>, LoadRequest) {
        let mut viewer = Viewer::new(ViewerConfig::default(), RecordingRenderer::default());
        let request = viewer.mount(SurfaceSize::new(width, height), 2.0).unwrap();
        (viewer, request)
    }

    fn model() -> SceneNode {
        let mut root = SceneNode::group().with_name("Scene");
        root.add_child(SceneNode::mesh(Mesh::cube(1.0)));
        root
    }

    #[test]
    fn test_mount_builds_scene() {
        let (viewer, request) = mounted(800, 600);
        assert_eq!(viewer.state(), ViewerState::Rendering(ModelStatus::Absent));
        assert!((viewer.camera().aspect - 1.3333).abs() < 1e-4);
        assert_eq!(viewer.camera().position, Point3::new(0.0, 0.0, 10.0));
        assert_eq!(viewer.renderer().size, SurfaceSize::new(800, 600));
        assert_eq!(viewer.renderer().pixel_ratio, 2.0);
        assert_eq!(viewer.scene().light_count(), 2);
        assert_eq!(viewer.scene().model_count(), 0);
        assert_eq!(request.url, "WWS_000.glb");
        assert!(viewer.frame_loop().is_running());
    }

    #[test]
    fn test_aspect_matches_any_positive_container() {
        for (w, h) in [(1, 1), (1920, 1080), (3, 7000), (640, 480)] {
            let (viewer, _) = mounted(w, h);
            assert!((viewer.camera().aspect - w as f32 / h as f32).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_height_container_falls_back() {
        let (mut viewer, _) = mounted(800, 0);
        assert_eq!(viewer.camera().aspect, 1.0);
        assert!(viewer.camera().projection_matrix().iter().all(|v| v.is_finite()));

        viewer.resize(SurfaceSize::new(300, 150));
        assert_eq!(viewer.camera().aspect, 2.0);
    }

    #[test]
    fn test_resize_sequence_tracks_last_size() {
        let (mut viewer, _) = mounted(800, 600);
        viewer.resize(SurfaceSize::new(400, 400));
        assert_eq!(viewer.camera().aspect, 1.0);
        assert_eq!(viewer.renderer().size, SurfaceSize::new(400, 400));

        for (w, h) in [(1000, 500), (10, 20), (640, 480)] {
            viewer.resize(SurfaceSize::new(w, h));
        }
        assert!((viewer.camera().aspect - 640.0 / 480.0).abs() < 1e-6);
        assert_eq!(viewer.renderer().size, SurfaceSize::new(640, 480));
        assert_eq!(viewer.container(), SurfaceSize::new(640, 480));

        let expected = PerspectiveCamera::new(0.5, 640.0 / 480.0, 0.1, 2000.0);
        assert!((viewer.camera().projection_matrix() - expected.projection_matrix()).norm() < 1e-3);
    }

    #[test]
    fn test_load_attaches_rotated_model_once() {
        let (mut viewer, request) = mounted(800, 600);
        assert!(viewer.handle_load_event(request.id, LoadEvent::Loaded(model())));
        assert_eq!(viewer.state(), ViewerState::Rendering(ModelStatus::Present));
        assert_eq!(viewer.scene().model_count(), 1);

        let attached = viewer.scene().models().next().unwrap();
        let quarter = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2);
        assert!(attached.transform.rotation.angle_to(&quarter) < 1e-6);

        // A duplicate completion never double-attaches
        assert!(!viewer.handle_load_event(request.id, LoadEvent::Loaded(model())));
        assert_eq!(viewer.scene().model_count(), 1);
        assert_eq!(viewer.scene().children().len(), 3);
    }

    #[test]
    fn test_rotation_is_relative_to_loaded_orientation() {
        let (mut viewer, request) = mounted(800, 600);
        let mut tilted = model();
        tilted.transform.rotate_axis(Vector3::y_axis(), 0.3);
        let loaded = tilted.transform.rotation;
        viewer.handle_load_event(request.id, LoadEvent::Loaded(tilted));

        let attached = viewer.scene().models().next().unwrap();
        assert!((attached.transform.rotation.angle_to(&loaded) - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_failed_load_keeps_only_lights() {
        let (mut viewer, request) = mounted(800, 600);
        let failure = LoadEvent::Failed(LoadError::Http {
            status: 404,
            text: "Not Found".into(),
        });
        assert!(viewer.handle_load_event(request.id, failure));

        assert_eq!(viewer.state(), ViewerState::Rendering(ModelStatus::Absent));
        assert_eq!(viewer.scene().children().len(), 2);
        assert!(viewer.scene().children().iter().all(SceneNode::is_light));
        assert!(viewer.load_error().is_some());
        assert!(viewer.pending_load().is_none());

        // Terminal: a late success for the same request is ignored
        assert!(!viewer.handle_load_event(request.id, LoadEvent::Loaded(model())));
        assert_eq!(viewer.scene().model_count(), 0);
        assert_eq!(viewer.frame(), Ok(true));
    }

    #[test]
    fn test_progress_changes_nothing_but_progress() {
        let (mut viewer, request) = mounted(800, 600);
        let progress = LoadProgress {
            loaded: 50,
            total: Some(200),
        };
        assert!(viewer.handle_load_event(request.id, LoadEvent::Progress(progress)));
        assert_eq!(viewer.load_progress(), Some(progress));
        assert_eq!(viewer.scene().children().len(), 2);
        assert!(viewer.pending_load().is_some());
    }

    #[test]
    fn test_frames_render_until_disposed() {
        let (mut viewer, request) = mounted(800, 600);
        assert_eq!(viewer.frame(), Ok(true));
        assert_eq!(viewer.frame(), Ok(true));
        assert_eq!(viewer.renderer().renders, 2);

        viewer.dispose();
        assert_eq!(viewer.state(), ViewerState::Disposed);
        assert!(request.cancel.is_cancelled());
        assert_eq!(viewer.frame(), Ok(false));
        assert_eq!(viewer.renderer().renders, 2);

        // Completion after teardown is discarded
        assert!(!viewer.handle_load_event(request.id, LoadEvent::Loaded(model())));
        assert_eq!(viewer.scene().model_count(), 0);

        // Resizes after teardown are ignored
        viewer.resize(SurfaceSize::new(10, 10));
        assert_eq!(viewer.renderer().size, SurfaceSize::new(800, 600));
    }

    #[test]
    fn test_mount_is_guarded_and_remount_starts_fresh() {
        let (mut viewer, first) = mounted(800, 600);
        assert!(viewer.mount(SurfaceSize::new(100, 100), 1.0).is_none());
        assert!(viewer.handle_load_event(first.id, LoadEvent::Loaded(model())));

        viewer.dispose();
        let second = viewer.mount(SurfaceSize::new(100, 100), 1.0).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(viewer.state(), ViewerState::Rendering(ModelStatus::Absent));
        assert_eq!(viewer.scene().model_count(), 0);
        assert_eq!(viewer.scene().light_count(), 2);

        assert!(!viewer.handle_load_event(first.id, LoadEvent::Loaded(model())));
        assert!(viewer.handle_load_event(second.id, LoadEvent::Loaded(model())));
    }

    #[test]
    fn test_input_drives_camera_through_frames() {
        let (mut viewer, _) = mounted(400, 400);
        viewer.handle_input(ControlInput::Rotate { left: -1.0, up: 0.0 });
        viewer.frame().unwrap();
        let theta = viewer.camera().position.x.atan2(viewer.camera().position.z);
        assert!((theta - 0.05).abs() < 1e-4);
    }

    #[test]
    fn test_software_renderer_draws_loaded_model() {
        let renderer = SoftwareRenderer::new(Default::default());
        let mut viewer = Viewer::new(ViewerConfig::default(), renderer);
        let request = viewer.mount(SurfaceSize::new(40, 40), 1.0).unwrap();
        viewer.handle_load_event(request.id, LoadEvent::Loaded(model()));
        viewer.frame().unwrap();

        let pixels = viewer.renderer().pixels();
        assert_eq!(pixels.len(), 40 * 40 * 4);
        assert!(pixels.chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn test_model_node_kind_is_group() {
        let (mut viewer, request) = mounted(800, 600);
        viewer.handle_load_event(request.id, LoadEvent::Loaded(model()));
        let attached = viewer.scene().models().next().unwrap();
        assert!(matches!(attached.kind, NodeKind::Group));
        assert_eq!(attached.triangle_count(), 12);
    }
}
