/// modelview core - scene, camera, controls and model loading for the viewer
///
/// Platform-independent half of the `<three-d-viewer>` element: everything
/// except the surface the frames end up on and the event sources driving it.

pub mod camera;
pub mod config;
pub mod controls;
pub mod error;
pub mod frame_loop;
pub mod geometry;
pub mod loader;
pub mod raster;
pub mod renderer;
pub mod scene;
pub mod stl;
pub mod transform;
pub mod viewer;

// Re-export commonly used types
pub use camera::{PerspectiveCamera, SurfaceSize};
pub use config::ViewerConfig;
pub use controls::{ControlInput, OrbitControls, PointerButton};
pub use error::{ConfigError, LoadError};
pub use frame_loop::{FrameLoop, LoopState};
pub use geometry::{Mesh, Triangle, Vertex};
pub use loader::{CancelToken, LoadEvent, LoadProgress, LoadRequest};
pub use raster::Raster;
pub use renderer::{Renderer, SoftwareRenderer};
pub use scene::{Color, Light, NodeKind, Scene, SceneNode};
pub use transform::Transform;
pub use viewer::{ModelStatus, Viewer, ViewerState};
