/// Depth-buffered triangle rasterizer shared by every renderer
use nalgebra::{Matrix3, Vector3};

use crate::camera::{PerspectiveCamera, ScreenPoint, SurfaceSize};
use crate::scene::{Color, Scene};

/// Color and depth samples for one frame
pub struct Raster {
    size: SurfaceSize,
    depth: Vec<f32>,
    color: Vec<Vector3<f32>>,
    covered: Vec<bool>,
}

impl Raster {
    pub fn new(size: SurfaceSize) -> Self {
        let area = size.area();
        Self {
            size,
            depth: vec![f32::INFINITY; area],
            color: vec![Vector3::zeros(); area],
            covered: vec![false; area],
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn resize(&mut self, size: SurfaceSize) {
        if size != self.size {
            *self = Self::new(size);
        }
    }

    pub fn clear(&mut self, background: Color) {
        let background = background.to_vector();
        self.depth.fill(f32::INFINITY);
        self.color.fill(background);
        self.covered.fill(false);
    }

    /// Shaded color of the sample at `(x, y)`
    pub fn color_at(&self, x: u32, y: u32) -> Vector3<f32> {
        self.color[self.index(x, y)]
    }

    /// Whether any triangle covered the sample at `(x, y)`
    pub fn covered_at(&self, x: u32, y: u32) -> bool {
        self.covered[self.index(x, y)]
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size.width as usize + x as usize
    }

    /// Rasterize every mesh of `scene` as seen through `camera`.
    ///
    /// Faces are flat shaded with the scene's lights; back faces are culled.
    /// Returns the number of triangles that reached the rasterizer.
    pub fn draw_scene(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> usize {
        let lighting = scene.lighting();
        let view_projection = camera.view_projection();
        let mut drawn = 0;

        for (world, mesh) in scene.meshes() {
            let mvp = view_projection * world;
            let normal_matrix: Matrix3<f32> = world
                .fixed_view::<3, 3>(0, 0)
                .clone_owned()
                .try_inverse()
                .map(|m| m.transpose())
                .unwrap_or_else(Matrix3::identity);
            let base = mesh.color.to_vector();

            for triangle in &mesh.triangles {
                let mut projected = [ScreenPoint {
                    x: 0.0,
                    y: 0.0,
                    depth: 0.0,
                }; 3];
                let mut visible = true;
                for (out, vertex) in projected.iter_mut().zip(&triangle.vertices) {
                    match PerspectiveCamera::project_to_screen(&mvp, &vertex.position, self.size) {
                        Some(point) => *out = point,
                        None => {
                            visible = false;
                            break;
                        }
                    }
                }
                if !visible || !is_front_facing(&projected) {
                    continue;
                }

                let normal = triangle
                    .vertices
                    .iter()
                    .fold(Vector3::zeros(), |acc, v| acc + v.normal);
                let normal = (normal_matrix * normal)
                    .try_normalize(1e-12)
                    .unwrap_or_else(Vector3::z);
                let shade = base
                    .component_mul(&lighting.shade(&normal))
                    .map(|c| c.clamp(0.0, 1.0));

                self.fill_triangle(&projected, shade);
                drawn += 1;
            }
        }

        drawn
    }

    fn fill_triangle(&mut self, points: &[ScreenPoint; 3], shade: Vector3<f32>) {
        let [v0, v1, v2] = points;

        let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as i64;
        let max_x = (v0.x.max(v1.x).max(v2.x).ceil() as i64).min(self.size.width as i64 - 1);
        let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0) as i64;
        let max_y = (v0.y.max(v1.y).max(v2.y).ceil() as i64).min(self.size.height as i64 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                let Some((w0, w1, w2)) = barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), p)
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                if !(-1.0..=1.0).contains(&depth) {
                    continue;
                }
                let idx = y as usize * self.size.width as usize + x as usize;
                if depth < self.depth[idx] {
                    self.depth[idx] = depth;
                    self.color[idx] = shade;
                    self.covered[idx] = true;
                }
            }
        }
    }
}

/// Counter-clockwise in NDC shows up clockwise once Y points down
fn is_front_facing(points: &[ScreenPoint; 3]) -> bool {
    let [a, b, c] = points;
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y) < 0.0
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
