/// Triangle meshes carried by model nodes
use nalgebra::{Point3, Vector3};

use crate::scene::Color;

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from the winding order, `None` for degenerate faces
    pub fn face_normal(&self) -> Option<Vector3<f32>> {
        let [a, b, c] = &self.vertices;
        (b.position - a.position)
            .cross(&(c.position - a.position))
            .try_normalize(1e-12)
    }
}

/// A single-colored triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
    pub color: Color,
}

impl Mesh {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
            color: Color::WHITE,
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Build a mesh from indexed triangle lists.
    ///
    /// Missing normals are replaced by the face normal. Out-of-range indices
    /// and trailing partial triangles are skipped.
    pub fn from_indexed(
        positions: &[[f32; 3]],
        normals: Option<&[[f32; 3]]>,
        indices: &[u32],
    ) -> Self {
        let mut mesh = Self::with_capacity(indices.len() / 3);

        for face in indices.chunks_exact(3) {
            let mut corners = [Vertex::new(Point3::origin(), Vector3::zeros()); 3];
            let mut valid = true;
            for (corner, &index) in corners.iter_mut().zip(face) {
                let index = index as usize;
                let Some(p) = positions.get(index) else {
                    valid = false;
                    break;
                };
                corner.position = Point3::new(p[0], p[1], p[2]);
                if let Some(n) = normals.and_then(|n| n.get(index)) {
                    corner.normal = Vector3::new(n[0], n[1], n[2]);
                }
            }
            if !valid {
                continue;
            }

            let mut triangle = Triangle::new(corners[0], corners[1], corners[2]);
            if normals.is_none() {
                let normal = triangle.face_normal().unwrap_or_else(Vector3::z);
                for vertex in &mut triangle.vertices {
                    vertex.normal = normal;
                }
            }
            mesh.add_triangle(triangle);
        }

        mesh
    }

    /// Axis-aligned cube centered on the origin
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let corners = [
            [-h, -h, -h],
            [h, -h, -h],
            [h, h, -h],
            [-h, h, -h],
            [-h, -h, h],
            [h, -h, h],
            [h, h, h],
            [-h, h, h],
        ];
        #[rustfmt::skip]
        let indices = [
            4, 5, 6, 4, 6, 7, // front
            0, 3, 2, 0, 2, 1, // back
            3, 7, 6, 3, 6, 2, // top
            0, 1, 5, 0, 5, 4, // bottom
            1, 2, 6, 1, 6, 5, // right
            0, 4, 7, 0, 7, 3, // left
        ];
        Self::from_indexed(&corners, None, &indices)
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_normals_point_outward() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.triangles.len(), 12);
        for triangle in &cube.triangles {
            let normal = triangle.vertices[0].normal;
            let centroid = triangle
                .vertices
                .iter()
                .fold(Vector3::zeros(), |acc, v| acc + v.position.coords)
                / 3.0;
            assert!(normal.dot(&centroid) > 0.0);
        }
    }

    #[test]
    fn test_from_indexed_skips_bad_indices() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let mesh = Mesh::from_indexed(&positions, None, &[0, 1, 2, 0, 1, 9, 2]);
        assert_eq!(mesh.triangles.len(), 1);
        assert!((mesh.triangles[0].vertices[0].normal - Vector3::z()).norm() < 1e-6);
    }
}
