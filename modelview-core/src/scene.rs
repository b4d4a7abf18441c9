//! Scene graph: a flat root list of nodes, each owning its own subtree.

use nalgebra::{Matrix4, Point3, Vector3};
use serde::Deserialize;

use crate::geometry::Mesh;
use crate::transform::Transform;

/// Linear RGB color in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "u32")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB`
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    pub fn to_vector(self) -> Vector3<f32> {
        Vector3::new(self.r, self.g, self.b)
    }
}

impl From<u32> for Color {
    fn from(hex: u32) -> Self {
        Self::from_hex(hex)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    /// Uniform light from every direction
    Ambient { color: Color, intensity: f32 },
    /// Parallel rays travelling from `position` towards the origin
    Directional {
        color: Color,
        intensity: f32,
        position: Point3<f32>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    Light(Light),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    pub transform: Transform,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            transform: Transform::identity(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn mesh(mesh: Mesh) -> Self {
        Self::new(NodeKind::Mesh(mesh))
    }

    pub fn light(light: Light) -> Self {
        Self::new(NodeKind::Light(light))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    pub fn is_light(&self) -> bool {
        matches!(self.kind, NodeKind::Light(_))
    }

    /// Triangles in this node and all descendants
    pub fn triangle_count(&self) -> usize {
        let own = match &self.kind {
            NodeKind::Mesh(mesh) => mesh.triangles.len(),
            _ => 0,
        };
        own + self.children.iter().map(SceneNode::triangle_count).sum::<usize>()
    }

    fn collect_meshes<'a>(
        &'a self,
        parent: &Matrix4<f32>,
        out: &mut Vec<(Matrix4<f32>, &'a Mesh)>,
    ) {
        let world = parent * self.transform.matrix();
        if let NodeKind::Mesh(mesh) = &self.kind {
            out.push((world, mesh));
        }
        for child in &self.children {
            child.collect_meshes(&world, out);
        }
    }
}

/// Light accumulated over the whole scene, ready for shading
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub ambient: Vector3<f32>,
    /// (unit vector towards the light, radiance)
    pub directional: Vec<(Vector3<f32>, Vector3<f32>)>,
}

impl Lighting {
    /// Lambert term for a unit surface normal
    pub fn shade(&self, normal: &Vector3<f32>) -> Vector3<f32> {
        self.directional
            .iter()
            .fold(self.ambient, |acc, (direction, radiance)| {
                acc + radiance * normal.dot(direction).max(0.0)
            })
    }
}

/// Root of the scene graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    children: Vec<SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: SceneNode) {
        self.children.push(node);
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    pub fn light_count(&self) -> usize {
        self.children.iter().filter(|n| n.is_light()).count()
    }

    /// Non-light subtrees attached to the root
    pub fn models(&self) -> impl Iterator<Item = &SceneNode> {
        self.children.iter().filter(|n| !n.is_light())
    }

    pub fn model_count(&self) -> usize {
        self.models().count()
    }

    /// Every mesh in the scene with its world matrix
    pub fn meshes(&self) -> Vec<(Matrix4<f32>, &Mesh)> {
        let mut out = Vec::new();
        let root = Matrix4::identity();
        for child in &self.children {
            child.collect_meshes(&root, &mut out);
        }
        out
    }

    pub fn lighting(&self) -> Lighting {
        let mut lighting = Lighting {
            ambient: Vector3::zeros(),
            directional: Vec::new(),
        };
        for node in &self.children {
            match &node.kind {
                NodeKind::Light(Light::Ambient { color, intensity }) => {
                    lighting.ambient += color.to_vector() * *intensity;
                }
                NodeKind::Light(Light::Directional {
                    color,
                    intensity,
                    position,
                }) => {
                    if let Some(direction) = position.coords.try_normalize(1e-12) {
                        lighting
                            .directional
                            .push((direction, color.to_vector() * *intensity));
                    }
                }
                _ => {}
            }
        }
        lighting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        let color = Color::from_hex(0x404040);
        assert!((color.r - 64.0 / 255.0).abs() < 1e-6);
        assert_eq!(color.r, color.g);
        assert_eq!(color.g, color.b);
        assert_eq!(Color::from_hex(0xff0000), Color::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_counts_lights_and_models() {
        let mut scene = Scene::new();
        scene.add(SceneNode::light(Light::Ambient {
            color: Color::WHITE,
            intensity: 1.0,
        }));
        assert_eq!(scene.light_count(), 1);
        assert_eq!(scene.model_count(), 0);

        let mut model = SceneNode::group();
        model.add_child(SceneNode::mesh(Mesh::cube(1.0)));
        scene.add(model);
        assert_eq!(scene.model_count(), 1);
        assert_eq!(scene.models().next().unwrap().triangle_count(), 12);
    }

    #[test]
    fn test_meshes_carry_world_matrix() {
        let mut parent = SceneNode::group();
        parent.transform.translation = Vector3::new(1.0, 0.0, 0.0);
        let mut child = SceneNode::mesh(Mesh::cube(1.0));
        child.transform.translation = Vector3::new(0.0, 2.0, 0.0);
        parent.add_child(child);

        let mut scene = Scene::new();
        scene.add(parent);
        let meshes = scene.meshes();
        assert_eq!(meshes.len(), 1);
        let origin = meshes[0].0.transform_point(&Point3::origin());
        assert!((origin - Point3::new(1.0, 2.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_lighting_shade() {
        let mut scene = Scene::new();
        scene.add(SceneNode::light(Light::Ambient {
            color: Color::new(0.25, 0.25, 0.25),
            intensity: 1.0,
        }));
        scene.add(SceneNode::light(Light::Directional {
            color: Color::WHITE,
            intensity: 1.0,
            position: Point3::new(0.0, 0.0, 10.0),
        }));
        let lighting = scene.lighting();
        let lit = lighting.shade(&Vector3::z());
        let unlit = lighting.shade(&-Vector3::z());
        assert!((lit.x - 1.25).abs() < 1e-6);
        assert!((unlit.x - 0.25).abs() < 1e-6);
    }
}
