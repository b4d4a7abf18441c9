//! Model loading: format detection, parsing and the request/event protocol
//! between a viewer and the host that performs the actual fetch.
//!
//! The viewer hands out a [`LoadRequest`]; the host fetches the bytes (file,
//! HTTP, ...) and reports back with [`LoadEvent`]s tagged by the request id.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::LoadError;
use crate::geometry::Mesh;
use crate::scene::{Color, SceneNode};
use crate::stl;
use crate::transform::Transform;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Gltf,
    Stl,
}

pub fn detect_format(data: &[u8]) -> Result<ModelFormat, LoadError> {
    if data.starts_with(GLB_MAGIC) {
        return Ok(ModelFormat::Gltf);
    }
    let first = data.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'{') {
        return Ok(ModelFormat::Gltf);
    }
    if stl::looks_like_stl(data) {
        return Ok(ModelFormat::Stl);
    }
    Err(LoadError::UnsupportedFormat)
}

/// Parse a model file into a subtree rooted at a group node
pub fn parse_model(data: &[u8]) -> Result<SceneNode, LoadError> {
    let root = match detect_format(data)? {
        ModelFormat::Gltf => parse_gltf(data)?,
        ModelFormat::Stl => {
            let mut root = SceneNode::group();
            root.add_child(SceneNode::mesh(stl::parse_stl(data)?));
            root
        }
    };

    if root.triangle_count() == 0 {
        return Err(LoadError::Empty);
    }
    Ok(root)
}

fn parse_gltf(data: &[u8]) -> Result<SceneNode, LoadError> {
    let (document, buffers, _images) = gltf::import_slice(data)?;
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| LoadError::parse("glTF has no scenes"))?;

    let mut root = SceneNode::group().with_name(scene.name().unwrap_or("Scene"));
    for node in scene.nodes() {
        root.add_child(convert_node(&node, &buffers));
    }
    Ok(root)
}

fn convert_node(node: &gltf::Node, buffers: &[gltf::buffer::Data]) -> SceneNode {
    let (translation, rotation, scale) = node.transform().decomposed();
    let mut out = SceneNode::group();
    out.transform = Transform::from_trs(translation, rotation, scale);
    out.name = node.name().map(str::to_string);

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!("skipping non-triangle primitive {:?}", primitive.mode());
                continue;
            }
            let reader =
                primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            let mut geometry = Mesh::from_indexed(&positions, normals.as_deref(), &indices);
            let [r, g, b, _a] = primitive.material().pbr_metallic_roughness().base_color_factor();
            geometry.color = Color::new(r, g, b);
            out.add_child(SceneNode::mesh(geometry));
        }
    }

    for child in node.children() {
        out.add_child(convert_node(&child, buffers));
    }
    out
}

/// Shared cancellation flag for one load attempt
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One fetch the host must perform on behalf of a viewer
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub id: u64,
    pub url: String,
    pub cancel: CancelToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl LoadProgress {
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.loaded as f64 / total as f64 * 100.0),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress(LoadProgress),
    Loaded(SceneNode),
    Failed(LoadError),
}

impl LoadEvent {
    /// Terminal event for a finished fetch
    pub fn from_fetch(result: Result<Vec<u8>, LoadError>) -> Self {
        match result.and_then(|bytes| parse_model(&bytes)) {
            Ok(model) => LoadEvent::Loaded(model),
            Err(err) => LoadEvent::Failed(err),
        }
    }
}

/// Read everything from `reader`, reporting progress after each chunk.
///
/// Stops with [`LoadError::Cancelled`] as soon as `cancel` trips.
pub fn read_with_progress<R: Read>(
    mut reader: R,
    total: Option<u64>,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(LoadProgress),
) -> Result<Vec<u8>, LoadError> {
    let mut data = Vec::with_capacity(total.unwrap_or(0).min(1 << 28) as usize);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        if cancel.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..read]);
        on_progress(LoadProgress {
            loaded: data.len() as u64,
            total,
        });
    }
    Ok(data)
}
