//! Corner splitting for shared-vertex meshes.
//!
//! Generic scene meshes may carry UVs, colors and normals per face corner,
//! while the legacy grammar stores one attribute tuple per vertex index.
//! [`split_corners`] walks every corner, keys it by its
//! (position, uv, color) values and hands out vertex indices in first-seen
//! order, so the same input always produces the same vertex order.

use std::collections::HashMap;

use xconv_math::{DVec2, DVec3};

use crate::mesh::{check_faces, Mesh, MeshNormals, TopologyError, TopologyResult};

/// Attribute samples, either one per vertex or one per face corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Samples<'a, T> {
    /// Indexed by position index
    Vertex(&'a [T]),
    /// Indexed by `3 * face + corner`
    Corner(&'a [T]),
}

impl<'a, T: Copy> Samples<'a, T> {
    fn at(&self, vertex: u32, corner: usize) -> T {
        match self {
            Samples::Vertex(values) => values[vertex as usize],
            Samples::Corner(values) => values[corner],
        }
    }

    fn check_len(
        &self,
        mesh: &str,
        stream: &'static str,
        vertex_count: usize,
        corner_count: usize,
    ) -> TopologyResult<()> {
        let (declared, actual) = match self {
            Samples::Vertex(values) => (vertex_count, values.len()),
            Samples::Corner(values) => (corner_count, values.len()),
        };
        if declared != actual {
            return Err(TopologyError::StreamLength {
                mesh: mesh.to_string(),
                stream,
                declared,
                actual,
            });
        }
        Ok(())
    }
}

/// Input of [`split_corners`].
#[derive(Clone, Copy, Debug)]
pub struct CornerMesh<'a> {
    pub name: &'a str,
    pub positions: &'a [DVec3],
    pub faces: &'a [[u32; 3]],
    pub uvs: Option<Samples<'a, DVec2>>,
    pub colors: Option<Samples<'a, DVec3>>,
    pub normals: Option<Samples<'a, DVec3>>,
}

/// Shared-vertex output of [`split_corners`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplitMesh {
    pub positions: Vec<DVec3>,
    pub faces: Vec<[u32; 3]>,
    /// One normal per new vertex, faces identical to `faces`
    pub normals: Option<MeshNormals>,
    pub uvs: Option<Vec<DVec2>>,
    pub colors: Option<Vec<DVec3>>,
}

impl SplitMesh {
    /// Move the streams into a named mesh with no material binding.
    pub fn into_mesh(self, name: impl Into<String>) -> Mesh {
        Mesh {
            name: name.into(),
            positions: self.positions,
            faces: self.faces,
            normals: self.normals,
            uvs: self.uvs,
            colors: self.colors,
            ..Default::default()
        }
    }
}

/// Bit pattern of a float with both zeros folded together.
fn key_bits(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

/// Identity of one output vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CornerKey {
    position: [u64; 3],
    uv: Option<[u64; 2]>,
    color: Option<[u64; 3]>,
}

impl CornerKey {
    pub fn new(position: DVec3, uv: Option<DVec2>, color: Option<DVec3>) -> Self {
        Self {
            position: position.to_array().map(key_bits),
            uv: uv.map(|v| v.to_array().map(key_bits)),
            color: color.map(|c| c.to_array().map(key_bits)),
        }
    }
}

/// First-seen index assignment for corner keys.
#[derive(Debug, Default)]
pub struct VertexReconciler {
    indices: HashMap<CornerKey, u32>,
    positions: Vec<DVec3>,
    uvs: Vec<DVec2>,
    colors: Vec<DVec3>,
    normals: Vec<DVec3>,
}

impl VertexReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for a corner, appending a new vertex the first time its key is seen.
    ///
    /// The normal of the first corner with a given key is the one kept.
    pub fn resolve(
        &mut self,
        position: DVec3,
        uv: Option<DVec2>,
        color: Option<DVec3>,
        normal: Option<DVec3>,
    ) -> u32 {
        let key = CornerKey::new(position, uv, color);
        if let Some(&index) = self.indices.get(&key) {
            return index;
        }

        let index = self.positions.len() as u32;
        self.indices.insert(key, index);
        self.positions.push(position);
        if let Some(uv) = uv {
            self.uvs.push(uv);
        }
        if let Some(color) = color {
            self.colors.push(color);
        }
        if let Some(normal) = normal {
            self.normals.push(normal);
        }
        index
    }

    /// Number of distinct vertices seen so far.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Rebuild a corner-attributed mesh in shared-vertex form.
pub fn split_corners(input: &CornerMesh<'_>) -> TopologyResult<SplitMesh> {
    let vertex_count = input.positions.len();
    let corner_count = input.faces.len() * 3;

    check_faces(input.name, "position", input.faces, vertex_count)?;
    if let Some(uvs) = &input.uvs {
        uvs.check_len(input.name, "uv", vertex_count, corner_count)?;
    }
    if let Some(colors) = &input.colors {
        colors.check_len(input.name, "color", vertex_count, corner_count)?;
    }
    if let Some(normals) = &input.normals {
        normals.check_len(input.name, "normal", vertex_count, corner_count)?;
    }

    let mut reconciler = VertexReconciler::new();
    let mut faces = Vec::with_capacity(input.faces.len());

    for (f, face) in input.faces.iter().enumerate() {
        let mut resolved = [0u32; 3];
        for (i, &vertex) in face.iter().enumerate() {
            let corner = f * 3 + i;
            resolved[i] = reconciler.resolve(
                input.positions[vertex as usize],
                input.uvs.map(|s| s.at(vertex, corner)),
                input.colors.map(|s| s.at(vertex, corner)),
                input.normals.map(|s| s.at(vertex, corner)),
            );
        }
        faces.push(resolved);
    }

    log::debug!(
        "Mesh {}: {} corners over {} vertices -> {} split vertices",
        input.name,
        corner_count,
        vertex_count,
        reconciler.vertex_count()
    );

    let VertexReconciler {
        positions,
        uvs,
        colors,
        normals,
        ..
    } = reconciler;

    Ok(SplitMesh {
        normals: input.normals.map(|_| MeshNormals {
            normals,
            faces: faces.clone(),
        }),
        uvs: input.uvs.map(|_| uvs),
        colors: input.colors.map(|_| colors),
        positions,
        faces,
    })
}
