//! Scene graph types for the legacy interchange format.
//!
//! A [`SceneDocument`] owns a material table, a single root [`Frame`] and the
//! animation sets. It is built once per conversion, either by the grammar
//! parser or by importing a generic scene, and is read-only afterwards.

use std::collections::HashSet;

use thiserror::Error;
use xconv_math::{DMat4, DMat4Ext, DVec3, DVec4};

use crate::animation::AnimationSet;
use crate::mesh::{Mesh, TopologyError};

/// Smallest roughness used when deriving a specular power.
///
/// Keeps `power = 1 / roughness` finite for perfectly smooth materials.
pub const MIN_ROUGHNESS: f64 = 1.0e-3;

/// Errors raised when a document breaks its invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("material {0} is defined more than once")]
    DuplicateMaterial(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Errors raised when a transform matrix text cannot be read.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("expected 16 matrix values, found {0}")]
    Count(usize),

    #[error("invalid matrix value `{0}`")]
    Number(String),
}

/// A legacy material definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name, unique within a document
    pub name: String,

    /// Diffuse color (RGBA, 0-1)
    pub face_color: DVec4,

    /// Specular power exponent
    pub power: f64,

    /// Specular color (RGB)
    pub specular_color: DVec3,

    /// Emissive color (RGB)
    pub emissive_color: DVec3,

    /// Diffuse texture file name
    pub texture_filename: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            face_color: DVec4::new(0.5, 0.5, 0.5, 1.0), // Grey default
            power: 1.0,
            specular_color: DVec3::ZERO,
            emissive_color: DVec3::ZERO,
            texture_filename: None,
        }
    }
}

impl Material {
    /// Create a new material with just a name and face color.
    pub fn new(name: impl Into<String>, face_color: DVec4) -> Self {
        Self {
            name: name.into(),
            face_color,
            ..Default::default()
        }
    }

    /// Roughness equivalent of the specular power.
    ///
    /// Legacy files often carry a power of zero; those read as fully rough.
    pub fn roughness(&self) -> f64 {
        if self.power > 0.0 {
            1.0 / self.power
        } else {
            1.0
        }
    }

    /// Specular power for a roughness value.
    pub fn power_from_roughness(roughness: f64) -> f64 {
        1.0 / roughness.max(MIN_ROUGHNESS)
    }
}

/// A frame transform: the matrix plus the numeric text it was read from.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameTransform {
    /// Joined matrix text as found in the source (empty when synthesized)
    pub text: String,

    /// The matrix, glam convention
    pub matrix: DMat4,
}

impl FrameTransform {
    /// Read 16 comma-separated row-major values.
    pub fn parse(text: &str) -> Result<Self, TransformError> {
        let values = text
            .split([',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>()
                    .map_err(|_| TransformError::Number(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let values: [f64; 16] = values
            .as_slice()
            .try_into()
            .map_err(|_| TransformError::Count(values.len()))?;

        Ok(Self {
            text: text.to_string(),
            matrix: DMat4::from_legacy_rows(&values),
        })
    }

    /// Wrap a matrix that has no source text.
    pub fn from_matrix(matrix: DMat4) -> Self {
        Self {
            text: String::new(),
            matrix,
        }
    }

    /// Build from four legacy rows.
    pub fn from_rows(rows: &[[f64; 4]; 4]) -> Self {
        let mut values = [0.0; 16];
        for (i, row) in rows.iter().enumerate() {
            values[i * 4..i * 4 + 4].copy_from_slice(row);
        }
        Self::from_matrix(DMat4::from_legacy_rows(&values))
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self::from_matrix(DMat4::IDENTITY)
    }

    /// The four legacy rows of the matrix.
    pub fn rows(&self) -> [[f64; 4]; 4] {
        self.matrix.to_legacy_rows()
    }
}

/// A named node of the transform hierarchy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    /// Frame name
    pub name: String,

    /// Local transform, if the frame declares one
    pub transform: Option<FrameTransform>,

    /// Meshes owned by this frame
    pub meshes: Vec<Mesh>,

    /// Child frames
    pub children: Vec<Frame>,
}

impl Frame {
    /// Create an empty frame.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the transform.
    pub fn with_transform(mut self, transform: FrameTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Find a frame by name in this subtree (depth-first).
    pub fn find(&self, name: &str) -> Option<&Frame> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Number of frames in this subtree, including this one.
    pub fn frame_count(&self) -> usize {
        1 + self.children.iter().map(Frame::frame_count).sum::<usize>()
    }

    /// Number of meshes in this subtree.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len() + self.children.iter().map(Frame::mesh_count).sum::<usize>()
    }

    /// Number of triangles in this subtree.
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum::<usize>()
            + self.children.iter().map(Frame::triangle_count).sum::<usize>()
    }

    /// Visit every mesh of the subtree together with its owning frame.
    pub fn for_each_mesh<'a>(&'a self, f: &mut impl FnMut(&'a Frame, &'a Mesh)) {
        for mesh in &self.meshes {
            f(self, mesh);
        }
        for child in &self.children {
            child.for_each_mesh(f);
        }
    }
}

/// A complete legacy document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneDocument {
    /// Materials in document order
    pub materials: Vec<Material>,

    /// The single root frame
    pub root: Frame,

    /// Animation sets in document order
    pub animation_sets: Vec<AnimationSet>,
}

impl SceneDocument {
    /// Create a document around a root frame.
    pub fn new(root: Frame) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    /// Add a material and return its index.
    pub fn add_material(&mut self, material: Material) -> usize {
        let id = self.materials.len();
        self.materials.push(material);
        id
    }

    /// Look up a material by name.
    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    /// Get material count.
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Get frame count.
    pub fn frame_count(&self) -> usize {
        self.root.frame_count()
    }

    /// Get mesh count.
    pub fn mesh_count(&self) -> usize {
        self.root.mesh_count()
    }

    /// Get total triangle count.
    pub fn total_triangle_count(&self) -> usize {
        self.root.triangle_count()
    }

    /// Check material name uniqueness and every mesh's topology.
    pub fn validate(&self) -> Result<(), DocumentError> {
        let mut seen = HashSet::new();
        for material in &self.materials {
            if !seen.insert(material.name.as_str()) {
                return Err(DocumentError::DuplicateMaterial(material.name.clone()));
            }
        }

        let mut result = Ok(());
        self.root.for_each_mesh(&mut |_, mesh| {
            if result.is_ok() {
                result = mesh.validate();
            }
        });
        result.map_err(DocumentError::from)
    }
}
