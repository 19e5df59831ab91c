//! Mesh geometry representation for the legacy scene graph.
//!
//! Meshes use the legacy shared-vertex layout: one position per index,
//! triangle faces indexing into the positions, and an optional normal
//! stream with its own face list. Corner-indexed data from other scene
//! descriptions is folded into this shape by [`crate::reconcile`].

use thiserror::Error;
use xconv_math::{DVec2, DVec3};

/// Errors describing a mesh whose topology cannot be written or trusted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("mesh {mesh}: face {face} has {corners} corners, only triangles are supported")]
    NonTriangle {
        mesh: String,
        face: usize,
        corners: usize,
    },

    #[error("mesh {mesh}: face {face} of the {stream} stream references index {index}, but only {count} entries exist")]
    IndexOutOfRange {
        mesh: String,
        stream: &'static str,
        face: usize,
        index: u32,
        count: usize,
    },

    #[error("mesh {mesh}: {stream} stream declares {declared} entries but holds {actual}")]
    StreamLength {
        mesh: String,
        stream: &'static str,
        declared: usize,
        actual: usize,
    },

    #[error("mesh {mesh}: {indices} per-face material indices for {faces} faces")]
    MaterialIndexCount {
        mesh: String,
        indices: usize,
        faces: usize,
    },

    #[error("mesh {mesh}: face {face} uses material {index}, but the material list has {count} entries")]
    MaterialIndexOutOfRange {
        mesh: String,
        face: usize,
        index: u32,
        count: usize,
    },

    #[error("mesh {mesh} has no {what}")]
    Empty { mesh: String, what: &'static str },
}

pub type TopologyResult<T> = Result<T, TopologyError>;

/// Normals stored as an independently indexed stream.
///
/// The legacy format does not require normal faces to share topology with
/// position faces, so both the values and their face list are kept.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshNormals {
    /// Normal vectors
    pub normals: Vec<DVec3>,

    /// Triangle faces indexing into `normals`
    pub faces: Vec<[u32; 3]>,
}

/// How a mesh refers to materials.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum MaterialBinding {
    /// No material list
    #[default]
    None,

    /// The whole mesh uses one material
    Single(String),

    /// One material index per face into `materials`
    PerFace {
        indices: Vec<u32>,
        materials: Vec<String>,
    },
}

impl MaterialBinding {
    /// Material names referenced by this binding, in list order.
    pub fn material_names(&self) -> Vec<&str> {
        match self {
            MaterialBinding::None => Vec::new(),
            MaterialBinding::Single(name) => vec![name.as_str()],
            MaterialBinding::PerFace { materials, .. } => {
                materials.iter().map(String::as_str).collect()
            }
        }
    }
}

/// A triangle mesh in shared-vertex form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Mesh name as written after the `Mesh` keyword
    pub name: String,

    /// Vertex positions
    pub positions: Vec<DVec3>,

    /// Triangle faces indexing into `positions`
    pub faces: Vec<[u32; 3]>,

    /// Optional normals with their own face list
    pub normals: Option<MeshNormals>,

    /// Optional texture coordinates (one per position)
    pub uvs: Option<Vec<DVec2>>,

    /// Optional vertex colors, RGB
    pub colors: Option<Vec<DVec3>>,

    /// Material binding
    pub material: MaterialBinding,
}

impl Mesh {
    /// Create an empty mesh with a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a mesh from positions and faces.
    pub fn from_triangles(
        name: impl Into<String>,
        positions: Vec<DVec3>,
        faces: Vec<[u32; 3]>,
    ) -> Self {
        Self {
            name: name.into(),
            positions,
            faces,
            ..Default::default()
        }
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Check if the mesh has UV coordinates.
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Check if the mesh has vertex colors.
    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Flattened face indices, three per triangle.
    pub fn face_vertex_indices(&self) -> Vec<u32> {
        self.faces.iter().flatten().copied().collect()
    }

    /// Check the shared-vertex invariants.
    ///
    /// Every face must index a valid position, every normal face a valid
    /// normal, and a per-face material list must have one in-range entry
    /// per face.
    pub fn validate(&self) -> TopologyResult<()> {
        self.validate_topology()?;
        self.check_material_indices()
    }

    /// [`Mesh::validate`] without the material index range check.
    ///
    /// Used where out-of-range indices are handled by a
    /// [`crate::subsets::MaterialIndexPolicy`] instead.
    pub fn validate_topology(&self) -> TopologyResult<()> {
        check_faces(&self.name, "position", &self.faces, self.positions.len())?;

        if let Some(normals) = &self.normals {
            check_faces(&self.name, "normal", &normals.faces, normals.normals.len())?;
        }

        if let MaterialBinding::PerFace { indices, .. } = &self.material {
            if indices.len() != self.faces.len() {
                return Err(TopologyError::MaterialIndexCount {
                    mesh: self.name.clone(),
                    indices: indices.len(),
                    faces: self.faces.len(),
                });
            }
        }

        Ok(())
    }

    /// Verify every per-face material index names an entry of the list.
    pub fn check_material_indices(&self) -> TopologyResult<()> {
        let MaterialBinding::PerFace { indices, materials } = &self.material else {
            return Ok(());
        };
        match indices
            .iter()
            .enumerate()
            .find(|(_, &index)| index as usize >= materials.len())
        {
            Some((face, &index)) => Err(TopologyError::MaterialIndexOutOfRange {
                mesh: self.name.clone(),
                face,
                index,
                count: materials.len(),
            }),
            None => Ok(()),
        }
    }
}

/// Verify every index of every face is below `count`.
pub(crate) fn check_faces(
    mesh: &str,
    stream: &'static str,
    faces: &[[u32; 3]],
    count: usize,
) -> TopologyResult<()> {
    for (face, corners) in faces.iter().enumerate() {
        if let Some(&index) = corners.iter().find(|&&i| i as usize >= count) {
            return Err(TopologyError::IndexOutOfRange {
                mesh: mesh.to_string(),
                stream,
                face,
                index,
                count,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        Mesh::from_triangles(
            "Tri",
            vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = triangle();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.has_normals());
        assert!(!mesh.has_uvs());
        assert_eq!(mesh.face_vertex_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn test_validate_accepts_valid_mesh() {
        let mut mesh = triangle();
        mesh.normals = Some(MeshNormals {
            normals: vec![DVec3::Z],
            faces: vec![[0, 0, 0]],
        });
        mesh.material = MaterialBinding::PerFace {
            indices: vec![1],
            materials: vec!["a".into(), "b".into()],
        };

        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_face_index() {
        let mut mesh = triangle();
        mesh.faces.push([0, 1, 7]);

        let err = mesh.validate().unwrap_err();
        assert!(matches!(
            err,
            TopologyError::IndexOutOfRange { face: 1, index: 7, count: 3, .. }
        ));
    }

    #[test]
    fn test_validate_rejects_bad_normal_face() {
        let mut mesh = triangle();
        mesh.normals = Some(MeshNormals {
            normals: vec![DVec3::Z],
            faces: vec![[0, 1, 0]],
        });

        let err = mesh.validate().unwrap_err();
        assert!(matches!(err, TopologyError::IndexOutOfRange { stream: "normal", .. }));
    }

    #[test]
    fn test_validate_rejects_material_count_mismatch() {
        let mut mesh = triangle();
        mesh.material = MaterialBinding::PerFace {
            indices: vec![0, 0],
            materials: vec!["a".into()],
        };

        assert!(matches!(
            mesh.validate(),
            Err(TopologyError::MaterialIndexCount { indices: 2, faces: 1, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_material_index() {
        let mut mesh = triangle();
        mesh.faces = vec![[0, 1, 2]; 2];
        mesh.material = MaterialBinding::PerFace {
            indices: vec![0, 5],
            materials: vec!["a".into(), "b".into()],
        };

        assert_eq!(
            mesh.validate(),
            Err(TopologyError::MaterialIndexOutOfRange {
                mesh: "Tri".to_string(),
                face: 1,
                index: 5,
                count: 2,
            })
        );
        assert!(mesh.validate_topology().is_ok());
    }

    #[test]
    fn test_material_names() {
        assert!(MaterialBinding::None.material_names().is_empty());
        assert_eq!(MaterialBinding::Single("m".into()).material_names(), vec!["m"]);
    }
}
