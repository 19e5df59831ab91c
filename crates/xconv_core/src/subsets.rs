//! Material subset resolution.
//!
//! The legacy grammar binds materials with a flat per-face index list. Scene
//! description toolkits instead bind one material per mesh or one per named
//! face subset. This module groups faces by material index.

use serde::Deserialize;
use thiserror::Error;

use crate::mesh::MaterialBinding;

/// Prefix of generated subset names; the material index is appended.
pub const SUBSET_PREFIX: &str = "MaterialSubset_";

/// What to do with a face whose material index has no material.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialIndexPolicy {
    /// Fail the conversion
    #[default]
    Strict,
    /// Leave the faces out of every subset and report it
    Permissive,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubsetError {
    #[error("mesh {mesh}: face {face} uses material index {index}, but only {material_count} materials are listed")]
    OutOfRangeMaterialIndex {
        mesh: String,
        face: usize,
        index: u32,
        material_count: usize,
    },
}

/// Faces bound to one material.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceSubset {
    /// Subset name (`MaterialSubset_<index>`)
    pub name: String,

    /// Index into the mesh's material list
    pub material_index: u32,

    /// Bound material name
    pub material: String,

    /// Face indices in ascending order
    pub faces: Vec<u32>,
}

/// Faces dropped in permissive mode.
#[derive(Clone, Debug, PartialEq)]
pub struct DroppedFaces {
    pub index: u32,
    pub faces: Vec<u32>,
}

/// Result of resolving a binding.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ResolvedBinding {
    /// No material
    #[default]
    Unbound,
    /// One material for the whole mesh
    Whole(String),
    /// Per-face subsets in order of first appearance
    Subsets(Vec<FaceSubset>),
}

/// Resolved binding plus anything dropped on the way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolution {
    pub binding: ResolvedBinding,
    pub dropped: Vec<DroppedFaces>,
}

/// Decide how a mesh binds its materials.
///
/// A single referenced material binds the whole mesh. Otherwise faces are
/// grouped by index; a subset exists only for indices some face uses.
pub fn resolve_binding(
    mesh: &str,
    binding: &MaterialBinding,
    policy: MaterialIndexPolicy,
) -> Result<Resolution, SubsetError> {
    let (indices, materials) = match binding {
        MaterialBinding::None => return Ok(Resolution::default()),
        MaterialBinding::Single(name) => {
            return Ok(Resolution {
                binding: ResolvedBinding::Whole(name.clone()),
                dropped: Vec::new(),
            })
        }
        MaterialBinding::PerFace { indices, materials } => (indices, materials),
    };

    if materials.len() == 1 {
        return Ok(Resolution {
            binding: ResolvedBinding::Whole(materials[0].clone()),
            dropped: Vec::new(),
        });
    }

    // (material index, faces) in first-appearance order
    let mut groups: Vec<(u32, Vec<u32>)> = Vec::new();
    for (face, &index) in indices.iter().enumerate() {
        match groups.iter_mut().find(|(i, _)| *i == index) {
            Some((_, faces)) => faces.push(face as u32),
            None => groups.push((index, vec![face as u32])),
        }
    }

    let mut subsets = Vec::with_capacity(groups.len());
    let mut dropped = Vec::new();
    for (index, faces) in groups {
        match materials.get(index as usize) {
            Some(material) => subsets.push(FaceSubset {
                name: format!("{}{}", SUBSET_PREFIX, index),
                material_index: index,
                material: material.clone(),
                faces,
            }),
            None => match policy {
                MaterialIndexPolicy::Strict => {
                    return Err(SubsetError::OutOfRangeMaterialIndex {
                        mesh: mesh.to_string(),
                        face: faces[0] as usize,
                        index,
                        material_count: materials.len(),
                    })
                }
                MaterialIndexPolicy::Permissive => {
                    log::warn!(
                        "Mesh {}: dropping {} faces with material index {} ({} materials listed)",
                        mesh,
                        faces.len(),
                        index,
                        materials.len()
                    );
                    dropped.push(DroppedFaces { index, faces });
                }
            },
        }
    }

    Ok(Resolution {
        binding: ResolvedBinding::Subsets(subsets),
        dropped,
    })
}

/// Flatten subsets back into a per-face index list.
///
/// Faces outside every subset get index 0. Subset order defines the
/// material list order.
pub fn flatten_subsets(face_count: usize, subsets: &[(String, Vec<u32>)]) -> MaterialBinding {
    let mut indices = vec![0u32; face_count];
    let mut materials = Vec::with_capacity(subsets.len());
    for (material_index, (material, faces)) in subsets.iter().enumerate() {
        for &face in faces {
            match indices.get_mut(face as usize) {
                Some(slot) => *slot = material_index as u32,
                None => log::warn!("Subset of {} lists face {} beyond {} faces", material, face, face_count),
            }
        }
        materials.push(material.clone());
    }
    MaterialBinding::PerFace { indices, materials }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn per_face(indices: Vec<u32>, count: usize) -> MaterialBinding {
        MaterialBinding::PerFace {
            indices,
            materials: (0..count).map(|i| format!("mat{}", i)).collect(),
        }
    }

    #[test]
    fn test_groups_referenced_indices_only() {
        let binding = per_face(vec![0, 0, 1, 1, 0], 3);
        let resolution = resolve_binding("M", &binding, MaterialIndexPolicy::Strict).unwrap();

        let ResolvedBinding::Subsets(subsets) = resolution.binding else {
            panic!("expected subsets");
        };
        assert_eq!(subsets.len(), 2);
        assert_eq!(subsets[0].name, "MaterialSubset_0");
        assert_eq!(subsets[0].material, "mat0");
        assert_eq!(subsets[0].faces, vec![0, 1, 4]);
        assert_eq!(subsets[1].material_index, 1);
        assert_eq!(subsets[1].faces, vec![2, 3]);
        assert!(resolution.dropped.is_empty());
    }

    #[test]
    fn test_single_material_binds_whole_mesh() {
        let binding = per_face(vec![0, 0, 0], 1);
        let resolution = resolve_binding("M", &binding, MaterialIndexPolicy::Strict).unwrap();
        assert_eq!(resolution.binding, ResolvedBinding::Whole("mat0".to_string()));

        let single = MaterialBinding::Single("only".to_string());
        let resolution = resolve_binding("M", &single, MaterialIndexPolicy::Strict).unwrap();
        assert_eq!(resolution.binding, ResolvedBinding::Whole("only".to_string()));

        let none = resolve_binding("M", &MaterialBinding::None, MaterialIndexPolicy::Strict).unwrap();
        assert_eq!(none.binding, ResolvedBinding::Unbound);
    }

    #[test]
    fn test_out_of_range_strict() {
        let binding = per_face(vec![0, 5, 1], 2);
        let err = resolve_binding("M", &binding, MaterialIndexPolicy::Strict).unwrap_err();

        assert_eq!(
            err,
            SubsetError::OutOfRangeMaterialIndex {
                mesh: "M".to_string(),
                face: 1,
                index: 5,
                material_count: 2,
            }
        );
    }

    #[test]
    fn test_out_of_range_permissive() {
        let binding = per_face(vec![0, 5, 1, 5], 2);
        let resolution = resolve_binding("M", &binding, MaterialIndexPolicy::Permissive).unwrap();

        let ResolvedBinding::Subsets(subsets) = &resolution.binding else {
            panic!("expected subsets");
        };
        assert_eq!(subsets.len(), 2);
        assert_eq!(
            resolution.dropped,
            vec![DroppedFaces {
                index: 5,
                faces: vec![1, 3]
            }]
        );
    }

    #[test]
    fn test_flatten_subsets() {
        let subsets = vec![
            ("red".to_string(), vec![2, 3]),
            ("blue".to_string(), vec![0]),
        ];
        let binding = flatten_subsets(5, &subsets);

        assert_eq!(
            binding,
            MaterialBinding::PerFace {
                indices: vec![1, 0, 0, 0, 0],
                materials: vec!["red".to_string(), "blue".to_string()],
            }
        );
    }
}
