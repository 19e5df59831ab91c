//! Generic scene description types.
//!
//! These mirror the subset of a preview-surface scene description that the
//! legacy format can express: transform nodes, polygon meshes with primvars
//! and face subsets, preview materials and skeleton animation samples.

use serde::{Deserialize, Serialize};
use xconv_math::{DQuat, DVec2, DVec3};

/// How a primvar's values map onto the mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Interpolation {
    /// One value per point
    #[default]
    Vertex,
    /// One value per face corner
    FaceVarying,
}

/// A per-point or per-corner attribute.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Primvar<T> {
    pub interpolation: Interpolation,
    pub values: Vec<T>,
}

impl<T> Primvar<T> {
    /// One value per point.
    pub fn vertex(values: Vec<T>) -> Self {
        Self {
            interpolation: Interpolation::Vertex,
            values,
        }
    }

    /// One value per face corner.
    pub fn face_varying(values: Vec<T>) -> Self {
        Self {
            interpolation: Interpolation::FaceVarying,
            values,
        }
    }

    pub fn is_face_varying(&self) -> bool {
        self.interpolation == Interpolation::FaceVarying
    }
}

fn default_opacity() -> f64 {
    1.0
}

/// A preview-surface material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenericMaterial {
    /// Material name
    pub name: String,

    /// Diffuse color (RGB)
    pub diffuse_color: DVec3,

    /// Opacity, the legacy face color alpha
    #[serde(default = "default_opacity")]
    pub opacity: f64,

    /// Texture file connected to the diffuse input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffuse_texture: Option<String>,

    /// Emissive color (RGB)
    pub emissive_color: DVec3,

    /// Roughness (0-1)
    pub roughness: f64,

    /// Specular color in a custom input; editors usually drop it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_specular_color: Option<DVec3>,
}

impl Default for GenericMaterial {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: DVec3::splat(0.5),
            opacity: 1.0,
            diffuse_texture: None,
            emissive_color: DVec3::ZERO,
            roughness: 1.0,
            custom_specular_color: None,
        }
    }
}

/// Faces of a mesh bound to one material.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeomSubset {
    /// Subset name
    pub name: String,

    /// Bound material name
    pub material: String,

    /// Face indices
    pub indices: Vec<u32>,
}

/// A transform node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericXform {
    /// Node name
    pub name: String,

    /// Local transform as four row-major rows, translation in the last row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<[[f64; 4]; 4]>,

    /// Child nodes
    #[serde(default)]
    pub children: Vec<GenericNode>,
}

impl GenericXform {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Child transform nodes.
    pub fn xforms(&self) -> impl Iterator<Item = &GenericXform> {
        self.children.iter().filter_map(|child| match child {
            GenericNode::Xform(xform) => Some(xform),
            GenericNode::Mesh(_) => None,
        })
    }

    /// Child meshes.
    pub fn meshes(&self) -> impl Iterator<Item = &GenericMesh> {
        self.children.iter().filter_map(|child| match child {
            GenericNode::Mesh(mesh) => Some(mesh),
            GenericNode::Xform(_) => None,
        })
    }
}

/// A polygon mesh.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericMesh {
    /// Node name
    pub name: String,

    /// Point positions
    pub points: Vec<DVec3>,

    /// Number of corners of each face
    pub face_vertex_counts: Vec<u32>,

    /// Point index of every face corner
    pub face_vertex_indices: Vec<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Primvar<DVec3>>,

    /// Texture coordinates, V pointing up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub st: Option<Primvar<DVec2>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_color: Option<Primvar<DVec3>>,

    /// Material bound to the whole mesh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_binding: Option<String>,

    /// Per-face material subsets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsets: Vec<GeomSubset>,
}

impl GenericMesh {
    /// Number of face corners.
    pub fn corner_count(&self) -> usize {
        self.face_vertex_indices.len()
    }
}

/// A scene graph node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GenericNode {
    Xform(GenericXform),
    Mesh(GenericMesh),
}

impl GenericNode {
    pub fn name(&self) -> &str {
        match self {
            GenericNode::Xform(xform) => &xform.name,
            GenericNode::Mesh(mesh) => &mesh.name,
        }
    }
}

/// Values of every joint at one time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSample<T> {
    pub time: u32,
    pub values: Vec<T>,
}

/// Skeleton animation with dense per-time joint samples.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericSkeleton {
    /// Skeleton name
    pub name: String,

    /// Joint names; sample values follow this order
    pub joints: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rotations: Vec<TimeSample<DQuat>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scales: Vec<TimeSample<DVec3>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub translations: Vec<TimeSample<DVec3>>,

    /// Play once instead of looping
    #[serde(default)]
    pub play_once: bool,
}

/// A complete generic scene.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericScene {
    /// Materials
    #[serde(default)]
    pub materials: Vec<GenericMaterial>,

    /// Top-level nodes
    #[serde(default)]
    pub roots: Vec<GenericNode>,

    /// Animated skeletons
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skeletons: Vec<GenericSkeleton>,

    #[serde(default)]
    pub start_time_code: f64,

    #[serde(default)]
    pub end_time_code: f64,
}

impl GenericScene {
    /// Look up a material by name.
    pub fn material(&self, name: &str) -> Option<&GenericMaterial> {
        self.materials.iter().find(|m| m.name == name)
    }

    /// Number of mesh nodes in the scene.
    pub fn mesh_count(&self) -> usize {
        fn count(node: &GenericNode) -> usize {
            match node {
                GenericNode::Mesh(_) => 1,
                GenericNode::Xform(xform) => xform.children.iter().map(count).sum(),
            }
        }
        self.roots.iter().map(count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_json_shape() {
        let mut xform = GenericXform::new("Frame_World");
        xform.children.push(GenericNode::Mesh(GenericMesh {
            name: "World".to_string(),
            st: Some(Primvar::face_varying(vec![DVec2::new(0.0, 1.0)])),
            ..Default::default()
        }));
        let node = GenericNode::Xform(xform);

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "Xform");
        assert_eq!(value["children"][0]["type"], "Mesh");
        assert_eq!(value["children"][0]["st"]["interpolation"], "faceVarying");
        assert!(value.get("transform").is_none());
    }

    #[test]
    fn test_material_defaults_on_read() {
        let json = r#"{
            "name": "mat",
            "diffuse_color": [1.0, 0.0, 0.0],
            "emissive_color": [0.0, 0.0, 0.0],
            "roughness": 0.5
        }"#;
        let material: GenericMaterial = serde_json::from_str(json).unwrap();

        assert_eq!(material.opacity, 1.0);
        assert_eq!(material.diffuse_texture, None);
        assert_eq!(material.custom_specular_color, None);
    }

    #[test]
    fn test_scene_counts() {
        let mut body = GenericXform::new("Frame_Body");
        body.children.push(GenericNode::Mesh(GenericMesh::default()));
        let mut world = GenericXform::new("Frame_World");
        world.children.push(GenericNode::Mesh(GenericMesh::default()));
        world.children.push(GenericNode::Xform(body));

        let scene = GenericScene {
            roots: vec![GenericNode::Xform(world.clone())],
            ..Default::default()
        };

        assert_eq!(scene.mesh_count(), 2);
        assert_eq!(world.xforms().count(), 1);
        assert_eq!(world.meshes().count(), 1);
        assert_eq!(scene.roots[0].name(), "Frame_World");
    }
}
