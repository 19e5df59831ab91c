//! Generic scene back to a legacy document.
//!
//! Scene editors rename and re-nest transform nodes, so the frame tree is
//! rebuilt from the hierarchy descriptor saved when the legacy file was
//! first exported. Specular colors come from the specular sidecar.

use thiserror::Error;
use xconv_math::{DVec2, DVec3, DVec4};

use super::export::flip_v;
use super::types::{GenericMaterial, GenericMesh, GenericNode, GenericScene, GenericSkeleton, GenericXform, Primvar, TimeSample};
use crate::animation::{Animation, AnimationClip, AnimationOptions, AnimationSet, ChannelKind, Keyframe};
use crate::hierarchy::HierarchyNode;
use crate::mesh::{MaterialBinding, Mesh, MeshNormals, TopologyError, TopologyResult};
use crate::options::ConvertOptions;
use crate::reconcile::{split_corners, CornerMesh, Samples};
use crate::scene::{Frame, FrameTransform, Material, SceneDocument};
use crate::speculars::SpecularTable;
use crate::subsets::flatten_subsets;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("hierarchy frame {name} ({nickname}) has no matching node in the scene")]
    UnmatchedFrame { name: String, nickname: String },

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

pub type ImportResult<T> = Result<T, ImportError>;

/// Rebuild a legacy document from a generic scene.
pub fn import_scene(
    scene: &GenericScene,
    hierarchy: &HierarchyNode,
    speculars: Option<&SpecularTable>,
    options: &ConvertOptions,
) -> ImportResult<SceneDocument> {
    let roots = unwrap_roots(scene, hierarchy, options);
    let root_xform = roots
        .iter()
        .copied()
        .find(|xform| hierarchy.matches(&xform.name))
        .ok_or_else(|| unmatched(hierarchy))?;

    let mut doc = SceneDocument::new(import_frame(root_xform, hierarchy)?);
    doc.materials = scene
        .materials
        .iter()
        .map(|m| import_material(m, speculars))
        .collect();
    doc.animation_sets = scene.skeletons.iter().map(bake_skeleton).collect();

    log::info!(
        "Imported {} materials, {} frames, {} meshes, {} animation sets",
        doc.material_count(),
        doc.frame_count(),
        doc.mesh_count(),
        doc.animation_sets.len()
    );
    Ok(doc)
}

fn unmatched(node: &HierarchyNode) -> ImportError {
    ImportError::UnmatchedFrame {
        name: node.name.clone(),
        nickname: node.nickname.clone(),
    }
}

/// Top-level transform nodes, skipping the wrapper root editors add.
fn unwrap_roots<'a>(
    scene: &'a GenericScene,
    hierarchy: &HierarchyNode,
    options: &ConvertOptions,
) -> Vec<&'a GenericXform> {
    let roots: Vec<&GenericXform> = scene
        .roots
        .iter()
        .filter_map(|node| match node {
            GenericNode::Xform(xform) => Some(xform),
            GenericNode::Mesh(mesh) => {
                log::warn!("Ignoring top-level mesh {}", mesh.name);
                None
            }
        })
        .collect();

    if let [wrapper] = roots[..] {
        if wrapper.name == options.wrapper_root_name && !hierarchy.matches(&wrapper.name) {
            log::debug!("Removing wrapper root {}", wrapper.name);
            return wrapper.xforms().collect();
        }
    }
    roots
}

/// Build a frame named after the descriptor node.
fn import_frame(xform: &GenericXform, node: &HierarchyNode) -> ImportResult<Frame> {
    let mut frame = Frame::new(node.name.clone());
    frame.transform = xform.transform.as_ref().map(FrameTransform::from_rows);

    for mesh in xform.meshes() {
        frame.meshes.push(import_mesh(mesh, &node.nickname)?);
    }

    for child in &node.children {
        let child_xform = xform
            .xforms()
            .find(|x| child.matches(&x.name))
            .ok_or_else(|| unmatched(child))?;
        frame.children.push(import_frame(child_xform, child)?);
    }

    let extra = xform.xforms().count().saturating_sub(node.children.len());
    if extra > 0 {
        log::warn!("Node {}: {} child transforms are not in the hierarchy and were skipped", xform.name, extra);
    }
    Ok(frame)
}

/// Legacy material for a preview surface.
///
/// Textured materials get a white face color. Specular comes from the
/// sidecar table, then the custom input, then black.
pub fn import_material(material: &GenericMaterial, speculars: Option<&SpecularTable>) -> Material {
    let face_color = if material.diffuse_texture.is_some() {
        DVec4::ONE
    } else {
        material.diffuse_color.extend(material.opacity)
    };
    let specular_color = speculars
        .and_then(|table| table.get(&material.name))
        .or(material.custom_specular_color)
        .unwrap_or(DVec3::ZERO);

    Material {
        name: material.name.clone(),
        face_color,
        power: Material::power_from_roughness(material.roughness),
        specular_color,
        emissive_color: material.emissive_color,
        texture_filename: material.diffuse_texture.clone(),
    }
}

fn check_len(mesh: &str, stream: &'static str, declared: usize, actual: usize) -> TopologyResult<()> {
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

fn samples<T>(primvar: &Primvar<T>) -> Samples<'_, T> {
    if primvar.is_face_varying() {
        Samples::Corner(&primvar.values)
    } else {
        Samples::Vertex(&primvar.values)
    }
}

/// Triangle faces of a generic mesh.
fn triangles(mesh: &GenericMesh) -> TopologyResult<Vec<[u32; 3]>> {
    if let Some((face, &corners)) = mesh.face_vertex_counts.iter().enumerate().find(|(_, &c)| c != 3) {
        return Err(TopologyError::NonTriangle {
            mesh: mesh.name.clone(),
            face,
            corners: corners as usize,
        });
    }
    check_len(&mesh.name, "face vertex index", mesh.face_vertex_counts.len() * 3, mesh.corner_count())?;

    Ok(mesh
        .face_vertex_indices
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}

/// Convert a mesh into shared-vertex form, named after its frame.
fn import_mesh(mesh: &GenericMesh, name: &str) -> TopologyResult<Mesh> {
    let faces = triangles(mesh)?;
    let uvs: Option<Primvar<DVec2>> = mesh.st.as_ref().map(|st| Primvar {
        interpolation: st.interpolation,
        values: st.values.iter().copied().map(flip_v).collect(),
    });

    let corner_attributes = uvs.as_ref().map_or(false, Primvar::is_face_varying)
        || mesh.display_color.as_ref().map_or(false, Primvar::is_face_varying);

    let mut out = if corner_attributes {
        let split = split_corners(&CornerMesh {
            name,
            positions: &mesh.points,
            faces: &faces,
            uvs: uvs.as_ref().map(samples),
            colors: mesh.display_color.as_ref().map(samples),
            normals: mesh.normals.as_ref().map(samples),
        })?;
        log::debug!(
            "Mesh {}: {} points split into {} vertices",
            name,
            mesh.points.len(),
            split.positions.len()
        );
        split.into_mesh(name)
    } else {
        shared_vertex_mesh(mesh, name, faces, uvs)?
    };

    out.material = import_binding(mesh, out.faces.len());
    out.validate()?;
    Ok(out)
}

/// Keep the points as they are; face-varying normals get their own faces.
fn shared_vertex_mesh(
    mesh: &GenericMesh,
    name: &str,
    faces: Vec<[u32; 3]>,
    uvs: Option<Primvar<DVec2>>,
) -> TopologyResult<Mesh> {
    let point_count = mesh.points.len();
    let mut out = Mesh::from_triangles(name, mesh.points.clone(), faces);

    if let Some(uvs) = uvs {
        check_len(name, "uv", point_count, uvs.values.len())?;
        out.uvs = Some(uvs.values);
    }
    if let Some(colors) = &mesh.display_color {
        check_len(name, "color", point_count, colors.values.len())?;
        out.colors = Some(colors.values.clone());
    }
    if let Some(normals) = &mesh.normals {
        let normal_faces = if normals.is_face_varying() {
            check_len(name, "normal", mesh.corner_count(), normals.values.len())?;
            (0..out.faces.len() as u32)
                .map(|f| [3 * f, 3 * f + 1, 3 * f + 2])
                .collect()
        } else {
            check_len(name, "normal", point_count, normals.values.len())?;
            out.faces.clone()
        };
        out.normals = Some(MeshNormals {
            normals: normals.values.clone(),
            faces: normal_faces,
        });
    }
    Ok(out)
}

fn import_binding(mesh: &GenericMesh, face_count: usize) -> MaterialBinding {
    if mesh.subsets.is_empty() {
        return match &mesh.material_binding {
            Some(material) => MaterialBinding::Single(material.clone()),
            None => MaterialBinding::None,
        };
    }

    let subsets: Vec<(String, Vec<u32>)> = mesh
        .subsets
        .iter()
        .map(|s| (s.material.clone(), s.indices.clone()))
        .collect();
    flatten_subsets(face_count, &subsets)
}

/// One legacy clip per joint, one key per sampled time.
fn bake_skeleton(skeleton: &GenericSkeleton) -> AnimationSet {
    let mut set = AnimationSet::new(skeleton.name.clone());

    for (joint_index, joint) in skeleton.joints.iter().enumerate() {
        let mut clip = AnimationClip::new(format!("Anim-{}", joint));
        clip.bone = Some(joint.clone());
        if skeleton.play_once {
            clip.options = Some(AnimationOptions {
                play_once: true,
                position_quality: 0,
            });
        }

        let mut bake = |kind: ChannelKind, samples: Vec<(u32, Vec<f64>)>| {
            for (frame, values) in samples {
                clip.animations.push(Animation {
                    kind,
                    bone: joint.clone(),
                    keyframes: vec![Keyframe::new(frame, values)],
                });
            }
        };
        bake(
            ChannelKind::Rotation,
            joint_samples(&skeleton.rotations, joint_index, |q| q.to_array().to_vec()),
        );
        bake(
            ChannelKind::Scale,
            joint_samples(&skeleton.scales, joint_index, |v| v.to_array().to_vec()),
        );
        bake(
            ChannelKind::Position,
            joint_samples(&skeleton.translations, joint_index, |v| v.to_array().to_vec()),
        );

        set.clips.push(clip);
    }

    set
}

fn joint_samples<T: Copy>(
    samples: &[TimeSample<T>],
    joint: usize,
    values: impl Fn(T) -> Vec<f64>,
) -> Vec<(u32, Vec<f64>)> {
    samples
        .iter()
        .filter_map(|sample| sample.values.get(joint).map(|&v| (sample.time, values(v))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generic::types::GeomSubset;
    use xconv_math::DQuat;

    fn hierarchy() -> HierarchyNode {
        let mut root = HierarchyNode::new("Frame_World");
        root.children.push(HierarchyNode::new("Frame_Body"));
        root
    }

    fn generic_triangle() -> GenericMesh {
        GenericMesh {
            name: "Body_001".to_string(),
            points: vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            face_vertex_counts: vec![3],
            face_vertex_indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    fn scene_with(mesh: GenericMesh) -> GenericScene {
        let mut body = GenericXform::new("Body");
        body.children.push(GenericNode::Mesh(mesh));
        let mut world = GenericXform::new("Frame_World");
        world.children.push(GenericNode::Xform(body));
        GenericScene {
            roots: vec![GenericNode::Xform(world)],
            ..Default::default()
        }
    }

    fn body_mesh(doc: &SceneDocument) -> &Mesh {
        &doc.root.find("Frame_Body").unwrap().meshes[0]
    }

    #[test]
    fn test_frames_follow_hierarchy() {
        let doc = import_scene(&scene_with(generic_triangle()), &hierarchy(), None, &ConvertOptions::default()).unwrap();

        assert_eq!(doc.root.name, "Frame_World");
        assert_eq!(doc.root.children[0].name, "Frame_Body");
        assert_eq!(body_mesh(&doc).name, "Body");
        assert_eq!(body_mesh(&doc).faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_wrapper_root_removed() {
        let inner = scene_with(generic_triangle());
        let mut wrapper = GenericXform::new("root");
        wrapper.children = inner.roots;
        let scene = GenericScene {
            roots: vec![GenericNode::Xform(wrapper)],
            ..Default::default()
        };

        let doc = import_scene(&scene, &hierarchy(), None, &ConvertOptions::default()).unwrap();
        assert_eq!(doc.frame_count(), 2);
    }

    #[test]
    fn test_unmatched_frame() {
        let mut tree = hierarchy();
        tree.children.push(HierarchyNode::new("Frame_Tail"));

        let err = import_scene(&scene_with(generic_triangle()), &tree, None, &ConvertOptions::default()).unwrap_err();
        assert_eq!(
            err,
            ImportError::UnmatchedFrame {
                name: "Frame_Tail".to_string(),
                nickname: "Tail".to_string()
            }
        );
    }

    #[test]
    fn test_material_sources() {
        let mut table = SpecularTable::new();
        table.insert("a", DVec3::splat(0.5));
        let a = GenericMaterial {
            name: "a".to_string(),
            diffuse_color: DVec3::new(1.0, 0.0, 0.0),
            roughness: 0.25,
            custom_specular_color: Some(DVec3::ONE),
            ..Default::default()
        };
        let b = GenericMaterial {
            name: "b".to_string(),
            diffuse_texture: Some("skin.bmp".to_string()),
            custom_specular_color: Some(DVec3::ONE),
            roughness: 0.0,
            ..Default::default()
        };

        let a = import_material(&a, Some(&table));
        assert_eq!(a.face_color, DVec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(a.power, 4.0);
        assert_eq!(a.specular_color, DVec3::splat(0.5));

        let b = import_material(&b, Some(&table));
        assert_eq!(b.face_color, DVec4::ONE);
        assert_eq!(b.specular_color, DVec3::ONE);
        assert!(b.power.is_finite());
        assert_eq!(b.texture_filename.as_deref(), Some("skin.bmp"));

        let c = import_material(&GenericMaterial::default(), None);
        assert_eq!(c.specular_color, DVec3::ZERO);
    }

    #[test]
    fn test_face_varying_uvs_split_vertices() {
        // Two triangles sharing an edge, with a uv seam along it
        let mut mesh = generic_triangle();
        mesh.points.push(DVec3::ONE);
        mesh.face_vertex_counts = vec![3, 3];
        mesh.face_vertex_indices = vec![0, 1, 2, 2, 1, 3];
        mesh.st = Some(Primvar::face_varying(vec![
            DVec2::new(0.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 0.0),
            DVec2::new(0.5, 0.5),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 0.0),
        ]));

        let doc = import_scene(&scene_with(mesh), &hierarchy(), None, &ConvertOptions::default()).unwrap();
        let mesh = body_mesh(&doc);

        // Point 1 keeps one uv, point 2 is split
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [3, 1, 4]]);
        let uvs = mesh.uvs.as_ref().unwrap();
        assert_eq!(uvs[0], DVec2::new(0.0, 0.0));
        assert_eq!(uvs[2], DVec2::new(0.0, 1.0));
    }

    #[test]
    fn test_face_varying_normals_keep_points() {
        let mut mesh = generic_triangle();
        mesh.normals = Some(Primvar::face_varying(vec![DVec3::Z, DVec3::X, DVec3::Y]));
        mesh.st = Some(Primvar::vertex(vec![DVec2::ZERO; 3]));

        let doc = import_scene(&scene_with(mesh), &hierarchy(), None, &ConvertOptions::default()).unwrap();
        let mesh = body_mesh(&doc);

        assert_eq!(mesh.vertex_count(), 3);
        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.faces, vec![[0, 1, 2]]);
        assert_eq!(normals.normals[1], DVec3::X);
        assert_eq!(mesh.uvs.as_ref().unwrap()[0], DVec2::new(0.0, 1.0));
    }

    #[test]
    fn test_non_triangle_rejected() {
        let mut mesh = generic_triangle();
        mesh.points.push(DVec3::ONE);
        mesh.face_vertex_counts = vec![4];
        mesh.face_vertex_indices = vec![0, 1, 3, 2];

        let err = import_scene(&scene_with(mesh), &hierarchy(), None, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Topology(TopologyError::NonTriangle { face: 0, corners: 4, .. })
        ));
    }

    #[test]
    fn test_vertex_color_length_checked() {
        let mut mesh = generic_triangle();
        mesh.display_color = Some(Primvar::vertex(vec![DVec3::ONE; 2]));

        let err = import_scene(&scene_with(mesh), &hierarchy(), None, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Topology(TopologyError::StreamLength { stream: "color", .. })
        ));
    }

    #[test]
    fn test_bindings() {
        let mut mesh = generic_triangle();
        mesh.material_binding = Some("skin".to_string());
        let doc = import_scene(&scene_with(mesh.clone()), &hierarchy(), None, &ConvertOptions::default()).unwrap();
        assert_eq!(body_mesh(&doc).material, MaterialBinding::Single("skin".to_string()));

        mesh.face_vertex_counts = vec![3, 3, 3];
        mesh.face_vertex_indices = vec![0, 1, 2, 0, 1, 2, 0, 1, 2];
        mesh.subsets = vec![GeomSubset {
            name: "MaterialSubset_1".to_string(),
            material: "cloth".to_string(),
            indices: vec![1],
        }];
        let doc = import_scene(&scene_with(mesh), &hierarchy(), None, &ConvertOptions::default()).unwrap();
        assert_eq!(
            body_mesh(&doc).material,
            MaterialBinding::PerFace {
                indices: vec![0, 0, 0],
                materials: vec!["cloth".to_string()],
            }
        );
    }

    #[test]
    fn test_skeleton_baked_per_joint() {
        let skeleton = GenericSkeleton {
            name: "Walk".to_string(),
            joints: vec!["Frame_A".to_string(), "Frame_B".to_string()],
            rotations: vec![TimeSample {
                time: 0,
                values: vec![DQuat::IDENTITY, DQuat::from_xyzw(0.0, 1.0, 0.0, 0.0)],
            }],
            translations: vec![
                TimeSample {
                    time: 0,
                    values: vec![DVec3::ZERO, DVec3::X],
                },
                TimeSample {
                    time: 5,
                    values: vec![DVec3::Y, DVec3::X],
                },
            ],
            play_once: true,
            ..Default::default()
        };

        let set = bake_skeleton(&skeleton);

        assert_eq!(set.name, "Walk");
        assert_eq!(set.clips.len(), 2);
        let b = &set.clips[1];
        assert_eq!(b.name, "Anim-Frame_B");
        assert!(b.play_once());
        assert_eq!(b.animations.len(), 3);
        assert!(b.animations.iter().all(|a| a.bone == "Frame_B"));
        assert_eq!(b.animations[0].keyframes[0].values, vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(b.animations[2].kind, ChannelKind::Position);
        assert_eq!(b.animations[2].keyframes[0].frame, 5);
    }
}
