//! Legacy `.x` text serializer.
//!
//! Output follows the layout the legacy game tooling expects byte for byte:
//! frames are never indented relative to their parent, only the contents
//! of a block are; floats use six decimals; the last record of a vertex,
//! normal or uv block ends in `;;`; per-face material indices wrap every
//! 30 entries.
//!
//! Frame naming and nesting come from the hierarchy descriptor rather than
//! the document, since documents imported from generic scenes may carry
//! renamed frames.

use std::fmt::{self, Write};

use thiserror::Error;
use xconv_math::{format_fixed, DMat4Ext};

use crate::animation::{AnimationClip, AnimationSet};
use crate::hierarchy::HierarchyNode;
use crate::mesh::{MaterialBinding, Mesh, TopologyError};
use crate::scene::{DocumentError, Frame, FrameTransform, Material, SceneDocument};

/// Per-face material indices written per line.
pub const MATERIAL_INDICES_PER_LINE: usize = 30;

/// Errors that can occur while rendering a document.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("hierarchy frame {name} ({nickname}) has no matching frame in the scene")]
    UnmatchedFrame { name: String, nickname: String },

    #[error("animation clip {clip} of set {set} animates more than one bone")]
    MixedBones { set: String, clip: String },

    #[error("animation clip {clip} of set {set} names no bone")]
    MissingBone { set: String, clip: String },

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("formatting failed: {0}")]
    Fmt(#[from] fmt::Error),
}

/// Result type for write operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Renders documents as legacy text.
#[derive(Clone, Debug)]
pub struct XFileWriter {
    world_root_frame: String,
}

impl Default for XFileWriter {
    fn default() -> Self {
        Self {
            world_root_frame: "Frame_World".to_string(),
        }
    }
}

impl XFileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame whose transform is always written as identity.
    pub fn with_world_root(mut self, name: impl Into<String>) -> Self {
        self.world_root_frame = name.into();
        self
    }

    /// Render a whole document.
    ///
    /// The document is validated first and the text is built in memory, so
    /// callers never see partial output.
    pub fn write(&self, doc: &SceneDocument, hierarchy: &HierarchyNode) -> WriteResult<String> {
        doc.validate()?;

        let mut out = String::new();
        out.push_str("xof 0303txt 0032\n\nHeader {\n\t1; 0; 1;\n}\n\n");

        for material in &doc.materials {
            write_material(&mut out, material)?;
        }

        let root = match_frame(std::slice::from_ref(&doc.root), hierarchy)?;
        self.write_frame(&mut out, root, hierarchy)?;

        for set in &doc.animation_sets {
            write_animation_set(&mut out, set)?;
        }

        log::info!(
            "Wrote {} materials, {} frames, {} animation sets ({} bytes)",
            doc.material_count(),
            hierarchy.node_count(),
            doc.animation_sets.len(),
            out.len()
        );
        Ok(out)
    }

    fn write_frame(&self, out: &mut String, frame: &Frame, node: &HierarchyNode) -> WriteResult<()> {
        writeln!(out, "Frame {} {{", node.name)?;

        if node.name == self.world_root_frame {
            if frame.transform.as_ref().map_or(false, |t| !t.matrix.is_near_identity(1e-9)) {
                log::info!("Frame {}: world root transform written as identity", node.name);
            }
            write_transform(out, &FrameTransform::identity())?;
        } else if let Some(transform) = &frame.transform {
            write_transform(out, transform)?;
        }

        for mesh in &frame.meshes {
            write_mesh(out, mesh)?;
        }

        for child in &node.children {
            let child_frame = match_frame(&frame.children, child)?;
            self.write_frame(out, child_frame, child)?;
        }

        if frame.children.len() > node.children.len() {
            log::warn!(
                "Frame {}: {} child frames are not in the hierarchy and were not written",
                node.name,
                frame.children.len() - node.children.len()
            );
        }

        out.push_str("}\n\n");
        Ok(())
    }
}

/// Render with default settings.
pub fn write_str(doc: &SceneDocument, hierarchy: &HierarchyNode) -> WriteResult<String> {
    XFileWriter::new().write(doc, hierarchy)
}

fn match_frame<'a>(frames: &'a [Frame], node: &HierarchyNode) -> WriteResult<&'a Frame> {
    frames
        .iter()
        .find(|f| node.matches(&f.name))
        .ok_or_else(|| WriteError::UnmatchedFrame {
            name: node.name.clone(),
            nickname: node.nickname.clone(),
        })
}

fn format_alpha(alpha: f64) -> String {
    if alpha == 1.0 {
        "1.0".to_string()
    } else {
        format_fixed(alpha)
    }
}

fn write_material(out: &mut String, material: &Material) -> fmt::Result {
    let f = format_fixed;
    let c = material.face_color;
    let s = material.specular_color;
    let e = material.emissive_color;

    writeln!(out, "Material {} {{", material.name)?;
    writeln!(out, "\t{};{};{};{};;", f(c.x), f(c.y), f(c.z), format_alpha(c.w))?;
    writeln!(out, "\t{};", f(material.power))?;
    writeln!(out, "\t{};{};{};;", f(s.x), f(s.y), f(s.z))?;
    writeln!(out, "\t{};{};{};;", f(e.x), f(e.y), f(e.z))?;
    if let Some(file) = &material.texture_filename {
        writeln!(out, "\tTextureFilename {{\n\t\t\"{}\";\n\t}}", file)?;
    }
    out.push_str("}\n\n");
    Ok(())
}

fn write_transform(out: &mut String, transform: &FrameTransform) -> fmt::Result {
    out.push_str("\tFrameTransformMatrix {\n");
    for (i, row) in transform.rows().iter().enumerate() {
        let end = if i == 3 { ";;" } else { "," };
        let values: Vec<String> = row.iter().map(|&v| format_fixed(v)).collect();
        writeln!(out, "\t\t{}{}", values.join(","), end)?;
    }
    out.push_str("\t}\n\n");
    Ok(())
}

/// Write `items` one per line, the last with `last` instead of `middle`.
fn write_records<T>(
    out: &mut String,
    items: &[T],
    middle: &str,
    last: &str,
    record: impl Fn(usize, &T) -> String,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        let end = if i + 1 == items.len() { last } else { middle };
        writeln!(out, "{}{}", record(i, item), end)?;
    }
    Ok(())
}

fn write_mesh(out: &mut String, mesh: &Mesh) -> WriteResult<()> {
    let f = format_fixed;

    if mesh.positions.is_empty() || mesh.faces.is_empty() {
        return Err(TopologyError::Empty {
            mesh: mesh.name.clone(),
            what: if mesh.positions.is_empty() { "vertices" } else { "faces" },
        }
        .into());
    }

    writeln!(out, "Mesh {} {{", mesh.name)?;

    // The last vertex switches to comma separators
    writeln!(out, "\t{};", mesh.positions.len())?;
    let (last, rest) = mesh.positions.split_last().ok_or(fmt::Error)?;
    for v in rest {
        writeln!(out, "\t{};{};{};,", f(v.x), f(v.y), f(v.z))?;
    }
    writeln!(out, "\t{},{},{};;\n", f(last.x), f(last.y), f(last.z))?;

    writeln!(out, "\t{};", mesh.faces.len())?;
    write_records(out, &mesh.faces, ";,", ";;", |_, [a, b, c]| format!("\t3;{},{},{}", a, b, c))?;
    out.push('\n');

    write_material_list(out, mesh)?;

    if let Some(normals) = mesh.normals.as_ref().filter(|n| !n.normals.is_empty()) {
        out.push_str("\tMeshNormals {\n");
        writeln!(out, "\t\t{};", normals.normals.len())?;
        write_records(out, &normals.normals, ";,", ";;", |_, n| {
            format!("\t\t{},{},{}", f(n.x), f(n.y), f(n.z))
        })?;
        out.push('\n');
        writeln!(out, "\t\t{};", normals.faces.len())?;
        write_records(out, &normals.faces, ";,", ";;", |_, [a, b, c]| {
            format!("\t\t3;{},{},{}", a, b, c)
        })?;
        out.push_str("\t}\n\n");
    }

    if let Some(colors) = mesh.colors.as_ref().filter(|c| !c.is_empty()) {
        out.push_str("\tMeshVertexColors {\n");
        writeln!(out, "\t\t{};", colors.len())?;
        write_records(out, colors, ";,", ";;", |i, c| {
            format!("\t\t{};{},{},{},1.0", i, f(c.x), f(c.y), f(c.z))
        })?;
        out.push_str("\t}\n\n");
    }

    if let Some(uvs) = mesh.uvs.as_ref().filter(|uv| !uv.is_empty()) {
        out.push_str("\tMeshTextureCoords {\n");
        writeln!(out, "\t\t{};", uvs.len())?;
        write_records(out, uvs, ";,", ";;", |_, uv| format!("\t\t{};{}", f(uv.x), f(uv.y)))?;
        out.push_str("\t}\n\n");
    }

    out.push_str("}\n");
    Ok(())
}

fn write_material_list(out: &mut String, mesh: &Mesh) -> fmt::Result {
    let names = mesh.material.material_names();
    match names.len() {
        0 => return Ok(()),
        1 => {
            out.push_str("\tMeshMaterialList {\n\t\t1;1;0;;\n");
            writeln!(out, "\t\t{{{}}}", names[0])?;
        }
        _ => {
            let MaterialBinding::PerFace { indices, .. } = &mesh.material else {
                return Ok(());
            };
            out.push_str("\tMeshMaterialList {\n");
            writeln!(out, "\t\t{};", names.len())?;
            writeln!(out, "\t\t{};", mesh.faces.len())?;

            let lines: Vec<String> = indices
                .chunks(MATERIAL_INDICES_PER_LINE)
                .map(|chunk| {
                    let joined: Vec<String> = chunk.iter().map(u32::to_string).collect();
                    joined.join(",")
                })
                .collect();
            writeln!(out, "\t\t{};;", lines.join(",\n\t\t"))?;

            for name in &names {
                writeln!(out, "\t\t{{{}}}", name)?;
            }
        }
    }
    out.push_str("\t}\n\n");
    Ok(())
}

fn write_animation_set(out: &mut String, set: &AnimationSet) -> WriteResult<()> {
    writeln!(out, "AnimationSet {} {{", set.name)?;
    for clip in &set.clips {
        write_clip(out, set, clip)?;
    }
    out.push_str("}\n\n");
    Ok(())
}

fn write_clip(out: &mut String, set: &AnimationSet, clip: &AnimationClip) -> WriteResult<()> {
    let bone = match (&clip.bone, clip.animations.first()) {
        (Some(bone), _) => bone.as_str(),
        (None, Some(first)) => first.bone.as_str(),
        (None, None) => {
            return Err(WriteError::MissingBone {
                set: set.name.clone(),
                clip: clip.name.clone(),
            })
        }
    };
    if clip.animations.iter().any(|a| a.bone != bone) {
        return Err(WriteError::MixedBones {
            set: set.name.clone(),
            clip: clip.name.clone(),
        });
    }

    if clip.name.is_empty() {
        out.push_str("Animation {\n");
    } else {
        writeln!(out, "Animation {} {{", clip.name)?;
    }
    writeln!(out, "\t{{{}}}", bone)?;

    if let Some(options) = clip.options {
        let open_closed = if options.play_once { 0 } else { 1 };
        writeln!(
            out,
            "\tAnimationOptions {{\n\t\t{};\n\t\t{};\n\t}}",
            open_closed, options.position_quality
        )?;
    }

    // Consecutive records of one kind share an AnimationKey block
    let mut start = 0;
    while start < clip.animations.len() {
        let kind = clip.animations[start].kind;
        let end = clip.animations[start..]
            .iter()
            .position(|a| a.kind != kind)
            .map_or(clip.animations.len(), |offset| start + offset);

        let keys: Vec<_> = clip.animations[start..end]
            .iter()
            .flat_map(|a| a.keyframes.iter())
            .collect();

        out.push_str("\tAnimationKey {\n");
        writeln!(out, "\t\t{};", kind.code())?;
        writeln!(out, "\t\t{};", keys.len())?;
        write_records(out, &keys, ";;,", ";;;", |_, key| {
            let values: Vec<String> = key.values.iter().map(|&v| format_fixed(v)).collect();
            format!("\t\t{};{};{}", key.frame, key.values.len(), values.join(","))
        })?;
        out.push_str("\t}\n");

        start = end;
    }

    out.push_str("}\n");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Animation, ChannelKind, Keyframe};
    use crate::mesh::MeshNormals;
    use crate::xfile::parser::parse_str;
    use xconv_math::{DMat4, DVec2, DVec3, DVec4};

    fn triangle_mesh(name: &str) -> Mesh {
        Mesh::from_triangles(name, vec![DVec3::ZERO, DVec3::X, DVec3::Y], vec![[0, 1, 2]])
    }

    fn one_triangle_doc() -> (SceneDocument, HierarchyNode) {
        let mut mesh = triangle_mesh("World");
        mesh.material = MaterialBinding::Single("mat0".to_string());
        let mut root = Frame::new("Frame_World");
        root.meshes.push(mesh);
        let mut doc = SceneDocument::new(root);
        doc.add_material(Material::new("mat0", DVec4::new(1.0, 0.5, 0.25, 1.0)));
        (doc, HierarchyNode::new("Frame_World"))
    }

    #[test]
    fn test_one_triangle_text() {
        let (doc, hierarchy) = one_triangle_doc();
        let text = write_str(&doc, &hierarchy).unwrap();

        assert!(text.starts_with("xof 0303txt 0032\n\nHeader {\n\t1; 0; 1;\n}\n\nMaterial mat0 {\n"));
        assert!(text.contains("\t1.000000;0.500000;0.250000;1.0;;\n\t1.000000;\n"));
        assert!(text.contains(
            "Mesh World {\n\t3;\n\t0.000000;0.000000;0.000000;,\n\t1.000000;0.000000;0.000000;,\n\t0.000000,1.000000,0.000000;;\n\n\t1;\n\t3;0,1,2;;\n\n"
        ));
        assert!(text.contains("\tMeshMaterialList {\n\t\t1;1;0;;\n\t\t{mat0}\n\t}\n\n}\n}\n\n"));
        assert!(!text.contains("MeshNormals"));

        let parsed = parse_str(&text).unwrap();
        assert_eq!(parsed.document.material_count(), 1);
        assert_eq!(parsed.document.root.meshes[0].faces, vec![[0, 1, 2]]);
        assert_eq!(parsed.document.root.meshes[0].face_vertex_indices().len(), 3);
    }

    #[test]
    fn test_world_root_transform_reset() {
        let (mut doc, hierarchy) = one_triangle_doc();
        doc.root.transform = Some(FrameTransform::from_matrix(DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0))));

        let text = write_str(&doc, &hierarchy).unwrap();
        assert!(text.contains(
            "\tFrameTransformMatrix {\n\t\t1.000000,0.000000,0.000000,0.000000,\n\t\t0.000000,1.000000,0.000000,0.000000,\n\t\t0.000000,0.000000,1.000000,0.000000,\n\t\t0.000000,0.000000,0.000000,1.000000;;\n\t}\n\n"
        ));
    }

    #[test]
    fn test_translation_is_last_row() {
        let mut root = Frame::new("Frame_Root");
        root.transform = Some(FrameTransform::from_matrix(DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0))));
        let doc = SceneDocument::new(root);

        let text = write_str(&doc, &HierarchyNode::new("Frame_Root")).unwrap();
        assert!(text.contains("\t\t1.000000,2.000000,3.000000,1.000000;;\n"));
    }

    #[test]
    fn test_frames_flat_and_named_by_hierarchy() {
        let mut child = Frame::new("Body");
        child.meshes.push(triangle_mesh("Body"));
        let mut root = Frame::new("World");
        root.children.push(child);
        let doc = SceneDocument::new(root);

        let mut hierarchy = HierarchyNode::new("Frame_World");
        hierarchy.children.push(HierarchyNode::new("Frame_Body"));

        let text = write_str(&doc, &hierarchy).unwrap();
        assert!(text.contains("Frame Frame_World {\n\tFrameTransformMatrix {"));
        assert!(text.contains("\t}\n\nFrame Frame_Body {\nMesh Body {\n"));
        assert!(text.ends_with("}\n}\n\n}\n\n"));
    }

    #[test]
    fn test_unmatched_hierarchy_node() {
        let (doc, mut hierarchy) = one_triangle_doc();
        hierarchy.children.push(HierarchyNode::new("Frame_Ghost"));

        let err = write_str(&doc, &hierarchy).unwrap_err();
        assert!(matches!(err, WriteError::UnmatchedFrame { ref name, .. } if name == "Frame_Ghost"));
    }

    #[test]
    fn test_material_index_wrapping() {
        let faces: Vec<[u32; 3]> = (0..31).map(|_| [0, 1, 2]).collect();
        let mut mesh = Mesh::from_triangles("M", vec![DVec3::ZERO, DVec3::X, DVec3::Y], faces);
        let mut indices = vec![0u32; 31];
        indices[30] = 1;
        mesh.material = MaterialBinding::PerFace {
            indices,
            materials: vec!["a".into(), "b".into()],
        };
        let mut root = Frame::new("Frame_World");
        root.meshes.push(mesh);
        let mut doc = SceneDocument::new(root);
        doc.add_material(Material::new("a", DVec4::ONE));
        doc.add_material(Material::new("b", DVec4::ONE));

        let text = write_str(&doc, &HierarchyNode::new("Frame_World")).unwrap();
        let first_line = format!("\t\t{},\n", vec!["0"; 30].join(","));
        assert!(text.contains(&format!("\t\t2;\n\t\t31;\n{}\t\t1;;\n\t\t{{a}}\n\t\t{{b}}\n\t}}\n\n", first_line)));

        let parsed = parse_str(&text).unwrap();
        let MaterialBinding::PerFace { indices, .. } = &parsed.document.root.meshes[0].material else {
            panic!("expected per-face binding");
        };
        assert_eq!(indices.len(), 31);
        assert_eq!(indices[30], 1);
    }

    #[test]
    fn test_streams_layout() {
        let mut mesh = triangle_mesh("M");
        mesh.normals = Some(MeshNormals {
            normals: vec![DVec3::Z],
            faces: vec![[0, 0, 0]],
        });
        mesh.colors = Some(vec![DVec3::ONE, DVec3::X, DVec3::Y]);
        mesh.uvs = Some(vec![DVec2::ZERO, DVec2::X, DVec2::Y]);
        let mut root = Frame::new("F");
        root.meshes.push(mesh);
        let doc = SceneDocument::new(root);

        let text = write_str(&doc, &HierarchyNode::new("F")).unwrap();
        assert!(text.contains("\tMeshNormals {\n\t\t1;\n\t\t0.000000,0.000000,1.000000;;\n\n\t\t1;\n\t\t3;0,0,0;;\n\t}\n\n"));
        assert!(text.contains("\t\t1;1.000000,0.000000,0.000000,1.0;,\n\t\t2;0.000000,1.000000,0.000000,1.0;;\n"));
        assert!(text.contains("\t\t0.000000;1.000000;;\n\t}\n\n}\n"));
        // colors come before uvs
        assert!(text.find("MeshVertexColors").unwrap() < text.find("MeshTextureCoords").unwrap());
    }

    #[test]
    fn test_empty_mesh_rejected() {
        let mut root = Frame::new("F");
        root.meshes.push(Mesh::new("Empty"));
        let doc = SceneDocument::new(root);

        let err = write_str(&doc, &HierarchyNode::new("F")).unwrap_err();
        assert!(matches!(err, WriteError::Topology(TopologyError::Empty { .. })));
    }

    #[test]
    fn test_dangling_material_index_rejected() {
        let (mut doc, hierarchy) = one_triangle_doc();
        doc.add_material(Material::new("mat1", DVec4::ONE));
        let mesh = &mut doc.root.meshes[0];
        mesh.faces = vec![[0, 1, 2], [0, 2, 1]];
        mesh.material = MaterialBinding::PerFace {
            indices: vec![0, 5],
            materials: vec!["mat0".to_string(), "mat1".to_string()],
        };

        let err = write_str(&doc, &hierarchy).unwrap_err();
        assert!(matches!(
            err,
            WriteError::Document(DocumentError::Topology(
                TopologyError::MaterialIndexOutOfRange { index: 5, .. }
            ))
        ));
    }

    #[test]
    fn test_animation_layout() {
        let (mut doc, hierarchy) = one_triangle_doc();
        let mut clip = AnimationClip::new("Anim1");
        for (kind, frame, values) in [
            (ChannelKind::Rotation, 0, vec![0.0, 0.0, 0.0, 1.0]),
            (ChannelKind::Rotation, 10, vec![0.0, 1.0, 0.0, 0.0]),
            (ChannelKind::Position, 0, vec![1.0, 2.0, 3.0]),
        ] {
            clip.animations.push(Animation {
                kind,
                bone: "Frame_World".to_string(),
                keyframes: vec![Keyframe::new(frame, values)],
            });
        }
        let mut set = AnimationSet::new("Walk");
        set.clips.push(clip);
        doc.animation_sets.push(set);

        let text = write_str(&doc, &hierarchy).unwrap();
        assert!(text.ends_with(
            "AnimationSet Walk {\nAnimation Anim1 {\n\t{Frame_World}\n\tAnimationKey {\n\t\t0;\n\t\t2;\n\t\t0;4;0.000000,0.000000,0.000000,1.000000;;,\n\t\t10;4;0.000000,1.000000,0.000000,0.000000;;;\n\t}\n\tAnimationKey {\n\t\t2;\n\t\t1;\n\t\t0;3;1.000000,2.000000,3.000000;;;\n\t}\n}\n}\n\n"
        ));
    }

    #[test]
    fn test_clip_without_keys_is_kept() {
        let (doc, hierarchy) = one_triangle_doc();
        let mut text = write_str(&doc, &hierarchy).unwrap();
        text.push_str(
            "AnimationSet Idle {\nAnimation Anim-Hold {\n\t{Frame_World}\n\tAnimationOptions {\n\t\t0;\n\t\t0;\n\t}\n}\n}\n\n",
        );

        let parsed = parse_str(&text).unwrap();
        let clip = &parsed.document.animation_sets[0].clips[0];
        assert_eq!(clip.bone.as_deref(), Some("Frame_World"));
        assert!(clip.animations.is_empty());
        assert_eq!(write_str(&parsed.document, &parsed.hierarchy).unwrap(), text);

        let mut doc = parsed.document;
        doc.animation_sets[0].clips[0].bone = None;
        assert!(matches!(
            write_str(&doc, &parsed.hierarchy),
            Err(WriteError::MissingBone { .. })
        ));
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let mut mesh = triangle_mesh("World");
        mesh.positions[1] = DVec3::new(1.5, -0.25, 0.125);
        mesh.normals = Some(MeshNormals {
            normals: vec![DVec3::Z, DVec3::NEG_Z],
            faces: vec![[0, 1, 0]],
        });
        mesh.uvs = Some(vec![DVec2::ZERO, DVec2::new(0.5, 0.75), DVec2::ONE]);
        mesh.material = MaterialBinding::Single("tex".to_string());

        let mut child = Frame::new("Frame_Arm")
            .with_transform(FrameTransform::from_matrix(DMat4::from_scale(DVec3::splat(2.0))));
        child.meshes.push(triangle_mesh("Arm"));
        let mut root = Frame::new("Frame_World");
        root.meshes.push(mesh);
        root.children.push(child);

        let mut doc = SceneDocument::new(root);
        let mut material = Material::new("tex", DVec4::new(1.0, 1.0, 1.0, 0.5));
        material.texture_filename = Some("arm.bmp".to_string());
        material.power = 8.0;
        doc.add_material(material);

        let mut clip = AnimationClip::new("Anim-Arm");
        clip.options = Some(crate::animation::AnimationOptions {
            play_once: true,
            position_quality: 1,
        });
        clip.animations.push(Animation {
            kind: ChannelKind::Scale,
            bone: "Frame_Arm".to_string(),
            keyframes: vec![Keyframe::new(4, vec![1.0, 2.0, 1.0])],
        });
        let mut set = AnimationSet::new("Wave");
        set.clips.push(clip);
        doc.animation_sets.push(set);

        let mut hierarchy = HierarchyNode::new("Frame_World");
        hierarchy.children.push(HierarchyNode::new("Frame_Arm"));

        let first = write_str(&doc, &hierarchy).unwrap();
        let parsed = parse_str(&first).unwrap();
        assert_eq!(parsed.hierarchy, hierarchy);

        let second = write_str(&parsed.document, &parsed.hierarchy).unwrap();
        assert_eq!(first, second);
    }
}
