//! Legacy document to generic scene.

use thiserror::Error;
use xconv_math::DVec2;

use super::types::{
    GenericMaterial, GenericMesh, GenericNode, GenericScene, GenericSkeleton, GenericXform, GeomSubset,
    Primvar, TimeSample,
};
use crate::animation::AnimationSet;
use crate::mesh::{Mesh, TopologyError};
use crate::scene::{Frame, Material, SceneDocument};
use crate::subsets::{resolve_binding, MaterialIndexPolicy, ResolvedBinding, SubsetError};
use crate::timeline::{ChannelSamples, Timeline};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    #[error(transparent)]
    Subset(#[from] SubsetError),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Faces left unbound because their material index has no material.
#[derive(Clone, Debug, PartialEq)]
pub struct DroppedBinding {
    pub mesh: String,
    pub index: u32,
    pub faces: usize,
}

/// An exported scene plus what permissive mode dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneExport {
    pub scene: GenericScene,
    pub dropped: Vec<DroppedBinding>,
}

/// Flip the V coordinate between the legacy (down) and generic (up) conventions.
pub(crate) fn flip_v(uv: DVec2) -> DVec2 {
    DVec2::new(uv.x, 1.0 - uv.y)
}

/// Convert a parsed document into a generic scene.
pub fn export_document(doc: &SceneDocument, policy: MaterialIndexPolicy) -> ExportResult<SceneExport> {
    let mut exporter = Exporter {
        policy,
        dropped: Vec::new(),
    };

    let materials = doc.materials.iter().map(export_material).collect();
    let root = exporter.frame(&doc.root)?;

    let mut scene = GenericScene {
        materials,
        roots: vec![GenericNode::Xform(root)],
        ..Default::default()
    };

    for set in &doc.animation_sets {
        let (skeleton, end_time) = export_animation_set(set);
        scene.end_time_code = scene.end_time_code.max(f64::from(end_time));
        scene.skeletons.push(skeleton);
    }

    log::info!(
        "Exported {} materials, {} meshes, {} skeletons",
        scene.materials.len(),
        scene.mesh_count(),
        scene.skeletons.len()
    );

    Ok(SceneExport {
        scene,
        dropped: exporter.dropped,
    })
}

/// Material as a preview surface; specular travels in the custom input.
pub fn export_material(material: &Material) -> GenericMaterial {
    let c = material.face_color;
    GenericMaterial {
        name: material.name.clone(),
        diffuse_color: c.truncate(),
        opacity: c.w,
        diffuse_texture: material.texture_filename.clone(),
        emissive_color: material.emissive_color,
        roughness: material.roughness(),
        custom_specular_color: Some(material.specular_color),
    }
}

struct Exporter {
    policy: MaterialIndexPolicy,
    dropped: Vec<DroppedBinding>,
}

impl Exporter {
    fn frame(&mut self, frame: &Frame) -> ExportResult<GenericXform> {
        let mut xform = GenericXform::new(frame.name.clone());
        xform.transform = frame.transform.as_ref().map(|t| t.rows());

        for mesh in &frame.meshes {
            xform.children.push(GenericNode::Mesh(self.mesh(mesh)?));
        }
        for child in &frame.children {
            xform.children.push(GenericNode::Xform(self.frame(child)?));
        }
        Ok(xform)
    }

    fn mesh(&mut self, mesh: &Mesh) -> ExportResult<GenericMesh> {
        mesh.validate_topology()?;

        let mut out = GenericMesh {
            name: mesh.name.clone(),
            points: mesh.positions.clone(),
            face_vertex_counts: vec![3; mesh.faces.len()],
            face_vertex_indices: mesh.face_vertex_indices(),
            ..Default::default()
        };

        if let Some(normals) = &mesh.normals {
            if normals.faces == mesh.faces && normals.normals.len() == mesh.positions.len() {
                out.normals = Some(Primvar::vertex(normals.normals.clone()));
            } else if normals.faces.len() == mesh.faces.len() {
                // Independent normal topology, expand through the normal faces
                let values = normals
                    .faces
                    .iter()
                    .flatten()
                    .map(|&i| normals.normals[i as usize])
                    .collect();
                out.normals = Some(Primvar::face_varying(values));
            } else {
                return Err(TopologyError::StreamLength {
                    mesh: mesh.name.clone(),
                    stream: "normal face",
                    declared: mesh.faces.len(),
                    actual: normals.faces.len(),
                }
                .into());
            }
        }

        if let Some(uvs) = &mesh.uvs {
            out.st = Some(Primvar::vertex(uvs.iter().copied().map(flip_v).collect()));
        }
        if let Some(colors) = &mesh.colors {
            out.display_color = Some(Primvar::vertex(colors.clone()));
        }

        let resolution = resolve_binding(&mesh.name, &mesh.material, self.policy)?;
        match resolution.binding {
            ResolvedBinding::Unbound => log::debug!("Mesh {} has no materials", mesh.name),
            ResolvedBinding::Whole(material) => out.material_binding = Some(material),
            ResolvedBinding::Subsets(subsets) => {
                out.subsets = subsets
                    .into_iter()
                    .map(|s| GeomSubset {
                        name: s.name,
                        material: s.material,
                        indices: s.faces,
                    })
                    .collect();
            }
        }
        self.dropped.extend(resolution.dropped.into_iter().map(|d| DroppedBinding {
            mesh: mesh.name.clone(),
            index: d.index,
            faces: d.faces.len(),
        }));

        Ok(out)
    }
}

fn samples<T: Clone>(channel: &ChannelSamples<T>) -> Vec<TimeSample<T>> {
    channel
        .times
        .iter()
        .zip(&channel.values)
        .map(|(&time, values)| TimeSample {
            time,
            values: values.clone(),
        })
        .collect()
}

/// One skeleton per set, sampled densely. Returns the set's end time too.
fn export_animation_set(set: &AnimationSet) -> (GenericSkeleton, u32) {
    let timeline = Timeline::build(set);
    let skeleton = GenericSkeleton {
        name: set.name.clone(),
        joints: timeline.joints.clone(),
        rotations: samples(&timeline.rotations),
        scales: samples(&timeline.scales),
        translations: samples(&timeline.translations),
        play_once: set.clips.iter().any(|clip| clip.play_once()),
    };
    (skeleton, timeline.end_time)
}
