//! xconv Core - Legacy `.x` scene interchange.
//!
//! This crate provides:
//!
//! - **Scene graph types**: `SceneDocument`, `Frame`, `Mesh`, `Material`, `AnimationSet`
//! - **Legacy format support**: `.x` text parsing and byte-exact writing
//! - **Generic scenes**: conversion to and from a scene-description value,
//!   with sidecar files for the data editors lose on the way
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use xconv_core::{convert_path, ConvertOptions};
//!
//! // model.x -> model.scene.json + model_frames.json + model_speculars.json
//! let report = convert_path(Path::new("model.x"), &ConvertOptions::default())?;
//! for warning in &report.warnings {
//!     println!("warning: {}", warning);
//! }
//! ```

pub mod animation;
pub mod convert;
pub mod generic;
pub mod hierarchy;
pub mod mesh;
pub mod options;
pub mod reconcile;
pub mod scene;
pub mod speculars;
pub mod subsets;
pub mod timeline;
pub mod xfile;

// Re-export commonly used types
pub use animation::{Animation, AnimationClip, AnimationSet, ChannelKind, Keyframe};
pub use convert::{
    convert_path, convert_scene_to_x, convert_x_to_scene, read_x_file, ConversionReport, ConversionWarning,
    ConvertError, ConvertResult,
};
pub use generic::{GenericScene, JsonSceneFile, SceneSink, SceneSource};
pub use hierarchy::HierarchyNode;
pub use mesh::{MaterialBinding, Mesh, MeshNormals};
pub use options::ConvertOptions;
pub use scene::{Frame, FrameTransform, Material, SceneDocument};
pub use subsets::MaterialIndexPolicy;
pub use timeline::Timeline;
pub use xfile::{parse_str, write_str, ParsedDocument};
