//! Generic scene description boundary.
//!
//! The legacy document is exchanged with scene-description toolkits through
//! a [`GenericScene`] value. Toolkit adapters implement [`SceneSink`] and
//! [`SceneSource`]; [`JsonSceneFile`] stores the value as JSON.

mod export;
mod import;
mod json;
mod types;

pub use export::{export_document, export_material, DroppedBinding, ExportError, ExportResult, SceneExport};
pub use import::{import_material, import_scene, ImportError, ImportResult};
pub use json::{JsonSceneFile, SceneFileError, SCENE_JSON_EXTENSION};
pub use types::*;

/// Consumes a generic scene, e.g. by building toolkit objects from it.
pub trait SceneSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn write_scene(&mut self, scene: &GenericScene) -> Result<(), Self::Error>;
}

/// Produces a generic scene, e.g. by reading a toolkit stage.
pub trait SceneSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn read_scene(&mut self) -> Result<GenericScene, Self::Error>;
}
