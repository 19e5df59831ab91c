//! Generic scenes stored as pretty JSON (`.scene.json`).

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::GenericScene;
use super::{SceneSink, SceneSource};

/// Extension of JSON scene files.
pub const SCENE_JSON_EXTENSION: &str = ".scene.json";

#[derive(Error, Debug)]
pub enum SceneFileError {
    #[error("failed to access scene file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scene file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A scene sink and source backed by one JSON file.
#[derive(Clone, Debug)]
pub struct JsonSceneFile {
    path: PathBuf,
}

impl JsonSceneFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SceneSink for JsonSceneFile {
    type Error = SceneFileError;

    fn write_scene(&mut self, scene: &GenericScene) -> Result<(), Self::Error> {
        let json = serde_json::to_string_pretty(scene).map_err(|source| SceneFileError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|source| SceneFileError::Io {
            path: self.path.clone(),
            source,
        })?;
        log::info!("Scene written to {}", self.path.display());
        Ok(())
    }
}

impl SceneSource for JsonSceneFile {
    type Error = SceneFileError;

    fn read_scene(&mut self) -> Result<GenericScene, Self::Error> {
        let content = fs::read_to_string(&self.path).map_err(|source| SceneFileError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SceneFileError::Json {
            path: self.path.clone(),
            source,
        })
    }
}
