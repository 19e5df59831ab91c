//! Specular color sidecar (`<basename>_speculars.json`).
//!
//! The generic material model has no slot that survives an editor round trip
//! for the legacy specular color, so it is kept in a flat name -> RGB table.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use xconv_math::DVec3;

use crate::hierarchy::{SidecarError, SidecarResult};
use crate::scene::Material;

/// Material name to specular color.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecularTable(BTreeMap<String, [f64; 3]>);

impl SpecularTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the specular color of every material.
    pub fn from_materials(materials: &[Material]) -> Self {
        Self(
            materials
                .iter()
                .map(|m| (m.name.clone(), m.specular_color.to_array()))
                .collect(),
        )
    }

    /// Specular color recorded for a material.
    pub fn get(&self, material: &str) -> Option<DVec3> {
        self.0.get(material).map(|&c| DVec3::from_array(c))
    }

    /// Record a color.
    pub fn insert(&mut self, material: impl Into<String>, color: DVec3) {
        self.0.insert(material.into(), color.to_array());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Write the table as pretty JSON.
    pub fn save(&self, path: &Path) -> SidecarResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| SidecarError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| SidecarError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Specular colors saved to {}", path.display());
        Ok(())
    }

    /// Read a table.
    ///
    /// Callers treat every error here as a stale sidecar and fall back to
    /// the material's own specular color.
    pub fn load(path: &Path) -> SidecarResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SidecarError::Missing(path.to_path_buf()));
            }
            Err(source) => {
                return Err(SidecarError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| SidecarError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
