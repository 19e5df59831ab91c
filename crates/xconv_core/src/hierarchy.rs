//! Frame hierarchy sidecar (`<basename>_frames.json`).
//!
//! The generic scene toolkit does not keep legacy frame names verbatim, so
//! the exact nesting and naming is saved next to the converted scene and
//! read back when writing legacy text again.
//!
//! ## File contract
//!
//! ```json
//! {
//!   "version": 1,
//!   "name": "Frame_World",
//!   "nickname": "World",
//!   "children": [
//!     { "name": "Frame_Body", "nickname": "Body" }
//!   ]
//! }
//! ```
//!
//! `version` is only present on the root and may be absent in files written
//! by older tools. `children` is omitted for leaves.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current sidecar format version.
pub const HIERARCHY_FORMAT_VERSION: u32 = 1;

/// Prefix stripped from frame names to form the display alias.
pub const DEFAULT_FRAME_PREFIX: &str = "Frame_";

/// Errors that can occur while reading or writing sidecar files.
#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("missing sidecar {0}; convert the source .x file first to create it")]
    Missing(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid sidecar {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("sidecar {path} has format version {found}, newest supported is {supported}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },
}

/// Result type for sidecar operations.
pub type SidecarResult<T> = Result<T, SidecarError>;

/// One node of the frame hierarchy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    /// Canonical legacy frame name
    pub name: String,

    /// Display alias (name without the frame prefix)
    pub nickname: String,

    /// Child frames in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// Create a node whose alias strips the default frame prefix.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_prefix(name, DEFAULT_FRAME_PREFIX)
    }

    /// Create a node whose alias strips `prefix`.
    pub fn with_prefix(name: impl Into<String>, prefix: &str) -> Self {
        let name = name.into();
        let nickname = name.strip_prefix(prefix).unwrap_or(&name).to_string();
        Self {
            name,
            nickname,
            children: Vec::new(),
        }
    }

    /// True when `candidate` is this node's name or alias.
    pub fn matches(&self, candidate: &str) -> bool {
        self.name == candidate || self.nickname == candidate
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::node_count).sum::<usize>()
    }

    /// Render as the sidecar JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let file = HierarchyFile {
            version: Some(HIERARCHY_FORMAT_VERSION),
            root: self.clone(),
        };
        serde_json::to_string_pretty(&file)
    }

    /// Write the sidecar file.
    pub fn save(&self, path: &Path) -> SidecarResult<()> {
        let json = self.to_json().map_err(|source| SidecarError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| SidecarError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Frame hierarchy saved to {}", path.display());
        Ok(())
    }

    /// Read a sidecar file. A missing file is [`SidecarError::Missing`].
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

        let file: HierarchyFile =
            serde_json::from_str(&content).map_err(|source| SidecarError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(found) = file.version {
            if found > HIERARCHY_FORMAT_VERSION {
                return Err(SidecarError::UnsupportedVersion {
                    path: path.to_path_buf(),
                    found,
                    supported: HIERARCHY_FORMAT_VERSION,
                });
            }
        }

        Ok(file.root)
    }
}

/// On-disk wrapper adding the version field to the root node.
#[derive(Serialize, Deserialize)]
struct HierarchyFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<u32>,

    #[serde(flatten)]
    root: HierarchyNode,
}

/// Locations of the two sidecars belonging to one converted document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidecarPaths {
    /// `<basename>_frames.json`
    pub frames: PathBuf,

    /// `<basename>_speculars.json`
    pub speculars: PathBuf,
}

impl SidecarPaths {
    /// Sidecar paths for a document path; the extension is dropped.
    pub fn for_document(path: &Path) -> Self {
        let stem = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(document_stem)
            .unwrap_or("unnamed")
            .to_string();
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self {
            frames: dir.join(format!("{}_frames.json", stem)),
            speculars: dir.join(format!("{}_speculars.json", stem)),
        }
    }
}

/// File name without the scene extension (`.x` or `.scene.json`).
pub fn document_stem(file_name: &str) -> &str {
    file_name
        .strip_suffix(".scene.json")
        .or_else(|| file_name.strip_suffix(".x"))
        .or_else(|| file_name.rsplit_once('.').map(|(stem, _)| stem))
        .unwrap_or(file_name)
}
