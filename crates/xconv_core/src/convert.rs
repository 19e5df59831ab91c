//! Conversion pipeline between legacy files and generic scenes.
//!
//! Both directions read and validate everything in memory before the first
//! output byte is written. Sidecar files live next to the legacy document:
//! `<stem>_frames.json` (required on the way back) and
//! `<stem>_speculars.json` (optional).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::generic::{
    export_document, import_scene, ExportError, ImportError, JsonSceneFile, SceneSink, SceneSource,
    SCENE_JSON_EXTENSION,
};
use crate::hierarchy::{document_stem, HierarchyNode, SidecarError, SidecarPaths};
use crate::options::ConvertOptions;
use crate::speculars::SpecularTable;
use crate::xfile::{decode, encode, EncodingError, ParseError, ParsedDocument, WriteError, XFileParser, XFileWriter};

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort a conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error("scene sink failed: {0}")]
    Sink(#[source] BoxedError),

    #[error("scene source failed: {0}")]
    Source(#[source] BoxedError),

    #[error("unsupported file type: {0} (expected .x or .scene.json)")]
    UnsupportedExtension(PathBuf),
}

/// Result type for conversions.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Something a conversion worked around.
#[derive(Clone, Debug, PartialEq)]
pub enum ConversionWarning {
    /// The specular sidecar was missing or unreadable
    StaleSpeculars { path: PathBuf, reason: String },

    /// Faces left out of every subset (permissive mode)
    DroppedMaterialIndex { mesh: String, index: u32, faces: usize },
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionWarning::StaleSpeculars { path, reason } => {
                write!(f, "specular colors not restored from {}: {}", path.display(), reason)
            }
            ConversionWarning::DroppedMaterialIndex { mesh, index, faces } => {
                write!(f, "mesh {}: {} faces use missing material index {}", mesh, faces, index)
            }
        }
    }
}

/// Outcome of a successful conversion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversionReport {
    /// Main output, when the conversion wrote a file itself
    pub output: Option<PathBuf>,

    /// Sidecar files written
    pub sidecars: Vec<PathBuf>,

    pub warnings: Vec<ConversionWarning>,
}

impl ConversionReport {
    fn warn(&mut self, warning: ConversionWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Read and parse a legacy file.
pub fn read_x_file(path: &Path, options: &ConvertOptions) -> ConvertResult<ParsedDocument> {
    let bytes = fs::read(path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode(&bytes);
    XFileParser::new(&text)
        .with_frame_prefix(options.frame_prefix.clone())
        .with_policy(options.material_index_policy)
        .parse()
        .map_err(|source| ConvertError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Legacy file to generic scene, plus the hierarchy and specular sidecars.
pub fn convert_x_to_scene<S: SceneSink>(
    input: &Path,
    sink: &mut S,
    options: &ConvertOptions,
) -> ConvertResult<ConversionReport> {
    log::info!("Converting {}", input.display());
    let parsed = read_x_file(input, options)?;
    let export = export_document(&parsed.document, options.material_index_policy)?;

    let mut report = ConversionReport::default();
    for dropped in export.dropped {
        report.warn(ConversionWarning::DroppedMaterialIndex {
            mesh: dropped.mesh,
            index: dropped.index,
            faces: dropped.faces,
        });
    }

    sink.write_scene(&export.scene)
        .map_err(|e| ConvertError::Sink(Box::new(e)))?;

    let paths = SidecarPaths::for_document(input);
    parsed.hierarchy.save(&paths.frames)?;
    SpecularTable::from_materials(&parsed.document.materials).save(&paths.speculars)?;
    report.sidecars = vec![paths.frames, paths.speculars];

    Ok(report)
}

/// Generic scene to legacy file.
///
/// The hierarchy sidecar of `output` must exist; without it nothing is
/// read or written.
pub fn convert_scene_to_x<S: SceneSource>(
    source: &mut S,
    output: &Path,
    options: &ConvertOptions,
) -> ConvertResult<ConversionReport> {
    let paths = SidecarPaths::for_document(output);
    let hierarchy = HierarchyNode::load(&paths.frames)?;
    let mut report = ConversionReport::default();

    let scene = source
        .read_scene()
        .map_err(|e| ConvertError::Source(Box::new(e)))?;

    let speculars = match SpecularTable::load(&paths.speculars) {
        Ok(table) => Some(table),
        Err(e) => {
            report.warn(ConversionWarning::StaleSpeculars {
                path: paths.speculars.clone(),
                reason: e.to_string(),
            });
            None
        }
    };

    let document = import_scene(&scene, &hierarchy, speculars.as_ref(), options)?;
    let text = XFileWriter::new()
        .with_world_root(options.world_root_frame.clone())
        .write(&document, &hierarchy)?;
    let bytes = encode(&text)?;

    fs::write(output, bytes).map_err(|source| ConvertError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    log::info!("Legacy file written to {}", output.display());

    report.output = Some(output.to_path_buf());
    Ok(report)
}

/// Output path for an input file: `.x` and `.scene.json` swap.
pub fn output_path(input: &Path) -> ConvertResult<PathBuf> {
    let name = input
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ConvertError::UnsupportedExtension(input.to_path_buf()))?;

    let output = if name.ends_with(SCENE_JSON_EXTENSION) {
        format!("{}.x", document_stem(name))
    } else if name.ends_with(".x") {
        format!("{}{}", document_stem(name), SCENE_JSON_EXTENSION)
    } else {
        return Err(ConvertError::UnsupportedExtension(input.to_path_buf()));
    };
    Ok(input.with_file_name(output))
}

/// Convert a file in the direction its extension implies, using
/// [`JsonSceneFile`] for the generic side.
pub fn convert_path(input: &Path, options: &ConvertOptions) -> ConvertResult<ConversionReport> {
    let output = output_path(input)?;
    let is_scene = input
        .file_name()
        .and_then(|s| s.to_str())
        .map_or(false, |name| name.ends_with(SCENE_JSON_EXTENSION));

    if is_scene {
        let mut source = JsonSceneFile::new(input);
        convert_scene_to_x(&mut source, &output, options)
    } else {
        let mut sink = JsonSceneFile::new(output);
        let mut report = convert_x_to_scene(input, &mut sink, options)?;
        report.output = Some(sink.path().to_path_buf());
        Ok(report)
    }
}
