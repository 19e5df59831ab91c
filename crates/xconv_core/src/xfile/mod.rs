//! Legacy DirectX `.x` text format support.
//!
//! This module reads and writes the brace-delimited text variant
//! (`xof 0303txt 0032`) used by older game pipelines.
//!
//! ## Supported Features
//!
//! - Materials with face, specular and emissive colors and a diffuse texture
//! - Frame hierarchies with `FrameTransformMatrix`
//! - Triangle meshes with normals, texture coordinates, vertex colors and
//!   per-face material lists
//! - `AnimationSet` blocks with rotation, scale and position keys
//!
//! ## Not Supported
//!
//! - Binary and compressed variants (`bin`, `tzip`, `bzip`)
//! - Skinning blocks (`SkinWeights`, `XSkinMeshHeader`), which are skipped
//! - Non-triangle faces
//!
//! # Example
//!
//! ```ignore
//! use xconv_core::xfile::{parse_str, write_str};
//!
//! let parsed = parse_str(&text)?;
//! let again = write_str(&parsed.document, &parsed.hierarchy)?;
//! ```

mod anim;
pub mod codec;
pub mod lexer;
mod parser;
mod writer;

pub use codec::{decode, encode, EncodingError};
pub use lexer::{Line, LineSource};
pub use parser::*;
pub use writer::*;
