//! Legacy `.x` text grammar parser.
//!
//! The parser is an explicit state machine. Each state has one transition
//! function that consumes a logical line (plus any continuation lines the
//! production needs) and returns the next state and, optionally, an
//! [`Emit`] describing the scene-graph mutation to apply. Mutations are
//! applied by a separate document builder, so transitions never touch the
//! document under construction.
//!
//! # Supported Syntax
//!
//! - `Material name { r;g;b;a;; power; sr;sg;sb;; er;eg;eb;; [TextureFilename] }`
//! - `Frame name { FrameTransformMatrix, Mesh, Frame... }`
//! - `Mesh [name] { vertices; faces; MeshMaterialList; MeshNormals;
//!   MeshTextureCoords; MeshVertexColors }`
//! - `AnimationSet name { Animation [name] { {bone} AnimationOptions AnimationKey } }`
//!
//! Anything else that opens a brace (`Header`, `template`, `SkinWeights`,
//! ...) is skipped by brace depth.

use thiserror::Error;
use xconv_math::{DVec2, DVec3, DVec4};

use super::anim::parse_animation_set;
use super::lexer::{Line, LineSource};
use crate::animation::AnimationSet;
use crate::hierarchy::{HierarchyNode, DEFAULT_FRAME_PREFIX};
use crate::mesh::{MaterialBinding, Mesh, MeshNormals, TopologyError};
use crate::scene::{Frame, FrameTransform, Material, SceneDocument, TransformError};
use crate::subsets::MaterialIndexPolicy;

/// Errors that can occur while parsing legacy text.
///
/// Every variant names the block being read and a physical line number.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}: expected {expected} in {block} block, found `{found}`")]
    Unexpected {
        line: usize,
        block: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: invalid number `{text}` in {block} block")]
    InvalidNumber {
        line: usize,
        block: &'static str,
        text: String,
    },

    #[error("unexpected end of file inside {block} block opened at line {line}")]
    UnexpectedEof { line: usize, block: &'static str },

    #[error("line {line}: {block} block: {source}")]
    Topology {
        line: usize,
        block: &'static str,
        #[source]
        source: TopologyError,
    },

    #[error("line {line}: FrameTransformMatrix: {source}")]
    Transform {
        line: usize,
        #[source]
        source: TransformError,
    },

    #[error("line {line}: material {name} is defined more than once")]
    DuplicateMaterial { line: usize, name: String },

    #[error("no root Frame found")]
    NoRootFrame,

    #[error("line {line}: second root frame {name}; a document has exactly one root frame")]
    MultipleRootFrames { line: usize, name: String },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// A parsed document plus the frame hierarchy recorded while reading it.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedDocument {
    pub document: SceneDocument,
    pub hierarchy: HierarchyNode,
}

/// Parser states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Before the root frame: materials, header and templates
    Materials,
    /// Inside a frame body
    Header,
    VerticesCount,
    Vertices,
    FacesCount,
    Faces { remaining: usize },
    /// Inside a mesh, between sub-blocks
    Mesh,
    NormalsCount,
    Normals,
    NormalFacesCount,
    NormalFaces,
    UvsCount,
    Uvs,
    ColorsCount,
    Colors,
    /// After the root frame closed
    Trailer,
}

impl State {
    fn block(self) -> &'static str {
        match self {
            State::Materials | State::Trailer => "document",
            State::Header => "Frame",
            State::VerticesCount
            | State::Vertices
            | State::FacesCount
            | State::Faces { .. }
            | State::Mesh => "Mesh",
            State::NormalsCount | State::Normals | State::NormalFacesCount | State::NormalFaces => {
                "MeshNormals"
            }
            State::UvsCount | State::Uvs => "MeshTextureCoords",
            State::ColorsCount | State::Colors => "MeshVertexColors",
        }
    }
}

/// Mesh streams with a declared count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stream {
    Vertices,
    Faces,
    Normals,
    NormalFaces,
    Uvs,
    Colors,
}

impl Stream {
    fn name(self) -> &'static str {
        match self {
            Stream::Vertices => "vertex",
            Stream::Faces => "face",
            Stream::Normals => "normal",
            Stream::NormalFaces => "normal face",
            Stream::Uvs => "uv",
            Stream::Colors => "color",
        }
    }
}

/// A scene-graph mutation produced by a transition.
#[derive(Clone, Debug, PartialEq)]
enum Emit {
    Material(Material),
    OpenFrame(String),
    CloseFrame,
    Transform(FrameTransform),
    OpenMesh(Option<String>),
    CloseMesh,
    Declared(Stream, usize),
    Vertex(DVec3),
    Face(Vec<u32>),
    MaterialList {
        binding: MaterialBinding,
        inline: Vec<Material>,
    },
    Normal(DVec3),
    NormalFace(Vec<u32>),
    Uv(DVec2),
    Color(DVec3),
    AnimationSet(AnimationSet),
}

type Step = (State, Option<Emit>);

/// Legacy text parser.
pub struct XFileParser {
    source: LineSource,
    frame_prefix: String,
    policy: MaterialIndexPolicy,
    depth: usize,
}

impl XFileParser {
    /// Create a new parser from decoded file contents.
    pub fn new(content: &str) -> Self {
        Self {
            source: LineSource::new(content),
            frame_prefix: DEFAULT_FRAME_PREFIX.to_string(),
            policy: MaterialIndexPolicy::default(),
            depth: 0,
        }
    }

    /// Prefix stripped from frame names to form hierarchy aliases.
    pub fn with_frame_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.frame_prefix = prefix.into();
        self
    }

    /// How per-face material indices past the end of a mesh's material
    /// list are treated. `Strict` rejects the mesh; `Permissive` keeps the
    /// indices for the subset resolver to drop.
    pub fn with_policy(mut self, policy: MaterialIndexPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Parse the whole document.
    pub fn parse(mut self) -> ParseResult<ParsedDocument> {
        let mut builder = DocumentBuilder::new(self.frame_prefix.clone(), self.policy);
        let mut state = State::Materials;

        while let Some(line) = self.source.next_line() {
            let number = line.number;
            let (next, emit) = self.transition(state, line)?;
            if let Some(emit) = emit {
                builder.apply(emit, number)?;
            }
            state = next;
        }

        match state {
            State::Trailer => builder.finish(),
            State::Materials => Err(ParseError::NoRootFrame),
            other => Err(ParseError::UnexpectedEof {
                line: self.source.line_number(),
                block: other.block(),
            }),
        }
    }

    fn transition(&mut self, state: State, line: Line) -> ParseResult<Step> {
        match state {
            State::Materials => self.materials(line),
            State::Header => self.header(line),
            State::VerticesCount => self.count(state, line, Stream::Vertices),
            State::Vertices => self.vertices(line),
            State::FacesCount => self.count(state, line, Stream::Faces),
            State::Faces { remaining } => self.faces(line, remaining),
            State::Mesh => self.mesh(line),
            State::NormalsCount => self.count(state, line, Stream::Normals),
            State::Normals => self.normals(line),
            State::NormalFacesCount => self.count(state, line, Stream::NormalFaces),
            State::NormalFaces => self.normal_faces(line),
            State::UvsCount => self.count(state, line, Stream::Uvs),
            State::Uvs => self.uvs(line),
            State::ColorsCount => self.count(state, line, Stream::Colors),
            State::Colors => self.colors(line),
            State::Trailer => self.trailer(line),
        }
    }

    fn materials(&mut self, line: Line) -> ParseResult<Step> {
        let Some(header) = BlockHeader::parse(&line.text) else {
            log::debug!("Ignoring line {}: {}", line.number, line.text);
            return Ok((State::Materials, None));
        };

        match header.keyword {
            "Material" => {
                let material = self.material(header.name, &line)?;
                Ok((State::Materials, Some(Emit::Material(material))))
            }
            "Frame" => {
                self.depth = 1;
                Ok((State::Header, Some(Emit::OpenFrame(header.name.to_string()))))
            }
            "AnimationSet" => {
                let set = parse_animation_set(&mut self.source, &line, header.name)?;
                Ok((State::Materials, Some(Emit::AnimationSet(set))))
            }
            _ => {
                skip_block(&mut self.source, &line)?;
                Ok((State::Materials, None))
            }
        }
    }

    fn header(&mut self, line: Line) -> ParseResult<Step> {
        if line.text == "}" {
            self.depth -= 1;
            let next = if self.depth == 0 {
                State::Trailer
            } else {
                State::Header
            };
            return Ok((next, Some(Emit::CloseFrame)));
        }

        let Some(header) = BlockHeader::parse(&line.text) else {
            return Err(unexpected(&line, "Frame", "a block or `}`"));
        };

        match header.keyword {
            "Frame" => {
                self.depth += 1;
                Ok((State::Header, Some(Emit::OpenFrame(header.name.to_string()))))
            }
            "FrameTransformMatrix" => {
                let transform = self.transform_matrix(&line, header.body)?;
                Ok((State::Header, Some(Emit::Transform(transform))))
            }
            "Mesh" => {
                let name = (!header.name.is_empty()).then(|| header.name.to_string());
                Ok((State::VerticesCount, Some(Emit::OpenMesh(name))))
            }
            "Material" => {
                let material = self.material(header.name, &line)?;
                Ok((State::Header, Some(Emit::Material(material))))
            }
            "AnimationSet" => {
                let set = parse_animation_set(&mut self.source, &line, header.name)?;
                Ok((State::Header, Some(Emit::AnimationSet(set))))
            }
            _ => {
                skip_block(&mut self.source, &line)?;
                Ok((State::Header, None))
            }
        }
    }

    fn count(&mut self, state: State, line: Line, stream: Stream) -> ParseResult<Step> {
        let Some(n) = parse_count(&line.text) else {
            return Err(unexpected(&line, state.block(), "a count line like `12;`"));
        };

        let next = match stream {
            Stream::Vertices if n == 0 => State::FacesCount,
            Stream::Vertices => State::Vertices,
            Stream::Faces if n == 0 => State::Mesh,
            Stream::Faces => State::Faces { remaining: n },
            Stream::Normals if n == 0 => State::NormalFacesCount,
            Stream::Normals => State::Normals,
            Stream::NormalFaces => State::NormalFaces,
            Stream::Uvs => State::Uvs,
            Stream::Colors => State::Colors,
        };
        Ok((next, Some(Emit::Declared(stream, n))))
    }

    fn vertices(&mut self, line: Line) -> ParseResult<Step> {
        if line.text == "}" {
            return Ok((State::Mesh, None));
        }
        let [x, y, z] = parse_vector::<3>(&line, "Mesh")?;
        let next = if line.text.ends_with(";;") {
            State::FacesCount
        } else {
            State::Vertices
        };
        Ok((next, Some(Emit::Vertex(DVec3::new(x, y, z)))))
    }

    fn faces(&mut self, line: Line, remaining: usize) -> ParseResult<Step> {
        let face = parse_face(&line, "Mesh")?;
        let next = if remaining <= 1 {
            State::Mesh
        } else {
            State::Faces {
                remaining: remaining - 1,
            }
        };
        Ok((next, Some(Emit::Face(face))))
    }

    fn mesh(&mut self, line: Line) -> ParseResult<Step> {
        if line.text == "}" {
            return Ok((State::Header, Some(Emit::CloseMesh)));
        }

        let Some(header) = BlockHeader::parse(&line.text) else {
            return Err(unexpected(&line, "Mesh", "a mesh sub-block or `}`"));
        };

        match header.keyword {
            "MeshMaterialList" => {
                let (binding, inline) = self.material_list(&line)?;
                Ok((State::Mesh, Some(Emit::MaterialList { binding, inline })))
            }
            "MeshNormals" => Ok((State::NormalsCount, None)),
            "MeshTextureCoords" => Ok((State::UvsCount, None)),
            "MeshVertexColors" => Ok((State::ColorsCount, None)),
            _ => {
                skip_block(&mut self.source, &line)?;
                Ok((State::Mesh, None))
            }
        }
    }

    fn normals(&mut self, line: Line) -> ParseResult<Step> {
        if line.text == "}" {
            return Ok((State::Mesh, None));
        }
        let [x, y, z] = parse_vector::<3>(&line, "MeshNormals")?;
        let next = if line.text.ends_with(";;") {
            State::NormalFacesCount
        } else {
            State::Normals
        };
        Ok((next, Some(Emit::Normal(DVec3::new(x, y, z)))))
    }

    fn normal_faces(&mut self, line: Line) -> ParseResult<Step> {
        if line.text == "}" {
            return Ok((State::Mesh, None));
        }
        let face = parse_face(&line, "MeshNormals")?;
        Ok((State::NormalFaces, Some(Emit::NormalFace(face))))
    }

    fn uvs(&mut self, line: Line) -> ParseResult<Step> {
        if line.text == "}" {
            return Ok((State::Mesh, None));
        }
        let [u, v] = parse_vector::<2>(&line, "MeshTextureCoords")?;
        Ok((State::Uvs, Some(Emit::Uv(DVec2::new(u, v)))))
    }

    fn colors(&mut self, line: Line) -> ParseResult<Step> {
        if line.text == "}" {
            return Ok((State::Mesh, None));
        }
        // `index;r,g,b,a;,` - the index is positional and ignored
        let record = line.text.trim_end_matches([',', ';']);
        let Some((_, rgba)) = record.split_once(';') else {
            return Err(unexpected(&line, "MeshVertexColors", "`index;r,g,b,a;`"));
        };
        let values = parse_numbers(rgba, &line, "MeshVertexColors")?;
        if values.len() < 3 {
            return Err(unexpected(&line, "MeshVertexColors", "at least 3 color components"));
        }
        Ok((
            State::Colors,
            Some(Emit::Color(DVec3::new(values[0], values[1], values[2]))),
        ))
    }

    fn trailer(&mut self, line: Line) -> ParseResult<Step> {
        let Some(header) = BlockHeader::parse(&line.text) else {
            if line.text.starts_with('}') {
                return Err(unexpected(&line, "document", "end of file"));
            }
            log::debug!("Ignoring line {}: {}", line.number, line.text);
            return Ok((State::Trailer, None));
        };

        match header.keyword {
            "Frame" => Err(ParseError::MultipleRootFrames {
                line: line.number,
                name: header.name.to_string(),
            }),
            "AnimationSet" => {
                let set = parse_animation_set(&mut self.source, &line, header.name)?;
                Ok((State::Trailer, Some(Emit::AnimationSet(set))))
            }
            _ => {
                skip_block(&mut self.source, &line)?;
                Ok((State::Trailer, None))
            }
        }
    }

    /// Read the body of a `Material` block: four fixed records, then
    /// optional sub-blocks up to the closing brace.
    fn material(&mut self, name: &str, start: &Line) -> ParseResult<Material> {
        let face = self.fixed_record(start, 4)?;
        let power = self.fixed_record(start, 1)?;
        let specular = self.fixed_record(start, 3)?;
        let emissive = self.fixed_record(start, 3)?;

        let mut material = Material {
            name: name.to_string(),
            face_color: DVec4::new(face[0], face[1], face[2], face[3]),
            power: power[0],
            specular_color: DVec3::new(specular[0], specular[1], specular[2]),
            emissive_color: DVec3::new(emissive[0], emissive[1], emissive[2]),
            texture_filename: None,
        };

        loop {
            let line = expect_line(&mut self.source, start, "Material")?;
            if line.text == "}" {
                break;
            }
            match BlockHeader::parse(&line.text) {
                Some(header) if header.keyword.eq_ignore_ascii_case("TextureFilename") => {
                    let body = header.body.map(str::to_string);
                    material.texture_filename = Some(self.texture_filename(&line, body)?);
                }
                Some(_) => skip_block(&mut self.source, &line)?,
                None => return Err(unexpected(&line, "Material", "TextureFilename or `}`")),
            }
        }

        log::debug!("Material {}", material.name);
        Ok(material)
    }

    fn fixed_record(&mut self, start: &Line, count: usize) -> ParseResult<Vec<f64>> {
        let line = expect_line(&mut self.source, start, "Material")?;
        let mut values = parse_numbers(&line.text, &line, "Material")?;
        if values.len() < count {
            return Err(unexpected(&line, "Material", "a color or power record"));
        }
        values.truncate(count);
        Ok(values)
    }

    fn texture_filename(&mut self, start: &Line, body: Option<String>) -> ParseResult<String> {
        let text = match body {
            Some(body) => body,
            None => {
                let line = expect_line(&mut self.source, start, "TextureFilename")?;
                let close = expect_line(&mut self.source, start, "TextureFilename")?;
                if close.text != "}" {
                    return Err(unexpected(&close, "TextureFilename", "`}`"));
                }
                line.text
            }
        };

        let mut quoted = text.split('"');
        match (quoted.next(), quoted.next()) {
            (Some(_), Some(file)) => Ok(file.to_string()),
            _ => Err(unexpected(start, "TextureFilename", "a quoted file name")),
        }
    }

    /// Collect the 16 matrix values up to the doubled terminator.
    fn transform_matrix(&mut self, start: &Line, body: Option<&str>) -> ParseResult<FrameTransform> {
        let text = match body {
            Some(body) => body.trim_end_matches(';').trim().to_string(),
            None => {
                let mut parts = Vec::new();
                loop {
                    let line = expect_line(&mut self.source, start, "FrameTransformMatrix")?;
                    if let Some(last) = line.text.strip_suffix(";;") {
                        parts.push(last.trim().to_string());
                        break;
                    }
                    if line.text == "}" {
                        return Err(unexpected(&line, "FrameTransformMatrix", "16 matrix values"));
                    }
                    parts.push(line.text);
                }
                let close = expect_line(&mut self.source, start, "FrameTransformMatrix")?;
                if close.text != "}" {
                    return Err(unexpected(&close, "FrameTransformMatrix", "`}`"));
                }
                parts.join(" ")
            }
        };

        FrameTransform::parse(&text).map_err(|source| ParseError::Transform {
            line: start.number,
            source,
        })
    }

    /// Read a `MeshMaterialList` block.
    ///
    /// The count and index records can span any number of lines, so they
    /// are buffered up to the doubled terminator and split on `;`.
    fn material_list(&mut self, start: &Line) -> ParseResult<(MaterialBinding, Vec<Material>)> {
        const BLOCK: &str = "MeshMaterialList";

        let opens_reference = |text: &str| text.contains('{') || text.starts_with('}');

        // Counts and indices run to `;;`, or up to the first reference when
        // the terminator is missing
        let mut buffer = Vec::new();
        loop {
            if !buffer.is_empty() && self.source.peek().map_or(false, |l| opens_reference(&l.text)) {
                break;
            }
            let line = expect_line(&mut self.source, start, BLOCK)?;
            if opens_reference(&line.text) {
                return Err(unexpected(&line, BLOCK, "material and face counts ending in `;;`"));
            }
            let done = line.text.ends_with(";;");
            buffer.push(line.text);
            if done {
                break;
            }
        }

        let joined = buffer.join(" ");
        let joined = joined.trim_end().trim_end_matches(';');
        let mut fields = joined.split(';').map(str::trim);

        let material_count = self.list_count(fields.next(), start)?;
        let face_count = self.list_count(fields.next(), start)?;
        let rest: Vec<&str> = fields.collect();
        let indices = rest
            .join(" ")
            .replace(',', " ")
            .split_whitespace()
            .take(face_count)
            .map(|s| {
                s.parse::<u32>().map_err(|_| ParseError::InvalidNumber {
                    line: start.number,
                    block: BLOCK,
                    text: s.to_string(),
                })
            })
            .collect::<ParseResult<Vec<u32>>>()?;

        let mut names = Vec::with_capacity(material_count);
        let mut inline = Vec::new();
        while names.len() < material_count {
            let line = expect_line(&mut self.source, start, BLOCK)?;
            if let Some(header) = BlockHeader::parse(&line.text) {
                if header.keyword == "Material" {
                    let material = self.material(header.name, &line)?;
                    names.push(material.name.clone());
                    inline.push(material);
                    continue;
                }
                if header.keyword.is_empty() {
                    names.push(self.reference_name(line)?);
                    continue;
                }
            }
            return Err(unexpected(&line, BLOCK, "a `{material}` reference"));
        }

        loop {
            let line = expect_line(&mut self.source, start, BLOCK)?;
            if line.text == "}" {
                break;
            }
            log::debug!("Ignoring line {} in {}: {}", line.number, BLOCK, line.text);
        }

        let binding = match material_count {
            0 => MaterialBinding::None,
            1 => MaterialBinding::Single(names.remove(0)),
            _ => MaterialBinding::PerFace {
                indices,
                materials: names,
            },
        };
        Ok((binding, inline))
    }

    fn list_count(&self, field: Option<&str>, start: &Line) -> ParseResult<usize> {
        let text = field.unwrap_or("");
        text.parse::<usize>().map_err(|_| ParseError::InvalidNumber {
            line: start.number,
            block: "MeshMaterialList",
            text: text.to_string(),
        })
    }

    /// `{name}`, possibly split over several lines.
    fn reference_name(&mut self, mut line: Line) -> ParseResult<String> {
        while !line.text.ends_with('}') {
            let more = expect_line(&mut self.source, &line, "MeshMaterialList")?;
            line.text.push(' ');
            line.text.push_str(&more.text);
        }
        let inner = line.text.trim_start_matches('{').trim_end_matches('}').trim();
        if inner.is_empty() {
            return Err(unexpected(&line, "MeshMaterialList", "a material name"));
        }
        Ok(inner.to_string())
    }
}

/// Parse a whole document with default settings.
pub fn parse_str(content: &str) -> ParseResult<ParsedDocument> {
    XFileParser::new(content).parse()
}

/// `keyword name {` split into its parts; `body` holds the inline content
/// when the block also closes on this line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct BlockHeader<'a> {
    pub keyword: &'a str,
    pub name: &'a str,
    pub body: Option<&'a str>,
}

impl<'a> BlockHeader<'a> {
    pub fn parse(text: &'a str) -> Option<Self> {
        let open = text.find('{')?;
        let head = text[..open].trim();
        let (keyword, name) = match head.split_once(char::is_whitespace) {
            Some((keyword, name)) => (keyword, name.trim()),
            None => (head, ""),
        };
        let after = &text[open + 1..];
        let body = after.rfind('}').map(|close| after[..close].trim());
        Some(Self {
            keyword,
            name,
            body,
        })
    }
}

pub(super) fn unexpected(line: &Line, block: &'static str, expected: &'static str) -> ParseError {
    ParseError::Unexpected {
        line: line.number,
        block,
        expected,
        found: line.text.clone(),
    }
}

pub(super) fn expect_line(source: &mut LineSource, start: &Line, block: &'static str) -> ParseResult<Line> {
    source.next_line().ok_or(ParseError::UnexpectedEof {
        line: start.number,
        block,
    })
}

/// Skip a block whose opening line was already taken.
pub(super) fn skip_block(source: &mut LineSource, start: &Line) -> ParseResult<()> {
    let mut depth = brace_delta(&start.text);
    if let Some(header) = BlockHeader::parse(&start.text) {
        log::debug!("Skipping {} block at line {}", header.keyword, start.number);
    }
    while depth > 0 {
        let line = expect_line(source, start, "unrecognised")?;
        depth += brace_delta(&line.text);
    }
    Ok(())
}

fn brace_delta(text: &str) -> isize {
    text.matches('{').count() as isize - text.matches('}').count() as isize
}

/// `12;` -> 12
fn parse_count(text: &str) -> Option<usize> {
    let digits = text.strip_suffix(';')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// All numbers of a record, split on `;` and `,`.
pub(super) fn parse_numbers(text: &str, line: &Line, block: &'static str) -> ParseResult<Vec<f64>> {
    text.split([';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
                line: line.number,
                block,
                text: s.to_string(),
            })
        })
        .collect()
}

fn parse_vector<const N: usize>(line: &Line, block: &'static str) -> ParseResult<[f64; N]> {
    let values = parse_numbers(&line.text, line, block)?;
    values
        .as_slice()
        .try_into()
        .map_err(|_| unexpected(line, block, "a vector record"))
}

/// `3;a,b,c;,` -> [a, b, c]. The corner count must match the indices.
fn parse_face(line: &Line, block: &'static str) -> ParseResult<Vec<u32>> {
    let record = line.text.trim_end_matches([',', ';']);
    let Some((count, indices)) = record.split_once(';') else {
        return Err(unexpected(line, block, "a face record like `3;0,1,2;`"));
    };

    let parse_index = |s: &str| {
        s.trim().parse::<u32>().map_err(|_| ParseError::InvalidNumber {
            line: line.number,
            block,
            text: s.trim().to_string(),
        })
    };

    let count = parse_index(count)? as usize;
    let indices = indices
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_index)
        .collect::<ParseResult<Vec<u32>>>()?;

    if indices.len() != count {
        return Err(unexpected(line, block, "as many face indices as the corner count"));
    }
    Ok(indices)
}

/// A mesh being read, with the counts its blocks declared.
struct PendingMesh {
    mesh: Mesh,
    line: usize,
    declared: Vec<(Stream, usize)>,
}

impl PendingMesh {
    fn actual(&self, stream: Stream) -> usize {
        let mesh = &self.mesh;
        match stream {
            Stream::Vertices => mesh.positions.len(),
            Stream::Faces => mesh.faces.len(),
            Stream::Normals => mesh.normals.as_ref().map_or(0, |n| n.normals.len()),
            Stream::NormalFaces => mesh.normals.as_ref().map_or(0, |n| n.faces.len()),
            Stream::Uvs => mesh.uvs.as_ref().map_or(0, Vec::len),
            Stream::Colors => mesh.colors.as_ref().map_or(0, Vec::len),
        }
    }

    fn finish(self, policy: MaterialIndexPolicy) -> Result<Mesh, TopologyError> {
        for &(stream, declared) in &self.declared {
            let actual = self.actual(stream);
            if actual != declared {
                return Err(TopologyError::StreamLength {
                    mesh: self.mesh.name.clone(),
                    stream: stream.name(),
                    declared,
                    actual,
                });
            }
        }

        let vertex_count = self.mesh.positions.len();
        for (stream, len) in [
            (Stream::Uvs, self.mesh.uvs.as_ref().map(Vec::len)),
            (Stream::Colors, self.mesh.colors.as_ref().map(Vec::len)),
        ] {
            if let Some(len) = len.filter(|&len| len != vertex_count) {
                return Err(TopologyError::StreamLength {
                    mesh: self.mesh.name.clone(),
                    stream: stream.name(),
                    declared: vertex_count,
                    actual: len,
                });
            }
        }

        match policy {
            MaterialIndexPolicy::Strict => self.mesh.validate()?,
            MaterialIndexPolicy::Permissive => self.mesh.validate_topology()?,
        }
        Ok(self.mesh)
    }
}

/// Applies emitted mutations to the document under construction.
struct DocumentBuilder {
    frame_prefix: String,
    policy: MaterialIndexPolicy,
    materials: Vec<Material>,
    frames: Vec<Frame>,
    nodes: Vec<HierarchyNode>,
    mesh: Option<PendingMesh>,
    root: Option<(Frame, HierarchyNode)>,
    animation_sets: Vec<AnimationSet>,
}

impl DocumentBuilder {
    fn new(frame_prefix: String, policy: MaterialIndexPolicy) -> Self {
        Self {
            frame_prefix,
            policy,
            materials: Vec::new(),
            frames: Vec::new(),
            nodes: Vec::new(),
            mesh: None,
            root: None,
            animation_sets: Vec::new(),
        }
    }

    fn apply(&mut self, emit: Emit, line: usize) -> ParseResult<()> {
        match emit {
            Emit::Material(material) => self.add_material(material, line)?,
            Emit::OpenFrame(name) => {
                if let Some((root, _)) = &self.root {
                    log::warn!("Frame {} follows closed root {}", name, root.name);
                    return Err(ParseError::MultipleRootFrames { line, name });
                }
                log::debug!("Frame {}", name);
                self.nodes
                    .push(HierarchyNode::with_prefix(name.as_str(), &self.frame_prefix));
                self.frames.push(Frame::new(name));
            }
            Emit::CloseFrame => {
                if let (Some(frame), Some(node)) = (self.frames.pop(), self.nodes.pop()) {
                    match (self.frames.last_mut(), self.nodes.last_mut()) {
                        (Some(parent), Some(parent_node)) => {
                            parent.children.push(frame);
                            parent_node.children.push(node);
                        }
                        _ => self.root = Some((frame, node)),
                    }
                }
            }
            Emit::Transform(transform) => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.transform = Some(transform);
                }
            }
            Emit::OpenMesh(name) => {
                let name = match name {
                    Some(name) => name,
                    None => self.nodes.last().map(|n| n.nickname.clone()).unwrap_or_default(),
                };
                self.mesh = Some(PendingMesh {
                    mesh: Mesh::new(name),
                    line,
                    declared: Vec::new(),
                });
            }
            Emit::CloseMesh => {
                if let Some(pending) = self.mesh.take() {
                    let opened = pending.line;
                    let mesh = pending.finish(self.policy).map_err(|source| ParseError::Topology {
                        line: opened,
                        block: "Mesh",
                        source,
                    })?;
                    log::debug!(
                        "Mesh {}: {} vertices, {} faces",
                        mesh.name,
                        mesh.vertex_count(),
                        mesh.triangle_count()
                    );
                    if let Some(frame) = self.frames.last_mut() {
                        frame.meshes.push(mesh);
                    }
                }
            }
            Emit::Declared(stream, n) => {
                if let Some(pending) = &mut self.mesh {
                    pending.declared.push((stream, n));
                    match stream {
                        Stream::Normals => {
                            pending.mesh.normals.get_or_insert_with(MeshNormals::default);
                        }
                        Stream::Uvs => {
                            pending.mesh.uvs.get_or_insert_with(Vec::new);
                        }
                        Stream::Colors => {
                            pending.mesh.colors.get_or_insert_with(Vec::new);
                        }
                        _ => {}
                    }
                }
            }
            Emit::Vertex(v) => self.pending(line)?.positions.push(v),
            Emit::Face(corners) => {
                let mesh = self.pending(line)?;
                let face = triangle(mesh, mesh.faces.len(), &corners, line)?;
                mesh.faces.push(face);
            }
            Emit::MaterialList { binding, inline } => {
                for material in inline {
                    if self.materials.iter().all(|m| m.name != material.name) {
                        self.materials.push(material);
                    }
                }
                self.pending(line)?.material = binding;
            }
            Emit::Normal(n) => {
                self.pending(line)?
                    .normals
                    .get_or_insert_with(MeshNormals::default)
                    .normals
                    .push(n);
            }
            Emit::NormalFace(corners) => {
                let mesh = self.pending(line)?;
                let count = mesh.normals.as_ref().map_or(0, |n| n.faces.len());
                let face = triangle(mesh, count, &corners, line)?;
                mesh.normals
                    .get_or_insert_with(MeshNormals::default)
                    .faces
                    .push(face);
            }
            Emit::Uv(uv) => self.pending(line)?.uvs.get_or_insert_with(Vec::new).push(uv),
            Emit::Color(c) => self.pending(line)?.colors.get_or_insert_with(Vec::new).push(c),
            Emit::AnimationSet(set) => {
                log::debug!("AnimationSet {}: {} keys", set.name, set.key_count());
                self.animation_sets.push(set);
            }
        }
        Ok(())
    }

    fn add_material(&mut self, material: Material, line: usize) -> ParseResult<()> {
        if self.materials.iter().any(|m| m.name == material.name) {
            return Err(ParseError::DuplicateMaterial {
                line,
                name: material.name,
            });
        }
        self.materials.push(material);
        Ok(())
    }

    fn pending(&mut self, line: usize) -> ParseResult<&mut Mesh> {
        match &mut self.mesh {
            Some(pending) => Ok(&mut pending.mesh),
            None => Err(ParseError::UnexpectedEof { line, block: "Mesh" }),
        }
    }

    fn finish(self) -> ParseResult<ParsedDocument> {
        let (root, hierarchy) = self.root.ok_or(ParseError::NoRootFrame)?;
        let document = SceneDocument {
            materials: self.materials,
            root,
            animation_sets: self.animation_sets,
        };
        log::info!(
            "Parsed {} materials, {} frames, {} meshes, {} animation sets",
            document.material_count(),
            document.frame_count(),
            document.mesh_count(),
            document.animation_sets.len()
        );
        Ok(ParsedDocument {
            document,
            hierarchy,
        })
    }
}

fn triangle(mesh: &Mesh, face: usize, corners: &[u32], line: usize) -> ParseResult<[u32; 3]> {
    corners.try_into().map_err(|_| ParseError::Topology {
        line,
        block: "Mesh",
        source: TopologyError::NonTriangle {
            mesh: mesh.name.clone(),
            face,
            corners: corners.len(),
        },
    })
}
