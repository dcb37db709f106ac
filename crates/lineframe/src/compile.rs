//! Translation of legacy GLSL shader pairs into GLSL 450 for naga/wgpu.
//!
//! Shader files on disk use the old desktop/ES dialect: `attribute` and
//! `varying` qualifiers, loose `uniform` declarations, precision qualifiers and
//! `gl_FragColor`. wgpu only understands Vulkan-flavoured GLSL, so every
//! program goes through [`translate_program`] first:
//!
//! 1. Attributes become `layout(location = N) in` in declaration order.
//! 2. Varyings become vertex outputs and are linked to fragment inputs by name.
//! 3. Loose uniforms from both stages are gathered into one std140 block that
//!    both stages declare, with macros mapping the declared names onto it.
//! 4. `gl_FragColor` is redirected to an explicit colour output.
//!
//! The resulting [`ProgramInterface`] is what attribute and uniform lookups
//! resolve against.

use std::fmt;

use wgpu::naga;
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::ShaderError;

const HEADER: &str = "#version 450\n";
const UNIFORM_BLOCK: &str = "LineframeUniforms";
const UNIFORM_INSTANCE: &str = "lineframe_ubo";
const UNIFORM_MEMBER_PREFIX: &str = "lineframe_u_";
const FRAG_COLOR_OUTPUT: &str = "lineframe_frag_color";

const INTERPOLATION_QUALIFIERS: [&str; 5] =
    ["invariant", "flat", "smooth", "noperspective", "centroid"];
const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

/// Programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// GLSL value types accepted for attributes and uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Int,
    UInt,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl ValueKind {
    fn parse(ty: &str) -> Option<Self> {
        match ty {
            "float" => Some(ValueKind::Float),
            "int" => Some(ValueKind::Int),
            "uint" => Some(ValueKind::UInt),
            "vec2" => Some(ValueKind::Vec2),
            "vec3" => Some(ValueKind::Vec3),
            "vec4" => Some(ValueKind::Vec4),
            "mat4" => Some(ValueKind::Mat4),
            _ => None,
        }
    }

    pub fn glsl_name(self) -> &'static str {
        match self {
            ValueKind::Float => "float",
            ValueKind::Int => "int",
            ValueKind::UInt => "uint",
            ValueKind::Vec2 => "vec2",
            ValueKind::Vec3 => "vec3",
            ValueKind::Vec4 => "vec4",
            ValueKind::Mat4 => "mat4",
        }
    }

    /// Number of scalar components.
    pub fn components(self) -> u32 {
        match self {
            ValueKind::Float | ValueKind::Int | ValueKind::UInt => 1,
            ValueKind::Vec2 => 2,
            ValueKind::Vec3 => 3,
            ValueKind::Vec4 => 4,
            ValueKind::Mat4 => 16,
        }
    }

    fn is_float_vector(self) -> bool {
        matches!(
            self,
            ValueKind::Float | ValueKind::Vec2 | ValueKind::Vec3 | ValueKind::Vec4
        )
    }

    fn std140_size(self) -> u32 {
        match self {
            ValueKind::Float | ValueKind::Int | ValueKind::UInt => 4,
            ValueKind::Vec2 => 8,
            ValueKind::Vec3 => 12,
            ValueKind::Vec4 => 16,
            ValueKind::Mat4 => 64,
        }
    }

    fn std140_align(self) -> u32 {
        match self {
            ValueKind::Float | ValueKind::Int | ValueKind::UInt => 4,
            ValueKind::Vec2 => 8,
            ValueKind::Vec3 | ValueKind::Vec4 | ValueKind::Mat4 => 16,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

/// A vertex attribute after translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSlot {
    pub name: String,
    pub location: u32,
    pub kind: ValueKind,
}

/// A uniform and its byte offset inside the shared std140 block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    pub kind: ValueKind,
    pub offset: u32,
}

/// Name-addressable inputs of a translated program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramInterface {
    attributes: Vec<AttributeSlot>,
    uniforms: Vec<UniformSlot>,
    uniform_cursor: u32,
}

impl ProgramInterface {
    pub fn attributes(&self) -> &[AttributeSlot] {
        &self.attributes
    }

    pub fn uniforms(&self) -> &[UniformSlot] {
        &self.uniforms
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSlot> {
        self.attributes.iter().find(|slot| slot.name == name)
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformSlot> {
        self.uniforms.iter().find(|slot| slot.name == name)
    }

    /// Size of the uniform block in bytes, padded to 16. Zero when the program
    /// declares no uniforms.
    pub fn uniform_block_size(&self) -> u32 {
        align_up(self.uniform_cursor, 16)
    }

    fn push_uniform(&mut self, name: &str, kind: ValueKind) {
        let offset = align_up(self.uniform_cursor, kind.std140_align());
        self.uniform_cursor = offset + kind.std140_size();
        self.uniforms.push(UniformSlot {
            name: name.to_owned(),
            kind,
            offset,
        });
    }
}

fn align_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// A shader pair rewritten for the naga GLSL front end.
#[derive(Debug, Clone)]
pub struct TranslatedProgram {
    pub vertex: String,
    pub fragment: String,
    pub interface: ProgramInterface,
}

/// Translates and validates a program. This is the CPU half of a link: once it
/// succeeds the sources are known to compile for any wgpu backend.
pub fn build_program(vertex: &str, fragment: &str) -> Result<TranslatedProgram, ShaderError> {
    let translated = translate_program(vertex, fragment)?;
    validate(ShaderStage::Vertex, &translated.vertex)?;
    validate(ShaderStage::Fragment, &translated.fragment)?;
    Ok(translated)
}

/// Parses and validates a single translated stage with naga.
pub(crate) fn validate(stage: ShaderStage, source: &str) -> Result<naga::Module, ShaderError> {
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(stage.to_naga()), source)
        .map_err(|errors| ShaderError::Compile {
            stage,
            message: errors.emit_to_string(source),
        })?;
    if module.entry_points.is_empty() {
        return Err(ShaderError::Compile {
            stage,
            message: "no `main` entry point".to_owned(),
        });
    }

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| ShaderError::Compile {
            stage,
            message: err.emit_to_string(source),
        })?;
    Ok(module)
}

/// Rewrites a legacy vertex/fragment pair into GLSL 450.
pub fn translate_program(vertex: &str, fragment: &str) -> Result<TranslatedProgram, ShaderError> {
    let mut interface = ProgramInterface::default();
    let mut varyings = Vec::new();

    let vertex_body =
        translate_stage(ShaderStage::Vertex, vertex, &mut interface, &mut varyings)?;
    let fragment_body =
        translate_stage(ShaderStage::Fragment, fragment, &mut interface, &mut varyings)?;

    let prelude = uniform_prelude(&interface);

    let redirected = replace_identifier(&fragment_body, "gl_FragColor", FRAG_COLOR_OUTPUT);
    let fragment_outputs = if redirected != fragment_body {
        format!("layout(location = 0) out vec4 {FRAG_COLOR_OUTPUT};\n")
    } else {
        String::new()
    };

    Ok(TranslatedProgram {
        vertex: format!("{HEADER}{prelude}{vertex_body}"),
        fragment: format!("{HEADER}{prelude}{fragment_outputs}{redirected}"),
        interface,
    })
}

struct Varying {
    name: String,
    ty: String,
    location: u32,
}

fn translate_stage(
    stage: ShaderStage,
    source: &str,
    interface: &mut ProgramInterface,
    varyings: &mut Vec<Varying>,
) -> Result<String, ShaderError> {
    let mut body = String::new();
    for chunk in split_top_level(source) {
        match chunk {
            Chunk::Comment(_) => {}
            Chunk::Directive(text) => {
                if text.trim_start_matches('#').trim_start().starts_with("version") {
                    continue;
                }
                body.push_str(text.trim_end());
                body.push('\n');
            }
            Chunk::Block(text) | Chunk::Trailing(text) => {
                body.push_str(text);
                body.push('\n');
            }
            Chunk::Statement(text) => match Declaration::parse(text)
                .map_err(|message| ShaderError::Compile { stage, message })?
            {
                Some(declaration) => {
                    translate_declaration(stage, declaration, interface, varyings, &mut body)?
                }
                None => {
                    body.push_str(text.trim());
                    body.push_str(";\n");
                }
            },
        }
    }
    Ok(body)
}

fn translate_declaration(
    stage: ShaderStage,
    declaration: Declaration,
    interface: &mut ProgramInterface,
    varyings: &mut Vec<Varying>,
    body: &mut String,
) -> Result<(), ShaderError> {
    let compile_error = |message: String| ShaderError::Compile { stage, message };
    let qualifiers: String = declaration
        .qualifiers
        .iter()
        .map(|qualifier| format!("{qualifier} "))
        .collect();
    let ty = declaration.ty.as_str();

    match declaration.storage {
        Storage::Precision => {}
        Storage::Attribute => {
            if stage != ShaderStage::Vertex {
                return Err(compile_error(
                    "`attribute` is only allowed in vertex shaders".to_owned(),
                ));
            }
            let kind = ValueKind::parse(ty)
                .filter(|kind| kind.is_float_vector())
                .ok_or_else(|| compile_error(format!("attribute type `{ty}` is not supported")))?;
            for name in &declaration.names {
                if interface.attribute(name).is_some() {
                    return Err(compile_error(format!("attribute `{name}` declared twice")));
                }
                let location = interface.attributes.len() as u32;
                interface.attributes.push(AttributeSlot {
                    name: name.clone(),
                    location,
                    kind,
                });
                body.push_str(&format!(
                    "layout(location = {location}) in {qualifiers}{ty} {name};\n"
                ));
            }
        }
        Storage::Varying => {
            for name in &declaration.names {
                match stage {
                    ShaderStage::Vertex => {
                        if varyings.iter().any(|varying| &varying.name == name) {
                            return Err(compile_error(format!("varying `{name}` declared twice")));
                        }
                        let location = varyings.len() as u32;
                        varyings.push(Varying {
                            name: name.clone(),
                            ty: ty.to_owned(),
                            location,
                        });
                        body.push_str(&format!(
                            "layout(location = {location}) {qualifiers}out {ty} {name};\n"
                        ));
                    }
                    ShaderStage::Fragment => {
                        let varying = varyings
                            .iter()
                            .find(|varying| &varying.name == name)
                            .ok_or_else(|| {
                                ShaderError::Link(format!(
                                    "fragment varying `{name}` is not written by the vertex shader"
                                ))
                            })?;
                        if varying.ty != ty {
                            return Err(ShaderError::Link(format!(
                                "varying `{name}` is `{}` in the vertex shader but `{ty}` in the fragment shader",
                                varying.ty
                            )));
                        }
                        body.push_str(&format!(
                            "layout(location = {}) {qualifiers}in {ty} {name};\n",
                            varying.location
                        ));
                    }
                }
            }
        }
        Storage::Uniform => {
            let kind = ValueKind::parse(ty).ok_or_else(|| {
                compile_error(format!(
                    "uniform type `{ty}` is not supported (float, int, uint, vec2, vec3, vec4, mat4)"
                ))
            })?;
            for name in &declaration.names {
                match interface.uniform(name) {
                    Some(existing) if existing.kind != kind => {
                        return Err(ShaderError::Link(format!(
                            "uniform `{name}` declared as `{}` and `{kind}`",
                            existing.kind
                        )));
                    }
                    Some(_) => {}
                    None => interface.push_uniform(name, kind),
                }
            }
        }
    }
    Ok(())
}

/// Shared uniform block plus the macros that keep the declared names working.
fn uniform_prelude(interface: &ProgramInterface) -> String {
    if interface.uniforms.is_empty() {
        return String::new();
    }
    let mut prelude =
        format!("layout(std140, set = 0, binding = 0) uniform {UNIFORM_BLOCK} {{\n");
    for slot in &interface.uniforms {
        prelude.push_str(&format!(
            "    {} {UNIFORM_MEMBER_PREFIX}{};\n",
            slot.kind, slot.name
        ));
    }
    prelude.push_str(&format!("}} {UNIFORM_INSTANCE};\n"));
    for slot in &interface.uniforms {
        prelude.push_str(&format!(
            "#define {name} {UNIFORM_INSTANCE}.{UNIFORM_MEMBER_PREFIX}{name}\n",
            name = slot.name
        ));
    }
    prelude
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Storage {
    Attribute,
    Varying,
    Uniform,
    Precision,
}

#[derive(Debug)]
struct Declaration {
    storage: Storage,
    qualifiers: Vec<String>,
    ty: String,
    names: Vec<String>,
}

impl Declaration {
    /// Returns `Ok(None)` for statements that are not interface declarations.
    fn parse(statement: &str) -> Result<Option<Self>, String> {
        let cleaned = strip_comments(statement);
        let mut tokens = cleaned.split_whitespace().peekable();

        let mut qualifiers = Vec::new();
        while let Some(token) = tokens.peek() {
            if INTERPOLATION_QUALIFIERS.contains(token) {
                qualifiers.push((*token).to_owned());
                tokens.next();
            } else {
                break;
            }
        }

        let storage = match tokens.next() {
            Some("attribute") => Storage::Attribute,
            Some("varying") => Storage::Varying,
            Some("uniform") => Storage::Uniform,
            Some("precision") if qualifiers.is_empty() => Storage::Precision,
            _ => return Ok(None),
        };

        let rest: Vec<&str> = tokens
            .filter(|token| !PRECISION_QUALIFIERS.contains(token))
            .collect();
        if storage == Storage::Precision {
            return Ok(Some(Self {
                storage,
                qualifiers,
                ty: rest.join(" "),
                names: Vec::new(),
            }));
        }

        let (ty, declarators) = rest
            .split_first()
            .ok_or_else(|| format!("incomplete declaration `{}`", statement.trim()))?;
        let names: Vec<String> = declarators
            .join(" ")
            .split(',')
            .map(|name| name.trim().to_owned())
            .collect();
        if names.iter().any(|name| !is_identifier(name)) {
            return Err(format!("unsupported declaration `{}`", statement.trim()));
        }

        Ok(Some(Self {
            storage,
            qualifiers,
            ty: (*ty).to_owned(),
            names,
        }))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' => {
            bytes.all(is_identifier_byte)
        }
        _ => false,
    }
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Replaces whole-word occurrences of `from`.
fn replace_identifier(text: &str, from: &str, to: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut search = 0;
    let mut copied = 0;
    while let Some(found) = text[search..].find(from) {
        let start = search + found;
        let end = start + from.len();
        let bounded_before = start == 0 || !is_identifier_byte(bytes[start - 1]);
        let bounded_after = end == bytes.len() || !is_identifier_byte(bytes[end]);
        if bounded_before && bounded_after {
            out.push_str(&text[copied..start]);
            out.push_str(to);
            copied = end;
        }
        search = end;
    }
    out.push_str(&text[copied..]);
    out
}

fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut index = 0;
    let mut copied = 0;
    while index < bytes.len() {
        if let Some(end) = comment_end(bytes, index) {
            out.push_str(&text[copied..index]);
            out.push(' ');
            index = end;
            copied = end;
        } else {
            index += 1;
        }
    }
    out.push_str(&text[copied..]);
    out
}

/// Top-level pieces of a shader source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'a> {
    Comment(&'a str),
    Directive(&'a str),
    /// Text before a top-level `;`, without the semicolon.
    Statement(&'a str),
    /// Text up to and including the brace that closes a top-level `{`.
    Block(&'a str),
    /// Unterminated text at the end of the source.
    Trailing(&'a str),
}

fn split_top_level(source: &str) -> Vec<Chunk<'_>> {
    let bytes = source.as_bytes();
    let mut chunks = Vec::new();
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index].is_ascii_whitespace() {
            index += 1;
            continue;
        }
        if let Some(end) = comment_end(bytes, index) {
            chunks.push(Chunk::Comment(&source[index..end]));
            index = end;
            continue;
        }
        if bytes[index] == b'#' {
            let end = line_end(bytes, index);
            chunks.push(Chunk::Directive(&source[index..end]));
            index = end;
            continue;
        }

        let start = index;
        let mut cursor = index;
        loop {
            if cursor >= bytes.len() {
                chunks.push(Chunk::Trailing(source[start..].trim_end()));
                index = bytes.len();
                break;
            }
            if let Some(end) = comment_end(bytes, cursor) {
                cursor = end;
                continue;
            }
            match bytes[cursor] {
                b';' => {
                    chunks.push(Chunk::Statement(&source[start..cursor]));
                    index = cursor + 1;
                    break;
                }
                b'{' => {
                    let end = block_end(bytes, cursor);
                    chunks.push(Chunk::Block(&source[start..end]));
                    index = end;
                    break;
                }
                _ => cursor += 1,
            }
        }
    }
    chunks
}

fn comment_end(bytes: &[u8], index: usize) -> Option<usize> {
    let rest = &bytes[index..];
    if rest.starts_with(b"//") {
        Some(line_end(bytes, index))
    } else if rest.starts_with(b"/*") {
        let end = rest[2..]
            .windows(2)
            .position(|window| window == b"*/")
            .map(|position| index + 2 + position + 2)
            .unwrap_or(bytes.len());
        Some(end)
    } else {
        None
    }
}

fn line_end(bytes: &[u8], index: usize) -> usize {
    bytes[index..]
        .iter()
        .position(|&byte| byte == b'\n')
        .map(|position| index + position)
        .unwrap_or(bytes.len())
}

fn block_end(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    let mut cursor = open;
    while cursor < bytes.len() {
        if let Some(end) = comment_end(bytes, cursor) {
            cursor = end;
            continue;
        }
        match bytes[cursor] {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return cursor + 1;
                }
            }
            _ => {}
        }
        cursor += 1;
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{generated_fragment_shader, UNREADABLE_SOURCE};

    const VERTEX: &str = r"attribute highp vec4 posAttr;
attribute lowp vec4 colAttr;
varying lowp vec4 col;
uniform highp mat4 matrix;
uniform float time;
void main() {
    col = colAttr;
    gl_Position = matrix * (posAttr + vec4(0.0, 0.1 * sin(time), 0.0, 0.0));
}
";

    #[test]
    fn attributes_get_sequential_locations() {
        let fragment = generated_fragment_shader("col");
        let translated = translate_program(VERTEX, &fragment).unwrap();
        let interface = &translated.interface;

        let position = interface.attribute("posAttr").expect("posAttr");
        assert_eq!(position.location, 0);
        assert_eq!(position.kind, ValueKind::Vec4);
        assert_eq!(interface.attribute("colAttr").map(|slot| slot.location), Some(1));
        assert!(interface.attribute("normal").is_none());
        assert!(translated
            .vertex
            .contains("layout(location = 0) in vec4 posAttr;"));
        assert!(translated.vertex.contains("layout(location = 0) out vec4 col;"));
        assert!(translated.fragment.contains("layout(location = 0) in vec4 col;"));
    }

    #[test]
    fn uniforms_share_one_std140_block() {
        let fragment = "varying lowp vec4 col;\nuniform float time;\nvoid main() {\n    gl_FragColor = col * time;\n}\n";
        let translated = translate_program(VERTEX, fragment).unwrap();
        let interface = &translated.interface;

        assert_eq!(interface.uniforms().len(), 2);
        assert_eq!(interface.uniform("matrix").map(|slot| slot.offset), Some(0));
        assert_eq!(interface.uniform("time").map(|slot| slot.offset), Some(64));
        assert_eq!(interface.uniform_block_size(), 80);
        assert!(translated.vertex.contains("uniform LineframeUniforms"));
        assert!(translated.fragment.contains("uniform LineframeUniforms"));
        assert!(translated
            .fragment
            .contains("#define time lineframe_ubo.lineframe_u_time"));
    }

    #[test]
    fn std140_packs_scalars_after_vec3() {
        let vertex = "attribute vec2 posAttr;\nuniform vec3 tint;\nuniform float fade;\nuniform vec2 offset;\nvoid main() { gl_Position = vec4(posAttr + offset, fade, 1.0); }";
        let translated = translate_program(vertex, "void main() {}").unwrap();
        let interface = &translated.interface;
        assert_eq!(interface.uniform("tint").map(|slot| slot.offset), Some(0));
        assert_eq!(interface.uniform("fade").map(|slot| slot.offset), Some(12));
        assert_eq!(interface.uniform("offset").map(|slot| slot.offset), Some(16));
        assert_eq!(interface.uniform_block_size(), 32);
    }

    #[test]
    fn gl_frag_color_is_redirected() {
        let fragment = generated_fragment_shader("1.0,0.0,0.0,1.0");
        let translated = translate_program(VERTEX, &fragment).unwrap();
        assert!(!translated.fragment.contains("gl_FragColor"));
        assert!(translated
            .fragment
            .contains("layout(location = 0) out vec4 lineframe_frag_color;"));
        assert!(translated
            .fragment
            .contains("lineframe_frag_color = vec4(1.0,0.0,0.0,1.0);"));
    }

    #[test]
    fn builds_with_naga() {
        let fragment = generated_fragment_shader("col");
        build_program(VERTEX, &fragment).expect("program builds");
    }

    #[test]
    fn concatenated_sources_still_build() {
        let vertex: String = VERTEX.lines().collect();
        let fragment: String = generated_fragment_shader("col").lines().collect();
        build_program(&vertex, &fragment).expect("line breaks are not needed without comments");
    }

    #[test]
    fn concatenated_line_comment_breaks_the_program() {
        let vertex = format!("// transforms positions{}", VERTEX.lines().collect::<String>());
        assert!(build_program(&vertex, &generated_fragment_shader("col")).is_err());
    }

    #[test]
    fn sentinel_source_fails_to_compile() {
        let fragment = "void main() { gl_FragColor = vec4(1.0); }";
        let err = build_program(UNREADABLE_SOURCE, fragment).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn malformed_color_expression_fails_in_fragment_stage() {
        let err = build_program(VERTEX, &generated_fragment_shader("1.0,,0.0")).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn unmatched_varying_is_a_link_error() {
        let fragment = "varying lowp vec4 shade;\nvoid main() { gl_FragColor = shade; }";
        let err = translate_program(VERTEX, fragment).unwrap_err();
        assert!(matches!(err, ShaderError::Link(_)));
    }

    #[test]
    fn conflicting_uniform_types_are_a_link_error() {
        let fragment = "varying lowp vec4 col;\nuniform vec2 time;\nvoid main() { gl_FragColor = col; }";
        let err = translate_program(VERTEX, fragment).unwrap_err();
        assert!(matches!(err, ShaderError::Link(_)));
    }

    #[test]
    fn attribute_in_fragment_is_rejected() {
        let fragment = "attribute vec4 extra;\nvoid main() { gl_FragColor = extra; }";
        let err = translate_program(VERTEX, fragment).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn splits_statements_blocks_and_directives() {
        let chunks = split_top_level(
            "#version 120\nuniform float a, b; /* note; */ void f() { if (a > b) { } } trailing",
        );
        assert_eq!(
            chunks,
            vec![
                Chunk::Directive("#version 120"),
                Chunk::Statement("uniform float a, b"),
                Chunk::Comment("/* note; */"),
                Chunk::Block("void f() { if (a > b) { } }"),
                Chunk::Trailing("trailing"),
            ]
        );
    }

    #[test]
    fn multiple_declarators_each_get_a_slot() {
        let vertex = "attribute vec2 posAttr, uvAttr;\nvoid main() { gl_Position = vec4(posAttr + uvAttr, 0.0, 1.0); }";
        let translated = translate_program(vertex, "void main() {}").unwrap();
        assert_eq!(translated.interface.attribute("uvAttr").map(|slot| slot.location), Some(1));
    }

    #[test]
    fn replace_identifier_respects_word_boundaries() {
        assert_eq!(
            replace_identifier("gl_FragColor = my_gl_FragColor2;", "gl_FragColor", "out"),
            "out = my_gl_FragColor2;"
        );
    }
}
