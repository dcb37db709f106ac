use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::backend::{AttributeLocation, GpuBackend, ProgramId, UniformLocation};
use crate::compile::ValueKind;
use crate::error::{BindingKind, ShaderError, SurfaceError};
use crate::source::{read_source, SourceJoin};

pub const POSITION_ATTRIBUTE: &str = "posAttr";
pub const COLOR_ATTRIBUTE: &str = "colAttr";
pub const MATRIX_UNIFORM: &str = "matrix";
pub const TIME_UNIFORM: &str = "time";

pub const DEFAULT_VERTEX_SHADER: &str = "vertexShader.glsl";
pub const DEFAULT_FRAGMENT_SHADER: &str = "fragmentShader.glsl";

/// Locations of the two shader source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl Default for ShaderPaths {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from(DEFAULT_VERTEX_SHADER),
            fragment: PathBuf::from(DEFAULT_FRAGMENT_SHADER),
        }
    }
}

impl ShaderPaths {
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.vertex == path || self.fragment == path
    }
}

/// Locations every drawable program must expose. `time` is optional; frames
/// skip the upload when a shader does not declare it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramBindings {
    pub position: AttributeLocation,
    pub color: AttributeLocation,
    pub matrix: UniformLocation,
    pub time: Option<UniformLocation>,
}

/// A required input that the linked program does not expose, or exposes
/// with a type the renderer cannot upload to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingBinding {
    pub kind: BindingKind,
    pub name: &'static str,
    /// `(expected, declared)` when the name exists with the wrong type.
    pub found: Option<(ValueKind, ValueKind)>,
}

impl MissingBinding {
    fn absent(kind: BindingKind, name: &'static str) -> Self {
        Self {
            kind,
            name,
            found: None,
        }
    }
}

impl From<MissingBinding> for SurfaceError {
    fn from(missing: MissingBinding) -> Self {
        match missing.found {
            Some((expected, found)) => SurfaceError::BindingType {
                name: missing.name,
                expected,
                found,
            },
            None => SurfaceError::MissingBinding {
                kind: missing.kind,
                name: missing.name,
            },
        }
    }
}

/// Result of rebuilding the program after a source change.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// The new program linked and all required bindings resolved.
    Ready(ProgramId),
    /// The program linked but cannot be drawn with; it is never bound.
    Unusable {
        program: ProgramId,
        missing: Vec<MissingBinding>,
    },
    /// No program exists until the next successful reload.
    Failed(ShaderError),
    /// The surface was not in a state that allows reloading.
    Skipped,
}

impl ReloadOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReloadOutcome::Ready(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct LinkedProgram {
    id: ProgramId,
    bindings: Option<ProgramBindings>,
}

/// Owns the shader program and its cached binding locations.
#[derive(Debug)]
pub struct ShaderProgramManager {
    paths: ShaderPaths,
    join: SourceJoin,
    program: Option<LinkedProgram>,
}

impl ShaderProgramManager {
    pub fn new(paths: ShaderPaths, join: SourceJoin) -> Self {
        Self {
            paths,
            join,
            program: None,
        }
    }

    pub fn paths(&self) -> &ShaderPaths {
        &self.paths
    }

    pub fn join(&self) -> SourceJoin {
        self.join
    }

    /// Id of the current program, usable or not.
    pub fn program(&self) -> Option<ProgramId> {
        self.program.map(|program| program.id)
    }

    /// The program and bindings to draw with, if the current program is usable.
    pub fn usable(&self) -> Option<(ProgramId, ProgramBindings)> {
        let program = self.program?;
        Some((program.id, program.bindings?))
    }

    /// Builds the first program. Any failure is fatal to the caller and leaves
    /// no program behind.
    pub fn initialize<B: GpuBackend>(&mut self, backend: &mut B) -> Result<(), SurfaceError> {
        let (vertex, fragment) = self.read_sources();
        let id = backend.create_program(&vertex, &fragment)?;
        match resolve_bindings(backend, id) {
            Ok(bindings) => {
                info!(
                    program = id.0,
                    vertex = %self.paths.vertex.display(),
                    fragment = %self.paths.fragment.display(),
                    "shader program ready"
                );
                self.program = Some(LinkedProgram {
                    id,
                    bindings: Some(bindings),
                });
                Ok(())
            }
            Err(missing) => {
                backend.destroy_program(id);
                let first = missing[0];
                Err(first.into())
            }
        }
    }

    /// Releases the current program and builds a new one from the files on
    /// disk. Never fails; the outcome says what is left.
    pub fn reload<B: GpuBackend>(&mut self, backend: &mut B) -> ReloadOutcome {
        let (vertex, fragment) = self.read_sources();
        if let Some(old) = self.program.take() {
            debug!(program = old.id.0, "releasing shader program");
            backend.destroy_program(old.id);
        }

        let id = match backend.create_program(&vertex, &fragment) {
            Ok(id) => id,
            Err(err) => {
                error!(error = %err, "shader reload failed; rendering without a program");
                return ReloadOutcome::Failed(err);
            }
        };

        match resolve_bindings(backend, id) {
            Ok(bindings) => {
                info!(program = id.0, "shader program reloaded");
                self.program = Some(LinkedProgram {
                    id,
                    bindings: Some(bindings),
                });
                ReloadOutcome::Ready(id)
            }
            Err(missing) => {
                for binding in &missing {
                    error!(
                        program = id.0,
                        kind = %binding.kind,
                        name = binding.name,
                        "reloaded shader program is missing a binding"
                    );
                }
                self.program = Some(LinkedProgram { id, bindings: None });
                ReloadOutcome::Unusable {
                    program: id,
                    missing,
                }
            }
        }
    }

    /// Destroys the current program, if any.
    pub fn release<B: GpuBackend>(&mut self, backend: &mut B) {
        if let Some(program) = self.program.take() {
            backend.destroy_program(program.id);
        }
    }

    fn read_sources(&self) -> (String, String) {
        let vertex = read_source(&self.paths.vertex, self.join);
        let fragment = read_source(&self.paths.fragment, self.join);
        (vertex, fragment)
    }
}

fn resolve_bindings<B: GpuBackend>(
    backend: &B,
    program: ProgramId,
) -> Result<ProgramBindings, Vec<MissingBinding>> {
    let mut missing = Vec::new();
    let mut attribute = |name: &'static str| {
        let location = backend.attribute_location(program, name);
        if location.is_none() {
            missing.push(MissingBinding::absent(BindingKind::Attribute, name));
        }
        location
    };
    let position = attribute(POSITION_ATTRIBUTE);
    let color = attribute(COLOR_ATTRIBUTE);

    let mut uniform = |name: &'static str, expected: ValueKind, required: bool| {
        match backend.uniform_kind(program, name) {
            Some(found) if found != expected => {
                missing.push(MissingBinding {
                    kind: BindingKind::Uniform,
                    name,
                    found: Some((expected, found)),
                });
                None
            }
            Some(_) => backend.uniform_location(program, name),
            None => {
                if required {
                    missing.push(MissingBinding::absent(BindingKind::Uniform, name));
                } else {
                    warn!(program = program.0, name, "shader program has no optional uniform");
                }
                None
            }
        }
    };
    let matrix = uniform(MATRIX_UNIFORM, ValueKind::Mat4, true);
    let time = uniform(TIME_UNIFORM, ValueKind::Float, false);
    if !missing.is_empty() {
        return Err(missing);
    }

    match (position, color, matrix) {
        (Some(position), Some(color), Some(matrix)) => Ok(ProgramBindings {
            position,
            color,
            matrix,
            time,
        }),
        _ => Err(missing),
    }
}
