use std::fmt;

use crate::compile::{ShaderStage, ValueKind};

/// Failure to turn shader sources into a usable program.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to compile {stage} shader: {message}")]
    Compile { stage: ShaderStage, message: String },
    #[error("failed to link shader program: {0}")]
    Link(String),
    #[error("GPU device rejected the shader program: {0}")]
    Device(String),
}

/// Failure reported by a [`GpuBackend`](crate::GpuBackend) outside shader compilation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("rendering context unavailable: {0}")]
    Context(String),
}

impl BackendError {
    pub fn as_surface_error(&self) -> Option<&wgpu::SurfaceError> {
        match self {
            BackendError::Surface(err) => Some(err),
            BackendError::Context(_) => None,
        }
    }
}

/// Which kind of program input a binding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Attribute,
    Uniform,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKind::Attribute => f.write_str("attribute"),
            BindingKind::Uniform => f.write_str("uniform"),
        }
    }
}

/// Errors surfaced by [`RenderSurface`](crate::RenderSurface).
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("rendering surface has not been initialised")]
    NotInitialised,
    #[error("rendering surface has been torn down")]
    TornDown,
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error("shader program does not expose {kind} `{name}`")]
    MissingBinding {
        kind: BindingKind,
        name: &'static str,
    },
    #[error("shader program declares uniform `{name}` as `{found}`; expected `{expected}`")]
    BindingType {
        name: &'static str,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SurfaceError {
    /// Returns the underlying wgpu surface error, if this is one.
    pub fn as_surface_error(&self) -> Option<&wgpu::SurfaceError> {
        match self {
            SurfaceError::Backend(err) => err.as_surface_error(),
            _ => None,
        }
    }
}

/// Errors raised while attaching a file watcher to the shader sources.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to create file watcher: {0}")]
    Create(#[source] notify::Error),
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: String,
        #[source]
        source: notify::Error,
    },
}
