//! Hot-reloading GLSL line renderer.
//!
//! `lineframe` renders a flat line-list shape through a user-supplied shader
//! pair, rotates it with pointer drags and animates it with a fixed-step
//! clock. The shader files are watched on disk and the program is rebuilt
//! whenever either changes.
//!
//! ```text
//!   AnimationClock tick ──▶ time += step ──▶ request_redraw (coalesced)
//!                                                  │
//!   pointer drag ──▶ RotationController ───────────┤
//!                                                  ▼
//!   ShaderWatcher ──▶ on_file_changed      RenderSurface::render_frame
//!                          │                       │
//!                          ▼                       ▼
//!               ShaderProgramManager ──▶ GpuBackend (wgpu or recording)
//! ```
//!
//! [`RenderSurface`] is generic over [`GpuBackend`]. [`WgpuBackend`] draws into
//! a window; [`RecordingBackend`] runs the same shader translation and
//! validation without a GPU and logs every call.

mod backend;
mod clock;
pub mod compile;
mod error;
mod geometry;
mod gpu;
mod headless;
mod program;
mod rotation;
mod source;
mod surface;
mod uniforms;
mod watch;

pub use backend::{AttributeLocation, GpuBackend, ProgramId, UniformLocation, UniformValue};
pub use clock::{AnimationClock, DEFAULT_TICK_PERIOD, DEFAULT_TIME_STEP};
pub use error::{BackendError, BindingKind, ShaderError, SurfaceError, WatchError};
pub use geometry::{GeometryBuffer, ShapeListener};
pub use gpu::{Antialiasing, GpuOptions, WgpuBackend};
pub use headless::{BackendCall, RecordingBackend};
pub use program::{
    MissingBinding, ProgramBindings, ReloadOutcome, ShaderPaths, ShaderProgramManager,
    COLOR_ATTRIBUTE, DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER, MATRIX_UNIFORM,
    POSITION_ATTRIBUTE, TIME_UNIFORM,
};
pub use rotation::{drag_rotation, PointerButtons, RotationController, DEFAULT_DEGREES_PER_PIXEL};
pub use source::{
    generated_fragment_shader, read_source, write_generated_fragment_shader, SourceJoin,
    UNREADABLE_SOURCE,
};
pub use surface::{RedrawHandle, RenderSurface, SurfaceOptions, SurfaceState};
pub use uniforms::setup_matrix;
pub use watch::ShaderWatcher;
