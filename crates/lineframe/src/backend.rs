use glam::Mat4;

use crate::compile::ValueKind;
use crate::error::{BackendError, ShaderError};

/// Opaque handle to a linked program owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Resolved vertex attribute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeLocation(pub u32);

/// Resolved uniform slot: byte offset inside the program's uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Value written to a uniform slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Mat4(Mat4),
}

/// The GPU operations a [`RenderSurface`](crate::RenderSurface) needs.
///
/// The shape follows the classic bind/upload/draw/release sequence so the
/// surface can enforce its per-frame ordering in one place. Every method must
/// be called from the thread that owns the rendering context.
pub trait GpuBackend {
    /// Makes the rendering context current before resource management.
    fn make_current(&mut self) -> Result<(), BackendError>;
    fn done_current(&mut self);

    /// Compiles and links a program from legacy GLSL vertex/fragment sources.
    fn create_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, ShaderError>;
    /// Releases a program and every GPU object created for it.
    fn destroy_program(&mut self, program: ProgramId);
    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    /// Declared GLSL type of a uniform.
    fn uniform_kind(&self, program: ProgramId, name: &str) -> Option<ValueKind>;

    /// Starts a frame by clearing the colour buffer.
    fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<(), BackendError>;
    fn bind_program(&mut self, program: ProgramId);
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);
    /// Streams tightly packed `f32` data for one attribute.
    fn set_attribute_array(&mut self, location: AttributeLocation, components: u32, data: &[f32]);
    fn enable_attribute_array(&mut self, location: AttributeLocation);
    fn disable_attribute_array(&mut self, location: AttributeLocation);
    /// Draws `count` vertices starting at `first` as a line list.
    fn draw_lines(&mut self, first: u32, count: u32);
    fn release_program(&mut self);
    /// Finishes the frame and presents it.
    fn end_frame(&mut self) -> Result<(), BackendError>;

    fn resize(&mut self, width: u32, height: u32);
    /// Drops streamed vertex data; called during teardown.
    fn release_buffers(&mut self);
}
