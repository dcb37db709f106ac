//! A [`GpuBackend`] that never touches a GPU.
//!
//! Programs still go through the full translate-and-validate path, so a
//! shader that builds here builds on the wgpu backend too. Every call is
//! appended to a log that tests and the `check` command inspect.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::backend::{AttributeLocation, GpuBackend, ProgramId, UniformLocation, UniformValue};
use crate::compile::{self, ProgramInterface, ValueKind};
use crate::error::{BackendError, ShaderError};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    MakeCurrent,
    DoneCurrent,
    CreateProgram(ProgramId),
    CreateProgramFailed,
    DestroyProgram(ProgramId),
    BeginFrame([f32; 4]),
    BindProgram(ProgramId),
    SetUniform(UniformLocation, UniformValue),
    SetAttributeArray {
        location: AttributeLocation,
        components: u32,
        len: usize,
    },
    EnableAttributeArray(AttributeLocation),
    DisableAttributeArray(AttributeLocation),
    DrawLines { first: u32, count: u32 },
    ReleaseProgram,
    EndFrame,
    Resize { width: u32, height: u32 },
    ReleaseBuffers,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    programs: HashMap<ProgramId, ProgramInterface>,
    destroyed: Vec<ProgramId>,
    enabled: BTreeSet<u32>,
    bound: Option<ProgramId>,
    next_id: u32,
    size: (u32, u32),
    pending_frame_error: Option<wgpu::SurfaceError>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Programs created and not yet destroyed.
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn destroyed_programs(&self) -> &[ProgramId] {
        &self.destroyed
    }

    pub fn interface(&self, program: ProgramId) -> Option<&ProgramInterface> {
        self.programs.get(&program)
    }

    pub fn enabled_attribute_arrays(&self) -> impl Iterator<Item = AttributeLocation> + '_ {
        self.enabled.iter().copied().map(AttributeLocation)
    }

    pub fn bound_program(&self) -> Option<ProgramId> {
        self.bound
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Makes the next `begin_frame` fail with `error`.
    pub fn fail_next_frame(&mut self, error: wgpu::SurfaceError) {
        self.pending_frame_error = Some(error);
    }

    /// Every `count` passed to `draw_lines`, in order.
    pub fn draw_counts(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::DrawLines { count, .. } => Some(*count),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }
}

impl GpuBackend for RecordingBackend {
    fn make_current(&mut self) -> Result<(), BackendError> {
        self.calls.push(BackendCall::MakeCurrent);
        Ok(())
    }

    fn done_current(&mut self) {
        self.calls.push(BackendCall::DoneCurrent);
    }

    fn create_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, ShaderError> {
        let translated = match compile::build_program(vertex, fragment) {
            Ok(translated) => translated,
            Err(err) => {
                self.calls.push(BackendCall::CreateProgramFailed);
                return Err(err);
            }
        };
        self.next_id += 1;
        let id = ProgramId(self.next_id);
        debug!(program = id.0, "recorded program creation");
        self.programs.insert(id, translated.interface);
        self.calls.push(BackendCall::CreateProgram(id));
        Ok(id)
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() {
            self.destroyed.push(program);
        }
        if self.bound == Some(program) {
            self.bound = None;
        }
        self.calls.push(BackendCall::DestroyProgram(program));
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation> {
        self.programs
            .get(&program)?
            .attribute(name)
            .map(|slot| AttributeLocation(slot.location))
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(&program)?
            .uniform(name)
            .map(|slot| UniformLocation(slot.offset))
    }

    fn uniform_kind(&self, program: ProgramId, name: &str) -> Option<ValueKind> {
        Some(self.programs.get(&program)?.uniform(name)?.kind)
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<(), BackendError> {
        if let Some(err) = self.pending_frame_error.take() {
            return Err(BackendError::Surface(err));
        }
        self.calls.push(BackendCall::BeginFrame(clear_color));
        Ok(())
    }

    fn bind_program(&mut self, program: ProgramId) {
        self.bound = Some(program);
        self.calls.push(BackendCall::BindProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.calls.push(BackendCall::SetUniform(location, value));
    }

    fn set_attribute_array(&mut self, location: AttributeLocation, components: u32, data: &[f32]) {
        self.calls.push(BackendCall::SetAttributeArray {
            location,
            components,
            len: data.len(),
        });
    }

    fn enable_attribute_array(&mut self, location: AttributeLocation) {
        self.enabled.insert(location.0);
        self.calls.push(BackendCall::EnableAttributeArray(location));
    }

    fn disable_attribute_array(&mut self, location: AttributeLocation) {
        self.enabled.remove(&location.0);
        self.calls.push(BackendCall::DisableAttributeArray(location));
    }

    fn draw_lines(&mut self, first: u32, count: u32) {
        self.calls.push(BackendCall::DrawLines { first, count });
    }

    fn release_program(&mut self) {
        self.bound = None;
        self.calls.push(BackendCall::ReleaseProgram);
    }

    fn end_frame(&mut self) -> Result<(), BackendError> {
        self.calls.push(BackendCall::EndFrame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.calls.push(BackendCall::Resize { width, height });
    }

    fn release_buffers(&mut self) {
        self.calls.push(BackendCall::ReleaseBuffers);
    }
}
