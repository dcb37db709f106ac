use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};

use crate::backend::{AttributeLocation, GpuBackend, ProgramId, UniformLocation, UniformValue};
use crate::compile::{self, ValueKind};
use crate::error::{BackendError, ShaderError};
use crate::uniforms::write_std140;

use super::context::GpuContext;
use super::pipeline::GpuProgram;
use super::GpuOptions;

/// GL default for attribute components that are not streamed.
const DEFAULT_ATTRIBUTE: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

struct Stream {
    components: u32,
    data: Vec<f32>,
}

impl Stream {
    fn vertices(&self) -> u32 {
        if self.components == 0 {
            return 0;
        }
        (self.data.len() / self.components as usize) as u32
    }
}

/// Smallest vertex buffer allocated for an attribute slot, in bytes.
const MIN_VERTEX_BUFFER_BYTES: u64 = 256;

/// Persistent GPU buffer for one attribute location, reused across frames.
struct VertexBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
}

struct Frame {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

/// [`GpuBackend`] that renders into a window surface through wgpu.
pub struct WgpuBackend {
    context: GpuContext,
    programs: HashMap<ProgramId, GpuProgram>,
    next_id: u32,
    bound: Option<ProgramId>,
    streams: HashMap<u32, Stream>,
    vertex_buffers: HashMap<u32, VertexBuffer>,
    enabled: BTreeSet<u32>,
    frame: Option<Frame>,
}

impl WgpuBackend {
    pub fn new<T>(target: T, size: (u32, u32), options: &GpuOptions) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle + Send + Sync + 'static,
    {
        let context = GpuContext::new(target, size, options)?;
        Ok(Self {
            context,
            programs: HashMap::new(),
            next_id: 0,
            bound: None,
            streams: HashMap::new(),
            vertex_buffers: HashMap::new(),
            enabled: BTreeSet::new(),
            frame: None,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.context.config.width, self.context.config.height)
    }

    pub fn sample_count(&self) -> u32 {
        self.context.sample_count
    }

    /// Reconfigures the surface after a `Lost` or `Outdated` frame.
    pub fn recover_surface(&mut self) {
        self.context.reconfigure();
    }

    /// Vertex data for one attribute slot, padded to the slot width. Missing
    /// or disabled arrays read the GL default for every vertex.
    fn attribute_data(&self, location: u32, components: u32, vertices: u32) -> Vec<f32> {
        let stream = self
            .streams
            .get(&location)
            .filter(|_| self.enabled.contains(&location));
        let width = components as usize;
        let mut data = Vec::with_capacity(width * vertices as usize);
        for vertex in 0..vertices as usize {
            for component in 0..width {
                let value = stream
                    .filter(|stream| (component as u32) < stream.components)
                    .and_then(|stream| {
                        stream
                            .data
                            .get(vertex * stream.components as usize + component)
                    })
                    .copied()
                    .unwrap_or(DEFAULT_ATTRIBUTE[component.min(3)]);
                data.push(value);
            }
        }
        data
    }
}

impl GpuBackend for WgpuBackend {
    fn make_current(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn done_current(&mut self) {}

    fn create_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, ShaderError> {
        let translated = compile::build_program(vertex, fragment)?;
        let program = GpuProgram::new(
            &self.context.device,
            translated,
            self.context.surface_format,
            self.context.sample_count,
        )?;
        self.next_id += 1;
        let id = ProgramId(self.next_id);
        debug!(
            program = id.0,
            attributes = program.interface.attributes().len(),
            uniform_bytes = program.interface.uniform_block_size(),
            "created GPU program"
        );
        self.programs.insert(id, program);
        Ok(id)
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if self.bound == Some(program) {
            self.bound = None;
        }
        if let Some(program) = self.programs.remove(&program) {
            program.destroy();
        }
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation> {
        self.programs
            .get(&program)?
            .interface
            .attribute(name)
            .map(|slot| AttributeLocation(slot.location))
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(&program)?
            .interface
            .uniform(name)
            .map(|slot| UniformLocation(slot.offset))
    }

    fn uniform_kind(&self, program: ProgramId, name: &str) -> Option<ValueKind> {
        Some(self.programs.get(&program)?.interface.uniform(name)?.kind)
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<(), BackendError> {
        let texture = self.context.surface.get_current_texture()?;
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("lineframe frame encoder"),
                });

        let [r, g, b, a] = clear_color.map(f64::from);
        let (attachment, resolve_target) = match self.context.msaa_view.as_ref() {
            Some(msaa) => (msaa, Some(&view)),
            None => (&view, None),
        };
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lineframe clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        self.frame = Some(Frame {
            texture,
            view,
            encoder,
        });
        Ok(())
    }

    fn bind_program(&mut self, program: ProgramId) {
        if self.programs.contains_key(&program) {
            self.bound = Some(program);
        } else {
            warn!(program = program.0, "bind of unknown program ignored");
        }
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program) = self.bound.and_then(|id| self.programs.get_mut(&id)) else {
            return;
        };
        let Some(uniforms) = program.uniforms.as_mut() else {
            return;
        };
        if !write_std140(&mut uniforms.data, location.0, value) {
            warn!(offset = location.0, "uniform write outside the uniform block");
        }
    }

    fn set_attribute_array(&mut self, location: AttributeLocation, components: u32, data: &[f32]) {
        let stream = self.streams.entry(location.0).or_insert(Stream {
            components,
            data: Vec::new(),
        });
        stream.components = components;
        stream.data.clear();
        stream.data.extend_from_slice(data);
    }

    fn enable_attribute_array(&mut self, location: AttributeLocation) {
        self.enabled.insert(location.0);
    }

    fn disable_attribute_array(&mut self, location: AttributeLocation) {
        self.enabled.remove(&location.0);
    }

    fn draw_lines(&mut self, first: u32, count: u32) {
        if count == 0 {
            return;
        }
        let Some(program) = self.bound.and_then(|id| self.programs.get(&id)) else {
            warn!("draw without a bound program ignored");
            return;
        };
        if self.frame.is_none() {
            warn!("draw outside a frame ignored");
            return;
        }

        let available = program
            .interface
            .attributes()
            .iter()
            .filter(|slot| self.enabled.contains(&slot.location))
            .filter_map(|slot| self.streams.get(&slot.location))
            .map(Stream::vertices)
            .min()
            .unwrap_or(u32::MAX);
        let end = first.saturating_add(count).min(available);
        if end < first.saturating_add(count) {
            warn!(
                requested = count,
                available,
                "attribute arrays are shorter than the draw; clamping"
            );
        }
        if end <= first {
            return;
        }

        for slot in program.interface.attributes() {
            let data = self.attribute_data(slot.location, slot.kind.components(), end);
            upload_vertex_data(
                &self.context.device,
                &self.context.queue,
                &mut self.vertex_buffers,
                slot.location,
                bytemuck::cast_slice(&data),
            );
        }

        if let Some(uniforms) = program.uniforms.as_ref() {
            self.context
                .queue
                .write_buffer(&uniforms.buffer, 0, &uniforms.data);
        }

        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let (attachment, resolve_target) = match self.context.msaa_view.as_ref() {
            Some(msaa) => (msaa, Some(&frame.view)),
            None => (&frame.view, None),
        };
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lineframe line pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&program.pipeline);
        if let Some(uniforms) = program.uniforms.as_ref() {
            pass.set_bind_group(0, &uniforms.bind_group, &[]);
        }
        for (index, slot) in program.interface.attributes().iter().enumerate() {
            if let Some(vertex) = self.vertex_buffers.get(&slot.location) {
                pass.set_vertex_buffer(index as u32, vertex.buffer.slice(..));
            }
        }
        pass.draw(first..end, 0..1);
    }

    fn release_program(&mut self) {
        self.bound = None;
    }

    fn end_frame(&mut self) -> Result<(), BackendError> {
        let Some(frame) = self.frame.take() else {
            return Ok(());
        };
        let Frame {
            texture, encoder, ..
        } = frame;
        self.context.queue.submit(std::iter::once(encoder.finish()));
        texture.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    fn release_buffers(&mut self) {
        for (_, vertex) in self.vertex_buffers.drain() {
            vertex.buffer.destroy();
        }
        self.streams.clear();
        self.enabled.clear();
        self.frame = None;
    }
}

/// Writes `bytes` into the buffer kept for `location`, replacing it with a
/// larger one first when it is too small.
fn upload_vertex_data(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffers: &mut HashMap<u32, VertexBuffer>,
    location: u32,
    bytes: &[u8],
) {
    let needed = bytes.len() as u64;
    let reuse = buffers
        .get(&location)
        .is_some_and(|vertex| vertex.capacity >= needed);
    if !reuse {
        let capacity = vertex_buffer_capacity(needed);
        debug!(location, capacity, "allocating vertex buffer");
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lineframe attribute buffer"),
            size: capacity,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if let Some(old) = buffers.insert(location, VertexBuffer { buffer, capacity }) {
            old.buffer.destroy();
        }
    }
    if let Some(vertex) = buffers.get(&location) {
        queue.write_buffer(&vertex.buffer, 0, bytes);
    }
}

fn vertex_buffer_capacity(needed: u64) -> u64 {
    needed.next_power_of_two().max(MIN_VERTEX_BUFFER_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_buffers_grow_in_powers_of_two() {
        assert_eq!(vertex_buffer_capacity(0), MIN_VERTEX_BUFFER_BYTES);
        assert_eq!(vertex_buffer_capacity(200), MIN_VERTEX_BUFFER_BYTES);
        assert_eq!(vertex_buffer_capacity(257), 512);
        assert_eq!(vertex_buffer_capacity(4096), 4096);
    }
}
