use std::borrow::Cow;

use crate::compile::{ProgramInterface, ShaderStage, TranslatedProgram, ValueKind};
use crate::error::ShaderError;

/// GPU objects for one linked program.
pub(crate) struct GpuProgram {
    pub interface: ProgramInterface,
    pub pipeline: wgpu::RenderPipeline,
    pub uniforms: Option<UniformBlock>,
}

/// Host copy of the program's uniform block plus its GPU buffer.
pub(crate) struct UniformBlock {
    pub data: Vec<u8>,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl GpuProgram {
    /// Creates shader modules and the line-list pipeline. Device-side
    /// rejection is captured through a validation error scope.
    pub fn new(
        device: &wgpu::Device,
        translated: TranslatedProgram,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Result<Self, ShaderError> {
        let TranslatedProgram {
            vertex,
            fragment,
            interface,
        } = translated;

        let formats = interface
            .attributes()
            .iter()
            .map(|slot| {
                vertex_format(slot.kind).ok_or_else(|| {
                    ShaderError::Link(format!(
                        "attribute `{}` has unsupported type `{}`",
                        slot.name, slot.kind
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = shader_module(device, ShaderStage::Vertex, vertex);
        let fragment_module = shader_module(device, ShaderStage::Fragment, fragment);

        let block_size = interface.uniform_block_size();
        let uniform_layout = (block_size > 0).then(|| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("lineframe uniform layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            })
        });
        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = uniform_layout.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lineframe pipeline layout"),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = interface
            .attributes()
            .iter()
            .zip(&formats)
            .map(|(slot, format)| {
                [wgpu::VertexAttribute {
                    format: *format,
                    offset: 0,
                    shader_location: slot.location,
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = attributes
            .iter()
            .zip(&formats)
            .map(|(attribute, format)| wgpu::VertexBufferLayout {
                array_stride: format.size(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attribute,
            })
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lineframe pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(color_target(surface_format))],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let uniforms = uniform_layout.map(|layout| {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("lineframe uniform buffer"),
                size: u64::from(block_size),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("lineframe uniform bind group"),
                layout: &layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            UniformBlock {
                data: vec![0; block_size as usize],
                buffer,
                bind_group,
            }
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Device(err.to_string()));
        }

        Ok(Self {
            interface,
            pipeline,
            uniforms,
        })
    }

    /// Releases the GPU buffer eagerly; the pipeline goes with `self`.
    pub fn destroy(self) {
        if let Some(uniforms) = self.uniforms {
            uniforms.buffer.destroy();
        }
    }
}

fn shader_module(device: &wgpu::Device, stage: ShaderStage, source: String) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(match stage {
            ShaderStage::Vertex => "lineframe vertex shader",
            ShaderStage::Fragment => "lineframe fragment shader",
        }),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source),
            stage: stage.to_naga(),
            defines: &[],
        },
    })
}

/// Fragment output overwrites the target; blending stays off.
fn color_target(format: wgpu::TextureFormat) -> wgpu::ColorTargetState {
    wgpu::ColorTargetState {
        format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
    }
}

pub(crate) fn vertex_format(kind: ValueKind) -> Option<wgpu::VertexFormat> {
    match kind {
        ValueKind::Float => Some(wgpu::VertexFormat::Float32),
        ValueKind::Vec2 => Some(wgpu::VertexFormat::Float32x2),
        ValueKind::Vec3 => Some(wgpu::VertexFormat::Float32x3),
        ValueKind::Vec4 => Some(wgpu::VertexFormat::Float32x4),
        ValueKind::Int | ValueKind::UInt | ValueKind::Mat4 => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translucent_output_is_written_unblended() {
        let target = color_target(wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(target.blend, Some(wgpu::BlendState::REPLACE));
        assert_eq!(target.write_mask, wgpu::ColorWrites::ALL);
    }

    #[test]
    fn only_float_attributes_have_vertex_formats() {
        assert_eq!(vertex_format(ValueKind::Vec2), Some(wgpu::VertexFormat::Float32x2));
        assert_eq!(vertex_format(ValueKind::Mat4), None);
    }
}
