use anyhow::Result;
use overlay::{CompileError, ShaderStage};

use crate::compile::{fragment_module_descriptor, vertex_module_descriptor, AssembledProgram};
use crate::uniforms::RegionUniforms;

/// Objects shared by every region pipeline.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub vertex_module: wgpu::ShaderModule,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("region uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<RegionUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("region pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex_module = device.create_shader_module(vertex_module_descriptor());
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(CompileError::Compile {
                stage: ShaderStage::Vertex,
                log: error.to_string(),
            }
            .into());
        }

        Ok(Self {
            uniform_layout,
            pipeline_layout,
            vertex_module,
        })
    }
}

/// Compiles the fragment stage and links it with the shared vertex stage.
///
/// Validation errors are captured through error scopes so a broken
/// visualization reports a [`CompileError`] instead of aborting the device.
pub(crate) fn build_region_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    format: wgpu::TextureFormat,
    label: &str,
    program: &AssembledProgram,
) -> Result<wgpu::RenderPipeline, CompileError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let fragment_module = device.create_shader_module(fragment_module_descriptor(label, program));
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(CompileError::Compile {
            stage: ShaderStage::Fragment,
            log: error.to_string(),
        });
    }

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layouts.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &layouts.vertex_module,
            entry_point: Some("main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: (2 * std::mem::size_of::<f32>()) as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(CompileError::Link(error.to_string()));
    }
    Ok(pipeline)
}
