use std::borrow::Cow;

use crate::compile::ShaderStage;
use crate::uniforms::UniformLayout;

/// Compiles GLSL into a wgpu shader module, returning the validation error
/// text instead of panicking through the uncaptured error handler.
pub(crate) fn create_shader_module(
    device: &wgpu::Device,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, String> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(match stage {
            ShaderStage::Vertex => "effect vertex",
            ShaderStage::Fragment => "effect fragment",
        }),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage: stage.to_naga(),
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err.to_string()),
        None => Ok(module),
    }
}

/// GPU objects backing one linked program.
pub(crate) struct ProgramPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub layout: UniformLayout,
    /// CPU copy of the uniform block, uploaded before each draw.
    pub staging: Vec<u8>,
}

impl ProgramPipeline {
    pub(crate) fn new(
        device: &wgpu::Device,
        uniform_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        layout: &UniformLayout,
    ) -> Result<Self, String> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("effect uniforms"),
            size: u64::from(layout.size()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("effect uniform bind group"),
            layout: uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("effect pipeline layout"),
            bind_group_layouts: &[uniform_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("effect pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(err.to_string());
        }

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group,
            layout: layout.clone(),
            staging: vec![0; layout.size() as usize],
        })
    }
}
