use std::collections::HashMap;
use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;

use crate::compile::ShaderStage;
use crate::context::{
    BufferId, GraphicsContext, ProgramId, ShaderId, SurfaceSize, UniformLocation,
};
use crate::error::RenderError;
use crate::types::{AdapterProfile, GpuPowerPreference, PresentPreference};
use crate::uniforms::{UniformLayout, UniformValue};

use super::context::{DeviceLostHook, DeviceState};
use super::pipeline::{create_shader_module, ProgramPipeline};

struct CompiledShader {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
}

struct QuadBuffer {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

/// [`GraphicsContext`] backed by a wgpu device presenting to a window.
///
/// Uniform writes land in a CPU copy of the program's std140 block, which is
/// uploaded in one `write_buffer` right before the draw.
pub struct WgpuContext<W> {
    target: Arc<W>,
    size: SurfaceSize,
    power: GpuPowerPreference,
    present: PresentPreference,
    lost_hook: Option<DeviceLostHook>,
    device: Option<DeviceState>,
    next_id: u32,
    shaders: HashMap<ShaderId, CompiledShader>,
    programs: HashMap<ProgramId, ProgramPipeline>,
    buffers: HashMap<BufferId, QuadBuffer>,
    current: Option<ProgramId>,
}

impl<W> WgpuContext<W>
where
    W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
{
    pub fn new(target: Arc<W>, size: SurfaceSize) -> Self {
        Self {
            target,
            size,
            power: GpuPowerPreference::default(),
            present: PresentPreference::default(),
            lost_hook: None,
            device: None,
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            current: None,
        }
    }

    pub fn with_preferences(mut self, power: GpuPowerPreference, present: PresentPreference) -> Self {
        self.power = power;
        self.present = present;
        self
    }

    /// Registers the callback that turns a wgpu device loss into the host's
    /// context-lost notification.
    pub fn with_device_lost_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.lost_hook = Some(Arc::new(hook));
        self
    }

    pub fn adapter_profile(&self) -> Option<&AdapterProfile> {
        self.device.as_ref().map(|state| &state.adapter_profile)
    }

    fn next_raw(&mut self) -> u32 {
        let raw = self.next_id;
        self.next_id += 1;
        raw
    }

    fn forget_objects(&mut self) {
        self.shaders.clear();
        self.programs.clear();
        self.buffers.clear();
        self.current = None;
    }
}

impl<W> GraphicsContext for WgpuContext<W>
where
    W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
{
    fn acquire(&mut self) -> Result<(), RenderError> {
        // Objects from a previous device are invalid; drop them first so
        // the old surface is gone before a new one binds to the window.
        self.forget_objects();
        self.device = None;
        let state = DeviceState::new(
            Arc::clone(&self.target),
            self.size,
            self.power,
            self.present,
            self.lost_hook.clone(),
        )
        .map_err(RenderError::CapabilityUnavailable)?;
        tracing::info!(
            adapter = %state.adapter_profile.name,
            backend = %state.adapter_profile.backend,
            "acquired GPU device"
        );
        self.device = Some(state);
        Ok(())
    }

    fn surface_size(&self) -> SurfaceSize {
        self.size
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        // naga gives far better diagnostics than the wgpu error scope.
        crate::compile::validate_glsl(stage, source)?;
        let state = self.device.as_ref().ok_or("no GPU device")?;
        let module = create_shader_module(&state.device, stage, source)?;
        let id = ShaderId::from_raw(self.next_raw());
        self.shaders.insert(id, CompiledShader { stage, module });
        Ok(id)
    }

    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
        layout: &UniformLayout,
    ) -> Result<ProgramId, String> {
        let state = self.device.as_ref().ok_or("no GPU device")?;
        let vertex = self
            .shaders
            .get(&vertex)
            .filter(|shader| shader.stage == ShaderStage::Vertex)
            .ok_or("vertex shader handle is not a live vertex shader")?;
        let fragment = self
            .shaders
            .get(&fragment)
            .filter(|shader| shader.stage == ShaderStage::Fragment)
            .ok_or("fragment shader handle is not a live fragment shader")?;
        let pipeline = ProgramPipeline::new(
            &state.device,
            &state.uniform_layout,
            state.config.format,
            &vertex.module,
            &fragment.module,
            layout,
        )?;
        let id = ProgramId::from_raw(self.next_raw());
        self.programs.insert(id, pipeline);
        Ok(id)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let program = self.programs.get(&program)?;
        program
            .layout
            .slots()
            .iter()
            .position(|slot| slot.name == name)
            .map(|index| UniformLocation::from_raw(index as u32))
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> Result<BufferId, RenderError> {
        let state = self.device.as_ref().ok_or(RenderError::ContextLost)?;
        let buffer = state
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("full-screen quad"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = BufferId::from_raw(self.next_raw());
        self.buffers.insert(
            id,
            QuadBuffer {
                buffer,
                vertex_count: vertices.len() as u32,
            },
        );
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        if self.programs.contains_key(&program) {
            self.current = Some(program);
        }
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program) = self.current.and_then(|id| self.programs.get_mut(&id)) else {
            return;
        };
        if let Some(slot) = program.layout.slots().get(location.raw() as usize) {
            let offset = slot.offset;
            value.write_std140(&mut program.staging, offset);
        }
    }

    fn draw(&mut self, buffer: BufferId) -> Result<(), RenderError> {
        let state = self.device.as_ref().ok_or(RenderError::ContextLost)?;
        let program = self
            .current
            .and_then(|id| self.programs.get(&id))
            .ok_or_else(|| RenderError::Resource("draw without a program in use".into()))?;
        let quad = self
            .buffers
            .get(&buffer)
            .ok_or_else(|| RenderError::Resource("draw with an unknown vertex buffer".into()))?;

        let frame = match state.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                state.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("surface timeout; skipping frame");
                return Ok(());
            }
            Err(other) => return Err(RenderError::Resource(format!("surface error: {other}"))),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        state
            .queue
            .write_buffer(&program.uniform_buffer, 0, &program.staging);

        let mut encoder = state
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("effect frame"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("effect pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, &program.bind_group, &[]);
            render_pass.set_vertex_buffer(0, quad.buffer.slice(..));
            render_pass.draw(0..quad.vertex_count, 0..1);
        }
        state.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn set_viewport(&mut self, size: SurfaceSize) {
        self.size = size;
        if let Some(state) = self.device.as_mut() {
            state.resize(size);
        }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.current == Some(program) {
            self.current = None;
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(quad) = self.buffers.remove(&buffer) {
            quad.buffer.destroy();
        }
    }

    fn release(&mut self) {
        self.forget_objects();
        self.device = None;
        tracing::debug!("released GPU device");
    }
}
