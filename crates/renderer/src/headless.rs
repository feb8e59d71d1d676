//! A graphics context with no device behind it.
//!
//! Shaders are parsed and validated with naga exactly as the wgpu backend
//! would see them, and linking checks the stage interface and the uniform
//! block layout. Draw calls record the uniform values they would have used,
//! which is what the engine tests and `shaderdeck check` inspect.

use std::collections::{BTreeMap, HashMap};

use wgpu::naga;

use crate::compile::{interface_locations, validate_glsl, ShaderStage};
use crate::context::{
    BufferId, GraphicsContext, ProgramId, ShaderId, SurfaceSize, UniformLocation,
};
use crate::error::RenderError;
use crate::uniforms::{UniformLayout, UniformValue};

struct HeadlessShader {
    stage: ShaderStage,
    module: naga::Module,
}

struct HeadlessProgram {
    layout: UniformLayout,
    values: BTreeMap<String, UniformValue>,
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramId,
    pub viewport: SurfaceSize,
    pub uniforms: BTreeMap<String, UniformValue>,
}

impl DrawRecord {
    pub fn float(&self, name: &str) -> Option<f32> {
        match self.uniforms.get(name) {
            Some(UniformValue::Float(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn vec3(&self, name: &str) -> Option<[f32; 3]> {
        match self.uniforms.get(name) {
            Some(UniformValue::Vec3(value)) => Some(*value),
            _ => None,
        }
    }
}

pub struct HeadlessContext {
    size: SurfaceSize,
    viewport: SurfaceSize,
    available: bool,
    acquired: bool,
    next_id: u32,
    shaders: HashMap<ShaderId, HeadlessShader>,
    programs: HashMap<ProgramId, HeadlessProgram>,
    buffers: HashMap<BufferId, usize>,
    current: Option<ProgramId>,
    draws: Vec<DrawRecord>,
    calls_while_lost: usize,
    leaked_at_release: Option<usize>,
    acquisitions: usize,
}

impl HeadlessContext {
    pub fn new(width: u32, height: u32) -> Self {
        let size = SurfaceSize::new(width.max(1), height.max(1));
        Self {
            size,
            viewport: size,
            available: true,
            acquired: false,
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            current: None,
            draws: Vec::new(),
            calls_while_lost: 0,
            leaked_at_release: None,
            acquisitions: 0,
        }
    }

    /// A context whose `acquire` always fails, standing in for a surface
    /// without GPU support.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(1, 1)
        }
    }

    /// Invalidates every object as a driver reset would. Later calls are
    /// counted in [`calls_while_lost`](Self::calls_while_lost) until the next
    /// successful `acquire`.
    pub fn simulate_loss(&mut self) {
        self.acquired = false;
        self.shaders.clear();
        self.programs.clear();
        self.buffers.clear();
        self.current = None;
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn last_draw(&self) -> Option<&DrawRecord> {
        self.draws.last()
    }

    pub fn viewport(&self) -> SurfaceSize {
        self.viewport
    }

    pub fn live_objects(&self) -> usize {
        self.shaders.len() + self.programs.len() + self.buffers.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn calls_while_lost(&self) -> usize {
        self.calls_while_lost
    }

    /// Objects still alive when `release` was called, if it was.
    pub fn leaked_at_release(&self) -> Option<usize> {
        self.leaked_at_release
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions
    }

    fn next_raw(&mut self) -> u32 {
        let raw = self.next_id;
        self.next_id += 1;
        raw
    }

    fn touch(&mut self) -> bool {
        if !self.acquired {
            self.calls_while_lost += 1;
        }
        self.acquired
    }
}

impl GraphicsContext for HeadlessContext {
    fn acquire(&mut self) -> Result<(), RenderError> {
        if !self.available {
            return Err(RenderError::CapabilityUnavailable(
                "headless context configured without a device".into(),
            ));
        }
        self.acquired = true;
        self.acquisitions += 1;
        Ok(())
    }

    fn surface_size(&self) -> SurfaceSize {
        self.size
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        if !self.touch() {
            return Err("context is lost".into());
        }
        let module = validate_glsl(stage, source)?;
        let id = ShaderId::from_raw(self.next_raw());
        self.shaders.insert(id, HeadlessShader { stage, module });
        Ok(id)
    }

    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
        layout: &UniformLayout,
    ) -> Result<ProgramId, String> {
        if !self.touch() {
            return Err("context is lost".into());
        }
        let vertex_shader = self
            .shaders
            .get(&vertex)
            .filter(|shader| shader.stage == ShaderStage::Vertex)
            .ok_or("vertex shader handle is not a live vertex shader")?;
        let fragment_shader = self
            .shaders
            .get(&fragment)
            .filter(|shader| shader.stage == ShaderStage::Fragment)
            .ok_or("fragment shader handle is not a live fragment shader")?;

        let outputs = interface_locations(&vertex_shader.module, ShaderStage::Vertex);
        let inputs = interface_locations(&fragment_shader.module, ShaderStage::Fragment);
        if let Some(missing) = inputs.iter().find(|location| !outputs.contains(location)) {
            return Err(format!(
                "fragment input at location {missing} is not written by the vertex stage"
            ));
        }
        check_uniform_block(&fragment_shader.module, layout)?;

        let id = ProgramId::from_raw(self.next_raw());
        self.programs.insert(
            id,
            HeadlessProgram {
                layout: layout.clone(),
                values: BTreeMap::new(),
            },
        );
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
        if !self.touch() {
            return Err(RenderError::ContextLost);
        }
        let id = BufferId::from_raw(self.next_raw());
        self.buffers.insert(id, vertices.len());
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        if self.touch() {
            self.current = Some(program);
        }
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if !self.touch() {
            return;
        }
        let Some(program) = self.current.and_then(|id| self.programs.get_mut(&id)) else {
            return;
        };
        if let Some(slot) = program.layout.slots().get(location.raw() as usize) {
            if slot.kind == value.kind() {
                program.values.insert(slot.name.clone(), value);
            } else {
                tracing::warn!(uniform = %slot.name, "uniform set with mismatched type");
            }
        }
    }

    fn draw(&mut self, buffer: BufferId) -> Result<(), RenderError> {
        if !self.touch() {
            return Err(RenderError::ContextLost);
        }
        let vertex_count = self
            .buffers
            .get(&buffer)
            .copied()
            .ok_or_else(|| RenderError::Resource("draw with an unknown vertex buffer".into()))?;
        if vertex_count != 4 {
            return Err(RenderError::Resource(format!(
                "quad buffer holds {vertex_count} vertices"
            )));
        }
        let program_id = self
            .current
            .ok_or_else(|| RenderError::Resource("draw without a program in use".into()))?;
        let program = self
            .programs
            .get(&program_id)
            .ok_or_else(|| RenderError::Resource("program in use was deleted".into()))?;
        self.draws.push(DrawRecord {
            program: program_id,
            viewport: self.viewport,
            uniforms: program.values.clone(),
        });
        Ok(())
    }

    fn set_viewport(&mut self, size: SurfaceSize) {
        if self.touch() {
            self.size = size;
            self.viewport = size;
        }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if self.touch() {
            self.shaders.remove(&shader);
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.touch() {
            self.programs.remove(&program);
            if self.current == Some(program) {
                self.current = None;
            }
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.touch() {
            self.buffers.remove(&buffer);
        }
    }

    fn release(&mut self) {
        self.leaked_at_release = Some(self.live_objects());
        self.acquired = false;
        self.shaders.clear();
        self.programs.clear();
        self.buffers.clear();
        self.current = None;
    }
}

/// Compares the member offsets naga computed for the fragment shader's
/// uniform block against the layout the engine writes with.
fn check_uniform_block(module: &naga::Module, layout: &UniformLayout) -> Result<(), String> {
    let block = module.global_variables.iter().find_map(|(_, variable)| {
        match (&variable.space, &module.types[variable.ty].inner) {
            (naga::AddressSpace::Uniform, naga::TypeInner::Struct { members, .. }) => Some(members),
            _ => None,
        }
    });
    let Some(members) = block else {
        return Err("fragment shader declares no uniform block".into());
    };

    for slot in layout.slots() {
        let expected = format!("_{}", slot.name);
        let member = members
            .iter()
            .find(|member| member.name.as_deref() == Some(expected.as_str()))
            .ok_or_else(|| format!("uniform block has no member for {}", slot.name))?;
        if member.offset != slot.offset {
            return Err(format!(
                "uniform {} sits at offset {} in the shader but {} in the layout",
                slot.name, member.offset, slot.offset
            ));
        }
    }
    Ok(())
}
