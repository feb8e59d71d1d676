//! The graphics surface the render engine drives.
//!
//! The trait mirrors the shape of a GL-style API: shader and program objects
//! behind plain integer handles, named uniform lookups, one vertex buffer and
//! a draw call. Handles are only meaningful to the context that issued them
//! and become invalid once the context is lost or released.

use crate::compile::ShaderStage;
use crate::error::RenderError;
use crate::uniforms::{UniformLayout, UniformValue};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// Compiled shader object.
    ShaderId
);
handle!(
    /// Linked program object.
    ProgramId
);
handle!(
    /// Vertex buffer object.
    BufferId
);
handle!(
    /// Resolved uniform location within the program it was looked up on.
    UniformLocation
);

/// Drawable surface dimensions in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub trait GraphicsContext {
    /// Obtains the device for the target surface. Called once on
    /// initialisation and again after a context restore.
    fn acquire(&mut self) -> Result<(), RenderError>;

    fn surface_size(&self) -> SurfaceSize;

    /// Compiles one stage. The error is the compiler's diagnostic log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;

    /// Links a vertex and fragment shader against the uniform block layout.
    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
        layout: &UniformLayout,
    ) -> Result<ProgramId, String>;

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> Result<BufferId, RenderError>;

    fn use_program(&mut self, program: ProgramId);

    /// Sets a uniform on the program last passed to `use_program`.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Draws `buffer` as a triangle strip with the current program.
    fn draw(&mut self, buffer: BufferId) -> Result<(), RenderError>;

    fn set_viewport(&mut self, size: SurfaceSize);

    fn delete_shader(&mut self, shader: ShaderId);

    fn delete_program(&mut self, program: ProgramId);

    fn delete_buffer(&mut self, buffer: BufferId);

    /// Drops every device object. Handles issued earlier must not be used.
    fn release(&mut self);
}
