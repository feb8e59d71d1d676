//! wgpu backend for the render engine.
//!
//! - `context` owns instance/adapter/device/surface wiring for one
//!   acquisition and reports device loss through a hook.
//! - `pipeline` turns a shader pair plus uniform layout into a render
//!   pipeline with its own uniform buffer.
//! - `state` implements `GraphicsContext` on top of both.

mod context;
mod pipeline;
mod state;

pub use context::DeviceLostHook;
pub use state::WgpuContext;
