//! Renderer crate for shaderdeck.
//!
//! The engine owns the program lifecycle for the selected effect and binds
//! the live parameters every frame. Device access sits behind
//! [`GraphicsContext`], so the same state machine drives the wgpu preview
//! window and the headless checker:
//!
//! ```text
//!   ParameterStore ──▶ RenderEngine::on_frame ──▶ GraphicsContext
//!                          ▲        │                 ├─ WgpuContext (window)
//!                          │        └─ request_frame  └─ HeadlessContext (naga only)
//!                     FrameScheduler
//! ```
//!
//! Effect bodies are wrapped into GLSL 450 with a single std140 uniform block
//! whose layout is computed in [`uniforms`].

mod compile;
mod context;
mod engine;
mod error;
mod gpu;
mod headless;
mod runtime;
mod types;
pub mod uniforms;
mod window;

use std::sync::Arc;

use catalog::EffectCatalog;
use editor::ParameterStore;

pub use compile::{validate_glsl, wrap_fragment, ShaderStage, QUAD_VERTICES, VERTEX_SHADER_GLSL};
pub use context::{BufferId, GraphicsContext, ProgramId, ShaderId, SurfaceSize, UniformLocation};
pub use engine::{EngineState, FrameOutcome, RenderEngine};
pub use error::RenderError;
pub use gpu::{DeviceLostHook, WgpuContext};
pub use headless::{DrawRecord, HeadlessContext};
pub use runtime::{
    BoxedTimeSource, FixedTimeSource, FrameScheduler, ManualScheduler, SystemTimeSource, TimeSource,
};
pub use types::{AdapterProfile, GpuPowerPreference, PresentPreference, RendererConfig};
pub use uniforms::{UniformKind, UniformLayout, UniformSlot, UniformValue};
pub use window::run_preview;

/// Result of building and drawing one effect without a device.
#[derive(Debug, Clone)]
pub struct EffectReport {
    pub id: String,
    pub display_name: String,
    pub uniform_bytes: u32,
    pub outcome: Result<(), RenderError>,
}

impl EffectReport {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Compiles, links and draws one frame of every catalog effect against a
/// [`HeadlessContext`] with default parameters.
pub fn check_catalog(catalog: &EffectCatalog, width: u32, height: u32) -> Vec<EffectReport> {
    catalog
        .list()
        .iter()
        .map(|definition| {
            let layout = UniformLayout::for_effect(definition);
            let outcome = check_effect(Arc::clone(definition), width, height);
            match &outcome {
                Ok(()) => tracing::debug!(effect = %definition.id, "effect check passed"),
                Err(err) => tracing::warn!(effect = %definition.id, error = %err, "effect check failed"),
            }
            EffectReport {
                id: definition.id.clone(),
                display_name: definition.display_name.clone(),
                uniform_bytes: layout.size(),
                outcome,
            }
        })
        .collect()
}

fn check_effect(
    definition: Arc<catalog::EffectDefinition>,
    width: u32,
    height: u32,
) -> Result<(), RenderError> {
    let params = ParameterStore::new(Arc::clone(&definition));
    let mut engine = RenderEngine::new(HeadlessContext::new(width, height), ManualScheduler::new())
        .with_time_source(Box::new(FixedTimeSource::new(0.0)));
    engine.initialize()?;
    engine.rebuild(definition)?;
    engine.start();
    match engine.on_frame(&params) {
        FrameOutcome::Drawn => Ok(()),
        other => Err(engine.last_error().cloned().unwrap_or_else(|| {
            RenderError::Resource(format!("frame ended as {other:?} instead of drawing"))
        })),
    }
}
