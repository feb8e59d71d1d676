//! Program lifecycle and the per-frame uniform binding loop.
//!
//! `RenderEngine` walks `Uninitialized → Acquiring → Ready → Running`, pauses
//! in `ContextLost` until the host reports a restore, and ends in `Disposed`.
//! A surface without a usable GPU ends in `Unsupported`. Every failure in here
//! is logged and kept in [`RenderEngine::last_error`]; none of them tear the
//! host down.

use std::sync::Arc;

use catalog::{uniforms, EffectDefinition, PALETTE_SIZE};
use editor::{ParameterStore, ScalarField};

use crate::compile::{wrap_fragment, ShaderStage, QUAD_VERTICES, VERTEX_SHADER_GLSL};
use crate::context::{BufferId, GraphicsContext, ProgramId, ShaderId, SurfaceSize, UniformLocation};
use crate::error::RenderError;
use crate::runtime::{BoxedTimeSource, FrameScheduler, SystemTimeSource};
use crate::uniforms::{UniformLayout, UniformValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Acquiring,
    Ready,
    Running,
    ContextLost,
    Disposed,
    Unsupported,
}

#[derive(Debug, Clone, Copy)]
struct ProgramObjects {
    program: ProgramId,
    vertex: ShaderId,
    fragment: ShaderId,
}

/// Locations resolved once per program build. A `None` entry means the
/// compiler optimised the uniform away and it is skipped while binding.
#[derive(Debug, Clone)]
struct UniformCache {
    resolution: Option<UniformLocation>,
    time: Option<UniformLocation>,
    palette: [Option<UniformLocation>; PALETTE_SIZE],
    scalars: [(ScalarField, Option<UniformLocation>); 4],
    custom: Vec<Option<UniformLocation>>,
}

impl UniformCache {
    fn resolve<C: GraphicsContext>(
        context: &C,
        program: ProgramId,
        definition: &EffectDefinition,
    ) -> Self {
        let lookup = |name: &str| context.uniform_location(program, name);
        Self {
            resolution: lookup(uniforms::RESOLUTION),
            time: lookup(uniforms::TIME),
            palette: uniforms::PALETTE.map(lookup),
            scalars: ScalarField::ALL.map(|field| (field, lookup(field.uniform_name()))),
            custom: definition
                .custom_parameters
                .iter()
                .map(|parameter| lookup(&parameter.uniform_name))
                .collect(),
        }
    }
}

/// What a single host frame callback did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The quad was drawn and the next frame requested.
    Drawn,
    /// No program is installed yet; the next frame was still requested.
    Blank,
    /// The engine is not running; nothing was touched.
    Skipped,
}

pub struct RenderEngine<C: GraphicsContext, S: FrameScheduler> {
    context: Option<C>,
    scheduler: S,
    clock: BoxedTimeSource,
    state: EngineState,
    /// Definition whose program is currently installed.
    installed: Option<Arc<EffectDefinition>>,
    /// Most recent definition passed to `rebuild`, successful or not.
    requested: Option<Arc<EffectDefinition>>,
    objects: Option<ProgramObjects>,
    quad: Option<BufferId>,
    cache: Option<UniformCache>,
    observed_epoch: Option<u64>,
    pending_size: Option<SurfaceSize>,
    resume_after_restore: bool,
    generation: u64,
    last_error: Option<RenderError>,
}

impl<C: GraphicsContext, S: FrameScheduler> RenderEngine<C, S> {
    pub fn new(context: C, scheduler: S) -> Self {
        Self {
            context: Some(context),
            scheduler,
            clock: Box::new(SystemTimeSource::new()),
            state: EngineState::Uninitialized,
            installed: None,
            requested: None,
            objects: None,
            quad: None,
            cache: None,
            observed_epoch: None,
            pending_size: None,
            resume_after_restore: false,
            generation: 0,
            last_error: None,
        }
    }

    pub fn with_time_source(mut self, clock: BoxedTimeSource) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn last_error(&self) -> Option<&RenderError> {
        self.last_error.as_ref()
    }

    /// Incremented each time a new program is installed.
    pub fn program_generation(&self) -> u64 {
        self.generation
    }

    pub fn installed_effect(&self) -> Option<&str> {
        self.installed.as_deref().map(|definition| definition.id.as_str())
    }

    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut C> {
        self.context.as_mut()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Acquires the GPU context. A missing capability moves the engine to
    /// `Unsupported` permanently and is reported as `CapabilityUnavailable`.
    pub fn initialize(&mut self) -> Result<(), RenderError> {
        if self.state != EngineState::Uninitialized {
            return Ok(());
        }
        self.state = EngineState::Acquiring;
        let Some(context) = self.context.as_mut() else {
            return Err(self.mark_unsupported("no graphics context".into()));
        };
        match context.acquire() {
            Ok(()) => {
                let size = context.surface_size();
                context.set_viewport(size);
                self.state = EngineState::Ready;
                tracing::debug!(width = size.width, height = size.height, "render context ready");
                Ok(())
            }
            Err(err) => Err(self.mark_unsupported(err.to_string())),
        }
    }

    fn mark_unsupported(&mut self, reason: String) -> RenderError {
        let err = RenderError::CapabilityUnavailable(reason);
        tracing::warn!(error = %err, "rendering disabled");
        self.state = EngineState::Unsupported;
        self.last_error = Some(err.clone());
        err
    }

    /// Builds and installs the program for `definition`.
    ///
    /// On failure the previously installed program stays active and the error
    /// is also kept as `last_error`. While the context is lost the request is
    /// remembered and built on restore.
    pub fn rebuild(&mut self, definition: Arc<EffectDefinition>) -> Result<(), RenderError> {
        self.requested = Some(Arc::clone(&definition));
        match self.state {
            EngineState::Ready | EngineState::Running => {}
            EngineState::ContextLost => return Err(RenderError::ContextLost),
            EngineState::Unsupported => {
                return Err(self
                    .last_error
                    .clone()
                    .unwrap_or_else(|| RenderError::CapabilityUnavailable("unsupported".into())))
            }
            EngineState::Uninitialized | EngineState::Acquiring | EngineState::Disposed => {
                return Err(RenderError::Resource(format!(
                    "cannot build a program in state {:?}",
                    self.state
                )))
            }
        }

        match self.build_program(&definition) {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn build_program(&mut self, definition: &Arc<EffectDefinition>) -> Result<(), RenderError> {
        let context = self
            .context
            .as_mut()
            .ok_or_else(|| RenderError::Resource("graphics context released".into()))?;
        let layout = UniformLayout::for_effect(definition);
        let fragment_source = wrap_fragment(definition, &layout);

        let vertex = context
            .compile_shader(ShaderStage::Vertex, VERTEX_SHADER_GLSL)
            .map_err(|log| compile_error(definition, ShaderStage::Vertex, log))?;
        let fragment = match context.compile_shader(ShaderStage::Fragment, &fragment_source) {
            Ok(fragment) => fragment,
            Err(log) => {
                context.delete_shader(vertex);
                return Err(compile_error(definition, ShaderStage::Fragment, log));
            }
        };
        let program = match context.link_program(vertex, fragment, &layout) {
            Ok(program) => program,
            Err(log) => {
                context.delete_shader(vertex);
                context.delete_shader(fragment);
                tracing::error!(effect = %definition.id, %log, "program link failed");
                return Err(RenderError::ProgramLink {
                    effect: definition.id.clone(),
                    log,
                });
            }
        };

        let quad = match self.quad {
            Some(quad) => quad,
            None => match context.create_vertex_buffer(&QUAD_VERTICES) {
                Ok(quad) => quad,
                Err(err) => {
                    context.delete_program(program);
                    context.delete_shader(vertex);
                    context.delete_shader(fragment);
                    return Err(err);
                }
            },
        };
        self.quad = Some(quad);

        if let Some(previous) = self.objects.take() {
            context.delete_program(previous.program);
            context.delete_shader(previous.vertex);
            context.delete_shader(previous.fragment);
        }
        self.objects = Some(ProgramObjects {
            program,
            vertex,
            fragment,
        });
        self.cache = Some(UniformCache::resolve(&*context, program, definition));
        self.installed = Some(Arc::clone(definition));
        self.generation += 1;
        tracing::info!(
            effect = %definition.id,
            generation = self.generation,
            custom = definition.custom_parameters.len(),
            "installed effect program"
        );
        Ok(())
    }

    /// Resets the clock and schedules the first frame.
    pub fn start(&mut self) {
        if self.state != EngineState::Ready {
            return;
        }
        self.clock.restart();
        self.state = EngineState::Running;
        self.scheduler.request_frame();
        tracing::debug!("render loop started");
    }

    /// Host frame callback.
    ///
    /// A selection change in `params` is rebuilt before any uniform is bound,
    /// so a frame never mixes the old program with the new definition's
    /// values.
    pub fn on_frame(&mut self, params: &ParameterStore) -> FrameOutcome {
        if self.state != EngineState::Running {
            return FrameOutcome::Skipped;
        }

        let epoch = params.selection_epoch();
        if self.observed_epoch != Some(epoch) {
            self.observed_epoch = Some(epoch);
            let wanted = params.selection();
            let already_requested = self
                .requested
                .as_ref()
                .is_some_and(|requested| Arc::ptr_eq(requested, wanted));
            if !already_requested {
                // Failures are logged and recorded; the previous program keeps drawing.
                let _ = self.rebuild(Arc::clone(wanted));
            }
        }

        let seconds = self.clock.seconds();
        let outcome = match self.bind_and_draw(params, seconds) {
            Ok(outcome) => outcome,
            Err(RenderError::ContextLost) => {
                self.context_lost();
                return FrameOutcome::Skipped;
            }
            Err(err) => {
                tracing::warn!(error = %err, "frame failed");
                self.last_error = Some(err);
                FrameOutcome::Blank
            }
        };
        self.scheduler.request_frame();
        outcome
    }

    fn bind_and_draw(
        &mut self,
        params: &ParameterStore,
        seconds: f32,
    ) -> Result<FrameOutcome, RenderError> {
        let (Some(context), Some(objects), Some(cache), Some(quad), Some(definition)) = (
            self.context.as_mut(),
            self.objects.as_ref(),
            self.cache.as_ref(),
            self.quad,
            self.installed.as_ref(),
        ) else {
            return Ok(FrameOutcome::Blank);
        };
        let values = params.parameters();
        let size = context.surface_size();

        context.use_program(objects.program);
        let mut bind = |location: Option<UniformLocation>, value: UniformValue| {
            if let Some(location) = location {
                context.set_uniform(location, value);
            }
        };
        bind(
            cache.resolution,
            UniformValue::Vec2([size.width as f32, size.height as f32]),
        );
        bind(cache.time, UniformValue::Float(seconds));
        for (location, color) in cache.palette.iter().zip(values.palette.iter()) {
            bind(*location, UniformValue::Vec3(color.normalized()));
        }
        for (field, location) in cache.scalars {
            bind(location, UniformValue::Float(values.scalar(field)));
        }
        for (location, parameter) in cache.custom.iter().zip(&definition.custom_parameters) {
            bind(*location, UniformValue::Float(values.resolved_custom(parameter)));
        }

        context.draw(quad)?;
        Ok(FrameOutcome::Drawn)
    }

    /// External notification that the device is gone. Pending frames are
    /// cancelled and every handle is forgotten without being touched.
    pub fn context_lost(&mut self) {
        if !matches!(self.state, EngineState::Ready | EngineState::Running) {
            return;
        }
        self.resume_after_restore = self.state == EngineState::Running;
        self.scheduler.cancel_frame();
        self.objects = None;
        self.quad = None;
        self.cache = None;
        self.state = EngineState::ContextLost;
        self.last_error = Some(RenderError::ContextLost);
        tracing::warn!("render context lost; rendering paused");
    }

    /// External notification that the device is available again. The full
    /// build runs before ticking resumes.
    pub fn context_restored(&mut self) -> Result<(), RenderError> {
        if self.state != EngineState::ContextLost {
            return Ok(());
        }
        self.state = EngineState::Acquiring;
        let Some(context) = self.context.as_mut() else {
            return Err(self.mark_unsupported("graphics context released".into()));
        };
        if let Err(err) = context.acquire() {
            return Err(self.mark_unsupported(err.to_string()));
        }
        if let Some(size) = self.pending_size.take() {
            context.set_viewport(size);
        } else {
            let size = context.surface_size();
            context.set_viewport(size);
        }
        self.state = EngineState::Ready;
        self.last_error = None;

        let mut result = Ok(());
        if let Some(requested) = self.requested.clone() {
            result = self.rebuild(Arc::clone(&requested));
            let fallback = self
                .installed
                .clone()
                .filter(|installed| !Arc::ptr_eq(installed, &requested));
            if let (Err(_), Some(installed)) = (&result, fallback) {
                // Bring back the last program that worked before the loss.
                if self.build_program(&installed).is_err() {
                    tracing::warn!(effect = %installed.id, "previous program failed to rebuild");
                }
            }
        }

        if std::mem::take(&mut self.resume_after_restore) {
            self.state = EngineState::Running;
            self.scheduler.request_frame();
        }
        tracing::info!(generation = self.generation, "render context restored");
        result
    }

    /// Updates the surface dimensions and viewport. Never touches the program.
    pub fn resize(&mut self, width: u32, height: u32) {
        let size = SurfaceSize::new(width.max(1), height.max(1));
        match self.state {
            EngineState::Ready | EngineState::Running => {
                if let Some(context) = self.context.as_mut() {
                    context.set_viewport(size);
                }
            }
            EngineState::ContextLost => self.pending_size = Some(size),
            _ => {}
        }
    }

    /// Cancels the pending frame, deletes every GPU object and releases the
    /// context, which is handed back to the caller. Calling it again does
    /// nothing and returns `None`.
    pub fn dispose(&mut self) -> Option<C> {
        if self.state == EngineState::Disposed {
            return None;
        }
        self.scheduler.cancel_frame();
        let live = matches!(self.state, EngineState::Ready | EngineState::Running);
        let mut context = self.context.take();
        if let Some(context) = context.as_mut() {
            if live {
                if let Some(objects) = self.objects.take() {
                    context.delete_program(objects.program);
                    context.delete_shader(objects.vertex);
                    context.delete_shader(objects.fragment);
                }
                if let Some(quad) = self.quad.take() {
                    context.delete_buffer(quad);
                }
            }
            context.release();
        }
        self.objects = None;
        self.quad = None;
        self.cache = None;
        self.state = EngineState::Disposed;
        tracing::debug!("render engine disposed");
        context
    }
}

impl<C: GraphicsContext, S: FrameScheduler> Drop for RenderEngine<C, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn compile_error(definition: &EffectDefinition, stage: ShaderStage, log: String) -> RenderError {
    tracing::warn!(effect = %definition.id, stage = stage.as_str(), %log, "shader compile failed");
    RenderError::ShaderCompile {
        effect: definition.id.clone(),
        stage: stage.as_str(),
        log,
    }
}
