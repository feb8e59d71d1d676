use std::sync::Arc;

use catalog::{EffectCatalog, EffectDefinition};
use editor::{ParameterStore, ScalarField};
use renderer::{
    check_catalog, EngineState, FixedTimeSource, FrameOutcome, HeadlessContext, ManualScheduler,
    RenderEngine, RenderError, SurfaceSize, UniformValue,
};

type TestEngine = RenderEngine<HeadlessContext, ManualScheduler>;

fn engine(width: u32, height: u32) -> TestEngine {
    RenderEngine::new(HeadlessContext::new(width, height), ManualScheduler::new())
        .with_time_source(Box::new(FixedTimeSource::new(1.5)))
}

fn running(effect: &str) -> (EffectCatalog, ParameterStore, TestEngine) {
    let catalog = EffectCatalog::builtin().unwrap();
    let params = ParameterStore::new(catalog.get(effect).unwrap());
    let mut engine = engine(800, 600);
    engine.initialize().unwrap();
    engine.rebuild(Arc::clone(params.selection())).unwrap();
    engine.start();
    (catalog, params, engine)
}

fn ctx(engine: &TestEngine) -> &HeadlessContext {
    engine.context().unwrap()
}

#[test]
fn first_frame_binds_defaults_for_plasma() {
    let (_, params, mut engine) = running("plasma");
    assert_eq!(engine.state(), EngineState::Running);
    assert!(engine.scheduler_mut().take_pending());

    assert_eq!(engine.on_frame(&params), FrameOutcome::Drawn);
    let draw = ctx(&engine).last_draw().unwrap();
    assert_eq!(draw.float("u_frequency"), Some(3.0));
    assert_eq!(draw.float("u_time"), Some(1.5));
    assert_eq!(draw.float("u_complexity"), Some(3.0));
    assert_eq!(draw.float("u_zoom"), Some(1.0));
    assert_eq!(draw.vec3("u_color3"), Some([0.8, 1.0, 0.0]));
    assert_eq!(
        draw.uniforms.get("u_resolution"),
        Some(&UniformValue::Vec2([800.0, 600.0]))
    );
    assert!(engine.scheduler().is_pending());
}

#[test]
fn parameter_edits_reach_the_next_frame_without_rebuilding() {
    let (_, mut params, mut engine) = running("plasma");
    engine.on_frame(&params);

    params.set_custom_value("frequency", 5.0).unwrap();
    params.set_scalar(ScalarField::Speed, 2.0);
    engine.on_frame(&params);

    let draw = ctx(&engine).last_draw().unwrap();
    assert_eq!(draw.float("u_frequency"), Some(5.0));
    assert_eq!(draw.float("u_speed"), Some(2.0));
    assert_eq!(engine.program_generation(), 1);
}

#[test]
fn selection_change_rebuilds_before_binding() {
    let (catalog, mut params, mut engine) = running("plasma");
    engine.on_frame(&params);

    params.set_selection(&catalog, "aurora").unwrap();
    assert_eq!(engine.on_frame(&params), FrameOutcome::Drawn);

    assert_eq!(engine.installed_effect(), Some("aurora"));
    assert_eq!(engine.program_generation(), 2);
    let draw = ctx(&engine).last_draw().unwrap();
    assert_eq!(draw.float("u_band_count"), Some(4.0));
    assert_eq!(draw.float("u_shimmer"), Some(0.35));
    assert_eq!(draw.float("u_frequency"), None);
    assert_eq!(ctx(&engine).live_programs(), 1);
}

#[test]
fn compile_failure_keeps_previous_program() {
    let (_, params, mut engine) = running("plasma");
    engine.on_frame(&params);

    let broken = Arc::new(EffectDefinition {
        id: "broken".into(),
        display_name: "Broken".into(),
        description: None,
        fragment_source: "vec4 effect(vec2 fragCoord) { return missing_value; }".into(),
        custom_parameters: Vec::new(),
    });
    let err = engine.rebuild(broken).unwrap_err();
    assert!(matches!(
        err,
        RenderError::ShaderCompile { ref effect, stage: "fragment", .. } if effect == "broken"
    ));
    assert_eq!(engine.installed_effect(), Some("plasma"));
    assert_eq!(engine.program_generation(), 1);
    assert_eq!(engine.last_error(), Some(&err));
    // program, both shaders and the quad; the failed vertex shader was deleted.
    assert_eq!(ctx(&engine).live_objects(), 4);

    assert_eq!(engine.on_frame(&params), FrameOutcome::Drawn);
    let draw = ctx(&engine).last_draw().unwrap();
    assert_eq!(draw.float("u_frequency"), Some(3.0));
}

#[test]
fn context_loss_pauses_until_restored_and_rebuilds_first() {
    let (_, params, mut engine) = running("plasma");
    engine.on_frame(&params);
    let draws_before = ctx(&engine).draws().len();

    engine.context_mut().unwrap().simulate_loss();
    engine.context_lost();
    assert_eq!(engine.state(), EngineState::ContextLost);
    assert!(!engine.scheduler().is_pending());
    assert_eq!(engine.on_frame(&params), FrameOutcome::Skipped);
    engine.resize(640, 480);
    assert_eq!(ctx(&engine).calls_while_lost(), 0);
    assert_eq!(ctx(&engine).draws().len(), draws_before);

    engine.context_restored().unwrap();
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.program_generation(), 2);
    assert_eq!(ctx(&engine).acquisitions(), 2);
    assert_eq!(ctx(&engine).viewport(), SurfaceSize::new(640, 480));
    assert!(engine.scheduler().is_pending());

    assert_eq!(engine.on_frame(&params), FrameOutcome::Drawn);
    assert_eq!(ctx(&engine).calls_while_lost(), 0);
    let draw = ctx(&engine).last_draw().unwrap();
    assert_eq!(
        draw.uniforms.get("u_resolution"),
        Some(&UniformValue::Vec2([640.0, 480.0]))
    );
}

#[test]
fn loss_discovered_while_drawing_stops_the_loop() {
    let (_, params, mut engine) = running("grid");
    engine.on_frame(&params);

    engine.context_mut().unwrap().simulate_loss();
    assert_eq!(engine.on_frame(&params), FrameOutcome::Skipped);
    assert_eq!(engine.state(), EngineState::ContextLost);
    assert_eq!(engine.last_error(), Some(&RenderError::ContextLost));
    assert!(!engine.scheduler().is_pending());
}

#[test]
fn resize_updates_viewport_without_touching_the_program() {
    let (_, params, mut engine) = running("liquid");
    engine.on_frame(&params);

    engine.resize(320, 200);
    engine.resize(0, 0);
    engine.resize(320, 200);
    assert_eq!(engine.program_generation(), 1);
    assert_eq!(ctx(&engine).viewport(), SurfaceSize::new(320, 200));

    engine.on_frame(&params);
    let draw = ctx(&engine).last_draw().unwrap();
    assert_eq!(draw.viewport, SurfaceSize::new(320, 200));
}

#[test]
fn dispose_releases_everything_once() {
    let (_, params, mut engine) = running("vortex");
    engine.on_frame(&params);

    let context = engine.dispose().unwrap();
    assert_eq!(context.leaked_at_release(), Some(0));
    assert_eq!(engine.state(), EngineState::Disposed);
    assert!(!engine.scheduler().is_pending());
    assert!(engine.dispose().is_none());
    assert_eq!(engine.on_frame(&params), FrameOutcome::Skipped);
}

#[test]
fn missing_gpu_leaves_engine_unsupported() {
    let catalog = EffectCatalog::builtin().unwrap();
    let params = ParameterStore::new(catalog.default_effect());
    let mut engine = RenderEngine::new(HeadlessContext::unavailable(), ManualScheduler::new());

    let err = engine.initialize().unwrap_err();
    assert!(matches!(err, RenderError::CapabilityUnavailable(_)));
    assert_eq!(engine.state(), EngineState::Unsupported);
    assert!(engine.rebuild(catalog.default_effect()).is_err());

    engine.start();
    assert_eq!(engine.on_frame(&params), FrameOutcome::Skipped);
    assert_eq!(engine.scheduler().requests(), 0);
}

#[test]
fn every_builtin_effect_builds_and_draws() {
    let catalog = EffectCatalog::builtin().unwrap();
    let reports = check_catalog(&catalog, 256, 256);
    assert_eq!(reports.len(), catalog.len());
    for report in &reports {
        assert!(report.is_ok(), "{}: {:?}", report.id, report.outcome);
        assert_eq!(report.uniform_bytes % 16, 0);
    }
}
