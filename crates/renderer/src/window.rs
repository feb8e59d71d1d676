use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use editor::EditorSession;
use tracing::{error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::context::SurfaceSize;
use crate::engine::{EngineState, RenderEngine};
use crate::gpu::WgpuContext;
use crate::runtime::{FixedTimeSource, FrameScheduler, SystemTimeSource};
use crate::types::RendererConfig;

/// Events injected into the winit loop from outside the window.
#[derive(Debug)]
enum PreviewEvent {
    DeviceLost(String),
    Restore,
}

/// Frame scheduler driven by winit redraw requests. winit cannot withdraw a
/// redraw once asked for, so cancellation clears the pending flag and the
/// redraw handler ignores frames nobody is waiting for.
struct RedrawScheduler {
    window: Arc<Window>,
    pending: bool,
}

impl RedrawScheduler {
    fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) {
        self.pending = true;
        self.window.request_redraw();
    }

    fn cancel_frame(&mut self) {
        self.pending = false;
    }
}

type PreviewEngine = RenderEngine<WgpuContext<Window>, RedrawScheduler>;

/// Opens a window rendering the session's selected effect until it is closed.
///
/// Left/Right cycle through the catalog; Escape closes the window. A lost
/// device is re-acquired and the program rebuilt before frames resume.
pub fn run_preview(config: RendererConfig, mut session: EditorSession) -> Result<()> {
    let event_loop = EventLoopBuilder::<PreviewEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = Mutex::new(event_loop.create_proxy());

    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);
    let size = window.inner_size();

    let context = WgpuContext::new(
        Arc::clone(&window),
        SurfaceSize::new(size.width, size.height),
    )
    .with_preferences(config.power, config.present)
    .with_device_lost_hook(move |message| {
        if let Ok(proxy) = proxy.lock() {
            let _ = proxy.send_event(PreviewEvent::DeviceLost(message));
        }
    });
    let scheduler = RedrawScheduler {
        window: Arc::clone(&window),
        pending: false,
    };
    let clock: crate::runtime::BoxedTimeSource = match config.still_time {
        Some(time) => Box::new(FixedTimeSource::new(time)),
        None => Box::new(SystemTimeSource::new()),
    };
    let mut engine: PreviewEngine = RenderEngine::new(context, scheduler).with_time_source(clock);

    engine
        .initialize()
        .map_err(|err| anyhow!("preview unavailable: {err}"))?;
    if let Err(err) = engine.rebuild(Arc::clone(session.params().selection())) {
        warn!(error = %err, "initial effect failed to build; window stays blank");
    }
    engine.start();
    info!(effect = %session.params().selection().id, "preview running");

    let restore_proxy = event_loop.create_proxy();
    let run_result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        match event {
            Event::UserEvent(PreviewEvent::DeviceLost(message)) => {
                warn!(%message, "GPU device lost");
                engine.context_lost();
                let _ = restore_proxy.send_event(PreviewEvent::Restore);
            }
            Event::UserEvent(PreviewEvent::Restore) => {
                if let Err(err) = engine.context_restored() {
                    error!(error = %err, "failed to restore GPU context");
                }
                if engine.state() == EngineState::Unsupported {
                    elwt.exit();
                }
            }
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    engine.dispose();
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if handle_key(&event, &mut session) {
                        engine.dispose();
                        elwt.exit();
                    }
                }
                WindowEvent::Resized(new_size) => {
                    engine.resize(new_size.width, new_size.height);
                }
                WindowEvent::RedrawRequested => {
                    if engine.scheduler_mut().take_pending() {
                        engine.on_frame(session.params());
                    }
                }
                _ => {}
            },
            _ => {}
        }
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

/// Applies a key press to the session. Returns true when the preview should
/// close.
fn handle_key(event: &KeyEvent, session: &mut EditorSession) -> bool {
    if event.state != ElementState::Pressed || event.repeat {
        return false;
    }
    let step: isize = match &event.logical_key {
        Key::Named(NamedKey::Escape) => return true,
        Key::Named(NamedKey::ArrowRight) => 1,
        Key::Named(NamedKey::ArrowLeft) => -1,
        _ => return false,
    };

    let ids: Vec<String> = session
        .catalog()
        .list()
        .iter()
        .map(|definition| definition.id.clone())
        .collect();
    let current = ids
        .iter()
        .position(|id| *id == session.params().selection().id)
        .unwrap_or(0);
    let next = (current as isize + step).rem_euclid(ids.len() as isize) as usize;
    match session.select_effect(&ids[next]) {
        Ok(_) => info!(effect = %ids[next], "switched effect"),
        Err(err) => error!(error = %err, "failed to switch effect"),
    }
    false
}
