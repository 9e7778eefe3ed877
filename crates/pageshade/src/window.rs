use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use overlay::{
    ContainerId, FrameRequester, FrameScheduler, InstanceHandle, InvalidationObserver,
    SurfaceSize, TracingDiagnostics,
};
use pagedoc::{Hit, InputConfig, Page, PageLayout};
use renderer::GpuSurface;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::cli::RunArgs;
use crate::mount::mount;
use crate::run::load_page;

const LINE_HEIGHT: f32 = 40.0;

/// Turns scheduler frame requests into winit redraw requests.
struct RedrawRequester {
    window: Arc<Window>,
}

impl FrameRequester for RedrawRequester {
    fn request_animation_frame(&mut self) {
        self.window.request_redraw();
    }
}

/// Current value of one adjustable input.
#[derive(Debug, Clone)]
struct InputControl {
    config: InputConfig,
    value: f32,
}

impl InputControl {
    fn new(config: &InputConfig) -> Self {
        Self {
            config: config.clone(),
            value: config.clamp(config.value),
        }
    }

    fn step(&mut self, steps: i32) -> f32 {
        self.value = self.config.stepped(self.value, steps);
        self.value
    }
}

struct PageWindow {
    window: Arc<Window>,
    scheduler: FrameScheduler<GpuSurface, RedrawRequester>,
    layout: PageLayout,
    handles: Vec<Option<InstanceHandle>>,
    instance_inputs: HashMap<ContainerId, InputControl>,
    global_input: Option<InputControl>,
    cursor: (f32, f32),
    started: Instant,
}

impl PageWindow {
    fn scale(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    fn hovered(&self) -> Option<ContainerId> {
        match self.layout.hit_test(self.cursor.0, self.cursor.1)? {
            Hit::Shader(container) => Some(container),
            Hit::Summary(_) => None,
        }
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        let scale = self.scale();
        let invalidation = self.layout.resize(
            size.width as f32 / scale,
            size.height as f32 / scale,
            scale,
        );
        if let Some(cause) = invalidation {
            self.scheduler.on_invalidate(cause);
        }
    }

    fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        let dy = match delta {
            MouseScrollDelta::LineDelta(_, lines) => -lines * LINE_HEIGHT,
            MouseScrollDelta::PixelDelta(position) => -(position.y as f32) / self.scale(),
        };
        if let Some(cause) = self.layout.scroll_by(dy) {
            self.scheduler.on_invalidate(cause);
        }
    }

    fn handle_cursor(&mut self, position: PhysicalPosition<f64>) {
        let scale = self.scale();
        self.cursor = (position.x as f32 / scale, position.y as f32 / scale);
    }

    fn handle_click(&mut self) {
        match self.layout.hit_test(self.cursor.0, self.cursor.1) {
            Some(Hit::Shader(container)) => {
                let animated = self
                    .handles
                    .get(container.0 as usize)
                    .copied()
                    .flatten()
                    .and_then(InstanceHandle::animated);
                if let Some(animated) = animated {
                    self.scheduler.toggle(animated);
                }
            }
            Some(Hit::Summary(details)) => {
                if let Some(cause) = self.layout.toggle(details) {
                    self.scheduler.on_invalidate(cause);
                }
            }
            None => {}
        }
    }

    fn step_hovered_input(&mut self, steps: i32) {
        let Some(container) = self.hovered() else {
            return;
        };
        let Some(handle) = self.handles.get(container.0 as usize).copied().flatten() else {
            return;
        };
        let Some(control) = self.instance_inputs.get_mut(&container) else {
            return;
        };
        let value = control.step(steps);
        let uniform = control.config.uniform.clone();
        if self.scheduler.set_uniform(handle.id(), &uniform, value) {
            tracing::info!(%uniform, value, "input changed");
        }
    }

    fn step_global_input(&mut self, steps: i32) {
        let Some(control) = self.global_input.as_mut() else {
            return;
        };
        let value = control.step(steps);
        tracing::info!(uniform = %control.config.uniform, value, "page input changed");
        self.scheduler
            .set_global_uniform(&control.config.uniform, value);
    }

    fn redraw(&mut self) {
        let time_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let report = self.scheduler.draw_frame(time_ms, &self.layout);
        tracing::trace!(
            frame = self.scheduler.frames_painted(),
            drawn = report.drawn,
            culled = report.culled,
            animating = report.animating,
            dropped = self.scheduler.surface().frames_dropped(),
            "frame presented"
        );
    }
}

fn first_instance_inputs(page: &Page) -> HashMap<ContainerId, InputControl> {
    page.shaders()
        .into_iter()
        .enumerate()
        .filter_map(|(index, shader)| {
            shader
                .inputs
                .iter()
                .find(|input| !input.global)
                .map(|input| (ContainerId(index as u32), InputControl::new(input)))
        })
        .collect()
}

pub fn run(args: RunArgs) -> Result<()> {
    let (page, layout, scene) = load_page(&args.page)?;

    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let title = page.title.clone().unwrap_or_else(|| "pageshade".to_string());
    let window = WindowBuilder::new()
        .with_title(title)
        .with_inner_size(LogicalSize::new(page.viewport.width, page.viewport.height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create page window: {err}"))?;
    let window = Arc::new(window);

    let inner = window.inner_size();
    let surface = GpuSurface::new(window.clone(), SurfaceSize::new(inner.width, inner.height))?;
    let requester = RedrawRequester {
        window: window.clone(),
    };
    let mut scheduler = FrameScheduler::new(surface, requester);
    let handles = mount(&mut scheduler, &scene, &mut TracingDiagnostics);

    let mut state = PageWindow {
        window: window.clone(),
        scheduler,
        layout,
        handles,
        instance_inputs: first_instance_inputs(&page),
        global_input: page.inputs.first().map(InputControl::new),
        cursor: (0.0, 0.0),
        started: Instant::now(),
    };
    state.handle_resize(inner);
    state.scheduler.run();

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);
            let Event::WindowEvent { window_id, event } = event else {
                return;
            };
            if window_id != state.window.id() {
                return;
            }
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                    match event.logical_key {
                        Key::Named(NamedKey::Escape) => elwt.exit(),
                        Key::Character(ref key) if key.as_str() == "[" => {
                            state.step_hovered_input(-1)
                        }
                        Key::Character(ref key) if key.as_str() == "]" => {
                            state.step_hovered_input(1)
                        }
                        Key::Character(ref key) if key.as_str() == "-" => {
                            state.step_global_input(-1)
                        }
                        Key::Character(ref key) if key.as_str() == "=" => {
                            state.step_global_input(1)
                        }
                        _ => {}
                    }
                }
                WindowEvent::CursorMoved { position, .. } => state.handle_cursor(position),
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button: MouseButton::Left,
                    ..
                } => state.handle_click(),
                WindowEvent::MouseWheel { delta, .. } => state.handle_scroll(delta),
                WindowEvent::Resized(size) => state.handle_resize(size),
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = state.window.inner_size();
                    state.handle_resize(size);
                }
                WindowEvent::RedrawRequested => state.redraw(),
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop terminated with error: {err}"))
}
