use crate::compile::{CompileError, ProgramCompiler, ProgramRequest};
use crate::geometry::FullscreenGeometry;
use crate::region::{DrawOutcome, RegionRenderer};
use crate::registry::{AnimatedId, InstanceId, InstanceState, PlayOutcome, Registry};
use crate::surface::{FrameRequester, RenderSurface};
use crate::types::{ContainerId, ProgramId, Rect, Viewport};

/// Live document layout consulted on every paint.
pub trait LayoutSource {
    fn viewport(&self) -> Viewport;

    /// Current viewport-relative rectangle of a container, or `None` when the
    /// container is not laid out (for example inside a closed section).
    fn container_rect(&self, container: ContainerId) -> Option<Rect>;
}

/// Summary of one paint callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub drawn: usize,
    pub culled: usize,
    pub animating: bool,
}

/// Owns the shared surface and decides when and what to paint.
///
/// Every mutation path (uniform writes, play/pause, invalidations) ends in
/// [`FrameScheduler::request_frame`]; only [`FrameScheduler::draw_frame`]
/// touches surface state.
pub struct FrameScheduler<S, R> {
    surface: S,
    requester: R,
    renderer: RegionRenderer,
    registry: Registry,
    frame_requested: bool,
    frames_painted: u64,
}

impl<S: RenderSurface, R: FrameRequester> FrameScheduler<S, R> {
    pub fn new(mut surface: S, requester: R) -> Self {
        let geometry = FullscreenGeometry::upload(&mut surface);
        Self {
            surface,
            requester,
            renderer: RegionRenderer::new(geometry),
            registry: Registry::new(),
            frame_requested: false,
            frames_painted: 0,
        }
    }

    /// Requests the first paint once setup has registered everything.
    pub fn run(&mut self) {
        tracing::debug!(instances = self.registry.len(), "starting frame scheduler");
        self.request_frame();
    }

    /// Schedules one future paint; further calls before it runs coalesce.
    pub fn request_frame(&mut self) {
        if !self.frame_requested {
            self.frame_requested = true;
            self.requester.request_animation_frame();
        }
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_requested
    }

    pub fn frames_painted(&self) -> u64 {
        self.frames_painted
    }

    /// Paint callback. `time_ms` is the callback timestamp in milliseconds.
    pub fn draw_frame(&mut self, time_ms: f64, layout: &dyn LayoutSource) -> FrameReport {
        self.frame_requested = false;

        let viewport = layout.viewport();
        let scale = viewport.pixel_ratio;
        self.surface.place(viewport.scroll_x, viewport.scroll_y);
        self.surface.resize(viewport.surface_size());
        self.surface.set_scissor_test(false);
        self.surface.clear([0.0, 0.0, 0.0, 0.0]);

        let mut report = FrameReport::default();
        for id in self.registry.static_set() {
            let Some(instance) = self.registry.get(*id) else {
                continue;
            };
            let state = instance.state();
            paint(
                &self.renderer,
                &mut self.surface,
                layout,
                state,
                state.program,
                scale,
                &mut report,
            );
        }

        if let Some(active) = self.registry.active() {
            if let Some(instance) = self.registry.get_mut(active.instance()) {
                let program = instance.animated_program();
                let state = instance.state_mut();
                state.time_ms = time_ms;
                if let Some(program) = program {
                    paint(
                        &self.renderer,
                        &mut self.surface,
                        layout,
                        state,
                        program,
                        scale,
                        &mut report,
                    );
                }
            }
            report.animating = true;
            self.request_frame();
        }

        self.surface.finish_frame();
        self.frames_painted += 1;
        tracing::trace!(
            frame = self.frames_painted,
            drawn = report.drawn,
            culled = report.culled,
            animating = report.animating,
            "frame painted"
        );
        report
    }

    pub fn add_static(&mut self, container: ContainerId, program: ProgramId) -> InstanceId {
        self.registry.add_static(container, program)
    }

    pub fn add_animated(
        &mut self,
        container: ContainerId,
        resting_program: ProgramId,
        animated_program: ProgramId,
    ) -> AnimatedId {
        self.registry
            .add_animated(container, resting_program, animated_program)
    }

    /// Starts animating `id`. Only the first activation starts the frame
    /// loop; a running loop keeps re-arming itself.
    pub fn play(&mut self, id: AnimatedId) -> PlayOutcome {
        let outcome = self.registry.play(id);
        if outcome == PlayOutcome::Started {
            self.request_frame();
        }
        outcome
    }

    pub fn pause(&mut self, id: AnimatedId) -> bool {
        self.registry.pause(id)
    }

    pub fn toggle(&mut self, id: AnimatedId) -> Option<PlayOutcome> {
        let outcome = self.registry.toggle(id);
        if outcome == Some(PlayOutcome::Started) {
            self.request_frame();
        }
        outcome
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub(crate) fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn requester(&self) -> &R {
        &self.requester
    }
}

impl<S, R> FrameScheduler<S, R>
where
    S: RenderSurface + ProgramCompiler,
    R: FrameRequester,
{
    /// Compiles a program on the owned surface. Setup-time only; compiling
    /// does not touch clip or viewport state.
    pub fn compile(&mut self, request: &ProgramRequest) -> Result<ProgramId, CompileError> {
        self.surface.compile(request)
    }
}

fn paint<S: RenderSurface>(
    renderer: &RegionRenderer,
    surface: &mut S,
    layout: &dyn LayoutSource,
    state: &InstanceState,
    program: ProgramId,
    scale: f32,
    report: &mut FrameReport,
) {
    let Some(rect) = layout.container_rect(state.container) else {
        report.culled += 1;
        return;
    };
    match renderer.draw(surface, program, rect, scale, state.time_ms, &state.uniforms) {
        DrawOutcome::Drawn => report.drawn += 1,
        DrawOutcome::Culled => report.culled += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{Appearance, ProgramRequest};
    use crate::recording::{CountingRequester, FixedLayout, RecordingSurface, SurfaceCall};
    use crate::types::SurfaceSize;

    type TestScheduler = FrameScheduler<RecordingSurface, CountingRequester>;

    fn scheduler() -> TestScheduler {
        FrameScheduler::new(
            RecordingSurface::new(SurfaceSize::new(800, 600)),
            CountingRequester::default(),
        )
    }

    fn layout_with(rects: &[(u32, Rect)]) -> FixedLayout {
        let mut layout = FixedLayout::new(Viewport::new(800.0, 600.0, 1.0));
        for (container, rect) in rects {
            layout.set_rect(ContainerId(*container), *rect);
        }
        layout
    }

    fn drawn_programs(calls: &[SurfaceCall]) -> Vec<ProgramId> {
        let mut bound = None;
        let mut programs = Vec::new();
        for call in calls {
            match call {
                SurfaceCall::UseProgram(program) => bound = Some(*program),
                SurfaceCall::DrawTriangles { .. } => programs.extend(bound),
                _ => {}
            }
        }
        programs
    }

    #[test]
    fn five_requests_schedule_one_callback() {
        let mut scheduler = scheduler();
        for _ in 0..5 {
            scheduler.request_frame();
        }
        assert_eq!(scheduler.requester().requests, 1);
        assert!(scheduler.frame_pending());
    }

    #[test]
    fn request_during_paint_schedules_next_frame() {
        let mut scheduler = scheduler();
        scheduler.request_frame();
        scheduler.draw_frame(0.0, &layout_with(&[]));
        assert!(!scheduler.frame_pending());
        scheduler.request_frame();
        assert_eq!(scheduler.requester().requests, 2);
    }

    #[test]
    fn three_static_instances_paint_once_each() {
        let mut scheduler = scheduler();
        let mut programs = Vec::new();
        let mut ids = Vec::new();
        for index in 0..3u32 {
            let request = ProgramRequest::new(
                format!("demo-{index}"),
                "uniform float amp;",
                "void mainImage(out vec4 c, in vec2 p) { c = vec4(amp); }",
                Appearance::Plain,
            );
            let program = scheduler.compile(&request).expect("compile");
            programs.push(program);
            ids.push(scheduler.add_static(ContainerId(index), program));
        }
        scheduler.set_uniform(ids[1], "amp", 0.75);
        scheduler
            .registry_mut()
            .get_mut(ids[2])
            .expect("instance")
            .state_mut()
            .time_ms = 2000.0;
        let layout = layout_with(&[
            (0, Rect::new(0.0, 0.0, 100.0, 100.0)),
            (1, Rect::new(200.0, 100.0, 100.0, 100.0)),
            (2, Rect::new(400.0, 300.0, 200.0, 200.0)),
        ]);
        scheduler.surface_mut().take_calls();

        let report = scheduler.draw_frame(5000.0, &layout);

        assert_eq!(report.drawn, 3);
        assert!(!report.animating);
        assert!(!scheduler.frame_pending());
        let calls = scheduler.surface_mut().take_calls();
        assert_eq!(drawn_programs(&calls), programs);
        assert!(calls.contains(&SurfaceCall::Uniform1f {
            program: programs[1],
            name: "amp".to_string(),
            value: 0.75,
        }));
        assert!(!calls.iter().any(|call| matches!(
            call,
            SurfaceCall::Uniform1f { program, name, .. } if *program != programs[1] && name == "amp"
        )));
        assert!(calls.contains(&SurfaceCall::Uniform1f {
            program: programs[2],
            name: "iTime".to_string(),
            value: 2.0,
        }));
        assert!(calls.contains(&SurfaceCall::Uniform1f {
            program: programs[0],
            name: "iTime".to_string(),
            value: 0.0,
        }));
    }

    #[test]
    fn frame_resets_clip_and_clears_before_drawing() {
        let mut scheduler = scheduler();
        scheduler.add_static(ContainerId(0), ProgramId(1));
        let layout = layout_with(&[(0, Rect::new(0.0, 0.0, 10.0, 10.0))]);
        scheduler.surface_mut().take_calls();
        scheduler.draw_frame(0.0, &layout);
        let calls = scheduler.surface_mut().take_calls();
        assert_eq!(calls[0], SurfaceCall::Place { x: 0.0, y: 0.0 });
        assert_eq!(calls[1], SurfaceCall::Resize(SurfaceSize::new(800, 600)));
        assert_eq!(calls[2], SurfaceCall::SetScissorTest(false));
        assert_eq!(calls[3], SurfaceCall::Clear([0.0; 4]));
        assert_eq!(calls.last(), Some(&SurfaceCall::FinishFrame));
    }

    #[test]
    fn animation_rearms_until_paused() {
        let mut scheduler = scheduler();
        let resting = ProgramId(1);
        let animated = ProgramId(2);
        let id = scheduler.add_animated(ContainerId(0), resting, animated);
        let layout = layout_with(&[(0, Rect::new(0.0, 0.0, 100.0, 100.0))]);

        scheduler.play(id);
        assert_eq!(scheduler.requester().requests, 1);

        for frame in 1..=3 {
            let report = scheduler.draw_frame(frame as f64 * 16.0, &layout);
            assert!(report.animating);
            assert!(scheduler.frame_pending());
            assert_eq!(scheduler.requester().requests, 1 + frame);
        }
        let instance = scheduler.registry().get(id.instance()).expect("instance");
        assert_eq!(instance.state().time_ms, 48.0);

        scheduler.pause(id);
        // The frame requested by the last paint still runs, but does not re-arm.
        let requests = scheduler.requester().requests;
        scheduler.surface_mut().take_calls();
        let report = scheduler.draw_frame(64.0, &layout);
        assert!(!report.animating);
        assert!(!scheduler.frame_pending());
        assert_eq!(scheduler.requester().requests, requests);
        let calls = scheduler.surface_mut().take_calls();
        assert_eq!(drawn_programs(&calls), vec![resting]);
        let instance = scheduler.registry().get(id.instance()).expect("instance");
        assert_eq!(instance.state().time_ms, 48.0);
    }

    #[test]
    fn toggle_starts_loop_then_pauses() {
        let mut scheduler = scheduler();
        let id = scheduler.add_animated(ContainerId(0), ProgramId(1), ProgramId(2));

        assert_eq!(scheduler.toggle(id), Some(PlayOutcome::Started));
        assert!(scheduler.frame_pending());
        assert_eq!(scheduler.requester().requests, 1);

        assert_eq!(scheduler.toggle(id), None);
        assert!(scheduler.registry().is_static(id.instance()));
        assert_eq!(scheduler.requester().requests, 1);
    }

    #[test]
    fn second_play_does_not_request_another_frame() {
        let mut scheduler = scheduler();
        let first = scheduler.add_animated(ContainerId(0), ProgramId(1), ProgramId(2));
        let second = scheduler.add_animated(ContainerId(1), ProgramId(3), ProgramId(4));
        scheduler.play(first);
        scheduler.draw_frame(16.0, &layout_with(&[]));
        let requests = scheduler.requester().requests;
        scheduler.play(second);
        assert_eq!(scheduler.requester().requests, requests);
        assert!(scheduler.registry().is_static(first.instance()));
    }

    #[test]
    fn active_instance_paints_after_static_ones() {
        let mut scheduler = scheduler();
        let animated = scheduler.add_animated(ContainerId(0), ProgramId(1), ProgramId(2));
        scheduler.add_static(ContainerId(1), ProgramId(3));
        scheduler.play(animated);
        let layout = layout_with(&[
            (0, Rect::new(0.0, 0.0, 100.0, 100.0)),
            (1, Rect::new(50.0, 50.0, 100.0, 100.0)),
        ]);
        scheduler.surface_mut().take_calls();
        scheduler.draw_frame(16.0, &layout);
        let calls = scheduler.surface_mut().take_calls();
        assert_eq!(drawn_programs(&calls), vec![ProgramId(3), ProgramId(2)]);
    }

    #[test]
    fn hidden_and_offscreen_containers_are_culled() {
        let mut scheduler = scheduler();
        scheduler.add_static(ContainerId(0), ProgramId(1));
        scheduler.add_static(ContainerId(1), ProgramId(2));
        scheduler.add_static(ContainerId(2), ProgramId(3));
        let layout = layout_with(&[
            (0, Rect::new(0.0, 0.0, 100.0, 100.0)),
            (1, Rect::new(0.0, 900.0, 100.0, 100.0)),
        ]);
        let report = scheduler.draw_frame(0.0, &layout);
        assert_eq!(report.drawn, 1);
        assert_eq!(report.culled, 2);
    }

    #[test]
    fn surface_follows_viewport_and_scroll() {
        let mut scheduler = scheduler();
        let mut layout = FixedLayout::new(Viewport::new(400.0, 300.0, 2.0));
        layout.viewport.scroll_y = 120.0;
        scheduler.draw_frame(0.0, &layout);
        assert_eq!(scheduler.surface().size(), SurfaceSize::new(800, 600));
        assert_eq!(scheduler.surface().placement(), (0.0, 120.0));
    }
}
