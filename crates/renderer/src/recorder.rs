//! Turns immediate-mode surface calls into a per-frame draw list.
//!
//! Uniform values are program state, as in GL: a value written once stays
//! until overwritten, and each draw snapshots the bound program's block.

use overlay::{GeometryId, PixelRegion, ProgramId, SurfaceSize, UniformLocation};

use crate::compile::UniformSlot;
use crate::uniforms::RegionUniforms;

/// Scissor rectangle with a top-left origin, clamped to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    fn full(target: SurfaceSize) -> Self {
        Self {
            x: 0,
            y: 0,
            width: target.width,
            height: target.height,
        }
    }

    /// Converts a bottom-left region; `None` when nothing of it is on target.
    fn clamp(region: PixelRegion, target: SurfaceSize) -> Option<Self> {
        let width = target.width as f32;
        let height = target.height as f32;
        let left = region.x.max(0.0).floor();
        let right = (region.x + region.width).min(width).ceil();
        let top = (height - (region.y + region.height)).max(0.0).floor();
        let bottom = (height - region.y).min(height).ceil();
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DrawCommand {
    pub program: ProgramId,
    pub geometry: GeometryId,
    pub vertex_count: u32,
    pub scissor: ScissorRect,
    pub uniforms: RegionUniforms,
}

#[derive(Debug, Default)]
pub(crate) struct FrameRecorder {
    target: SurfaceSize,
    scissor_test: bool,
    scissor: Option<PixelRegion>,
    viewport: Option<PixelRegion>,
    bound: Option<ProgramId>,
    program_uniforms: Vec<RegionUniforms>,
    clear: Option<[f32; 4]>,
    draws: Vec<DrawCommand>,
}

impl FrameRecorder {
    pub(crate) fn new(target: SurfaceSize) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub(crate) fn target(&self) -> SurfaceSize {
        self.target
    }

    pub(crate) fn set_target(&mut self, target: SurfaceSize) {
        self.target = target;
    }

    /// Allocates uniform state for a freshly linked program.
    pub(crate) fn add_program(&mut self) -> ProgramId {
        let program = ProgramId(self.program_uniforms.len() as u32);
        self.program_uniforms.push(RegionUniforms::default());
        program
    }

    pub(crate) fn program_count(&self) -> usize {
        self.program_uniforms.len()
    }

    pub(crate) fn set_scissor_test(&mut self, enabled: bool) {
        self.scissor_test = enabled;
    }

    pub(crate) fn scissor(&mut self, region: PixelRegion) {
        self.scissor = Some(region);
    }

    pub(crate) fn viewport(&mut self, region: PixelRegion) {
        self.viewport = Some(region);
    }

    /// A full-target clear discards everything drawn so far this frame.
    pub(crate) fn clear(&mut self, rgba: [f32; 4]) {
        if self.scissor_test {
            tracing::warn!("scissored clear is not supported; clearing the whole target");
        }
        self.draws.clear();
        self.clear = Some(rgba);
    }

    pub(crate) fn use_program(&mut self, program: ProgramId) {
        if (program.0 as usize) < self.program_uniforms.len() {
            self.bound = Some(program);
        } else {
            tracing::warn!(?program, "binding unknown program");
            self.bound = None;
        }
    }

    fn bound_uniforms(&mut self) -> Option<&mut RegionUniforms> {
        let program = self.bound?;
        self.program_uniforms.get_mut(program.0 as usize)
    }

    pub(crate) fn uniform1f(&mut self, location: UniformLocation, value: f32) {
        let Some(slot) = UniformSlot::from_location(location) else {
            return;
        };
        if let Some(block) = self.bound_uniforms() {
            block.set_scalar(slot, value);
        }
    }

    pub(crate) fn uniform2f(&mut self, location: UniformLocation, x: f32, y: f32) {
        let Some(slot) = UniformSlot::from_location(location) else {
            return;
        };
        if let Some(block) = self.bound_uniforms() {
            block.set_pair(slot, x, y);
        }
    }

    pub(crate) fn draw(&mut self, geometry: GeometryId, vertex_count: u32) {
        let Some(program) = self.bound else {
            tracing::warn!("draw without a bound program");
            return;
        };
        let scissor = if self.scissor_test {
            let region = self.scissor.unwrap_or(PixelRegion {
                x: 0.0,
                y: 0.0,
                width: self.target.width as f32,
                height: self.target.height as f32,
            });
            match ScissorRect::clamp(region, self.target) {
                Some(scissor) => scissor,
                None => {
                    tracing::trace!(?program, "scissor outside target; draw dropped");
                    return;
                }
            }
        } else {
            ScissorRect::full(self.target)
        };
        let viewport = self.viewport.unwrap_or(PixelRegion {
            x: 0.0,
            y: 0.0,
            width: self.target.width as f32,
            height: self.target.height as f32,
        });
        let target = self.target;
        let Some(block) = self.bound_uniforms() else {
            return;
        };
        let mut uniforms = *block;
        uniforms.set_viewport(viewport, target);
        self.draws.push(DrawCommand {
            program,
            geometry,
            vertex_count,
            scissor,
            uniforms,
        });
    }

    /// Hands back the frame's clear colour and draws, resetting both.
    pub(crate) fn take_frame(&mut self) -> (Option<[f32; 4]>, Vec<DrawCommand>) {
        (self.clear.take(), std::mem::take(&mut self.draws))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: f32, y: f32, width: f32, height: f32) -> PixelRegion {
        PixelRegion {
            x,
            y,
            width,
            height,
        }
    }

    fn recorder_with_program() -> (FrameRecorder, ProgramId) {
        let mut recorder = FrameRecorder::new(SurfaceSize::new(800, 600));
        let program = recorder.add_program();
        (recorder, program)
    }

    #[test]
    fn scissor_converts_to_top_left_origin() {
        let scissor = ScissorRect::clamp(region(100.0, 50.0, 200.0, 150.0), SurfaceSize::new(800, 600));
        assert_eq!(
            scissor,
            Some(ScissorRect {
                x: 100,
                y: 400,
                width: 200,
                height: 150,
            })
        );
    }

    #[test]
    fn scissor_is_clamped_to_target() {
        let target = SurfaceSize::new(800, 600);
        let scissor = ScissorRect::clamp(region(-50.0, -50.0, 100.0, 100.0), target);
        assert_eq!(
            scissor,
            Some(ScissorRect {
                x: 0,
                y: 550,
                width: 50,
                height: 50,
            })
        );
        assert_eq!(ScissorRect::clamp(region(900.0, 0.0, 10.0, 10.0), target), None);
    }

    #[test]
    fn uniforms_persist_per_program_and_snapshot_per_draw() {
        let (mut recorder, first) = recorder_with_program();
        let second = recorder.add_program();

        recorder.use_program(first);
        recorder.uniform1f(UniformLocation(1), 1.0);
        recorder.draw(GeometryId(0), 3);
        recorder.use_program(second);
        recorder.uniform1f(UniformLocation(1), 2.0);
        recorder.draw(GeometryId(0), 3);
        recorder.use_program(first);
        recorder.draw(GeometryId(0), 3);
        recorder.uniform1f(UniformLocation(1), 3.0);

        let (_, draws) = recorder.take_frame();
        let times: Vec<f32> = draws.iter().map(|draw| draw.uniforms.time).collect();
        assert_eq!(times, vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn clear_discards_earlier_draws() {
        let (mut recorder, program) = recorder_with_program();
        recorder.use_program(program);
        recorder.draw(GeometryId(0), 3);
        recorder.clear([0.0; 4]);
        recorder.draw(GeometryId(0), 3);
        let (clear, draws) = recorder.take_frame();
        assert_eq!(clear, Some([0.0; 4]));
        assert_eq!(draws.len(), 1);
        assert_eq!(recorder.take_frame(), (None, Vec::new()));
    }

    #[test]
    fn offscreen_scissor_drops_draw() {
        let (mut recorder, program) = recorder_with_program();
        recorder.use_program(program);
        recorder.set_scissor_test(true);
        recorder.scissor(region(0.0, 700.0, 10.0, 10.0));
        recorder.draw(GeometryId(0), 3);
        assert!(recorder.take_frame().1.is_empty());
    }

    #[test]
    fn draw_captures_viewport_transform() {
        let (mut recorder, program) = recorder_with_program();
        recorder.use_program(program);
        recorder.set_scissor_test(true);
        let area = region(400.0, 300.0, 400.0, 300.0);
        recorder.scissor(area);
        recorder.viewport(area);
        recorder.draw(GeometryId(0), 3);
        let (_, draws) = recorder.take_frame();
        assert_eq!(draws[0].uniforms.viewport, [0.5, 0.5, 0.5, 0.5]);
        assert_eq!(
            draws[0].scissor,
            ScissorRect {
                x: 400,
                y: 0,
                width: 400,
                height: 300,
            }
        );
    }

    #[test]
    fn unknown_program_is_not_bound() {
        let mut recorder = FrameRecorder::new(SurfaceSize::new(10, 10));
        recorder.use_program(ProgramId(4));
        recorder.draw(GeometryId(0), 3);
        assert!(recorder.take_frame().1.is_empty());
    }
}
