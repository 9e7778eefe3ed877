//! Headless backend that records surface calls instead of drawing.
//!
//! Used by the test suites and by `pageshade trace` to inspect exactly what
//! a frame would do to a real graphics context.

use std::collections::HashMap;

use serde::Serialize;

use crate::compile::{CompileError, ProgramCompiler, ProgramRequest};
use crate::region::{RESOLUTION_UNIFORM, TIME_UNIFORM};
use crate::scheduler::{FrameScheduler, LayoutSource};
use crate::surface::{FrameRequester, RenderSurface};
use crate::types::{
    ContainerId, GeometryId, PixelRegion, ProgramId, Rect, SurfaceSize, UniformLocation, Viewport,
};

/// One recorded surface operation. Uniform writes carry the resolved name
/// and the program bound at the time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum SurfaceCall {
    Place { x: f32, y: f32 },
    Resize(SurfaceSize),
    SetScissorTest(bool),
    Scissor(PixelRegion),
    Viewport(PixelRegion),
    Clear([f32; 4]),
    UseProgram(ProgramId),
    Uniform1f {
        program: ProgramId,
        name: String,
        value: f32,
    },
    Uniform2f {
        program: ProgramId,
        name: String,
        x: f32,
        y: f32,
    },
    UploadGeometry { geometry: GeometryId, vertices: usize },
    DrawTriangles { geometry: GeometryId, vertex_count: u32 },
    FinishFrame,
}

#[derive(Debug, Clone)]
struct RecordedProgram {
    label: String,
    uniforms: Vec<String>,
}

/// [`RenderSurface`] and [`ProgramCompiler`] that only keeps a log.
///
/// Programs "link" when their main source defines `mainImage`; every
/// program resolves the standard uniforms plus its declared scalar ones.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: SurfaceSize,
    placement: (f32, f32),
    calls: Vec<SurfaceCall>,
    programs: Vec<RecordedProgram>,
    geometry_count: u32,
    bound: Option<ProgramId>,
}

impl RecordingSurface {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            placement: (0.0, 0.0),
            calls: Vec::new(),
            programs: Vec::new(),
            geometry_count: 0,
            bound: None,
        }
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn placement(&self) -> (f32, f32) {
        self.placement
    }

    pub fn program_label(&self, program: ProgramId) -> Option<&str> {
        self.programs
            .get(program.0 as usize)
            .map(|recorded| recorded.label.as_str())
    }

    fn uniform_name(&self, location: UniformLocation) -> (ProgramId, String) {
        let program = self.bound.unwrap_or(ProgramId(u32::MAX));
        let name = self
            .programs
            .get(program.0 as usize)
            .and_then(|recorded| recorded.uniforms.get(location.0 as usize))
            .cloned()
            .unwrap_or_else(|| format!("#{}", location.0));
        (program, name)
    }
}

impl RenderSurface for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.calls.push(SurfaceCall::Resize(size));
    }

    fn place(&mut self, offset_x: f32, offset_y: f32) {
        self.placement = (offset_x, offset_y);
        self.calls.push(SurfaceCall::Place {
            x: offset_x,
            y: offset_y,
        });
    }

    fn set_scissor_test(&mut self, enabled: bool) {
        self.calls.push(SurfaceCall::SetScissorTest(enabled));
    }

    fn scissor(&mut self, region: PixelRegion) {
        self.calls.push(SurfaceCall::Scissor(region));
    }

    fn viewport(&mut self, region: PixelRegion) {
        self.calls.push(SurfaceCall::Viewport(region));
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        self.calls.push(SurfaceCall::Clear(rgba));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.bound = Some(program);
        self.calls.push(SurfaceCall::UseProgram(program));
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(program.0 as usize)?
            .uniforms
            .iter()
            .position(|known| known == name)
            .map(|index| UniformLocation(index as u32))
    }

    fn uniform1f(&mut self, location: UniformLocation, value: f32) {
        let (program, name) = self.uniform_name(location);
        self.calls.push(SurfaceCall::Uniform1f {
            program,
            name,
            value,
        });
    }

    fn uniform2f(&mut self, location: UniformLocation, x: f32, y: f32) {
        let (program, name) = self.uniform_name(location);
        self.calls.push(SurfaceCall::Uniform2f {
            program,
            name,
            x,
            y,
        });
    }

    fn upload_geometry(&mut self, positions: &[f32]) -> GeometryId {
        let geometry = GeometryId(self.geometry_count);
        self.geometry_count += 1;
        self.calls.push(SurfaceCall::UploadGeometry {
            geometry,
            vertices: positions.len() / 2,
        });
        geometry
    }

    fn draw_triangles(&mut self, geometry: GeometryId, vertex_count: u32) {
        self.calls.push(SurfaceCall::DrawTriangles {
            geometry,
            vertex_count,
        });
    }

    fn finish_frame(&mut self) {
        self.calls.push(SurfaceCall::FinishFrame);
    }
}

impl ProgramCompiler for RecordingSurface {
    fn compile(&mut self, request: &ProgramRequest) -> Result<ProgramId, CompileError> {
        if !request.main.contains("mainImage") {
            return Err(CompileError::Link(format!(
                "{}: no definition of mainImage",
                request.label
            )));
        }
        let mut uniforms = vec![RESOLUTION_UNIFORM.to_string(), TIME_UNIFORM.to_string()];
        uniforms.extend(request.custom_uniforms());
        let program = ProgramId(self.programs.len() as u32);
        self.programs.push(RecordedProgram {
            label: request.label.clone(),
            uniforms,
        });
        Ok(program)
    }
}

impl<R: FrameRequester> FrameScheduler<RecordingSurface, R> {
    /// Drains the calls recorded since the last drain.
    pub fn take_recorded_calls(&mut self) -> Vec<SurfaceCall> {
        self.surface_mut().take_calls()
    }
}

/// Counts animation-frame requests; the paint callback is driven by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingRequester {
    pub requests: usize,
}

impl FrameRequester for CountingRequester {
    fn request_animation_frame(&mut self) {
        self.requests += 1;
    }
}

/// Layout with fixed rectangles per container.
#[derive(Debug, Clone)]
pub struct FixedLayout {
    pub viewport: Viewport,
    rects: HashMap<ContainerId, Rect>,
}

impl FixedLayout {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            rects: HashMap::new(),
        }
    }

    pub fn set_rect(&mut self, container: ContainerId, rect: Rect) {
        self.rects.insert(container, rect);
    }
}

impl LayoutSource for FixedLayout {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn container_rect(&self, container: ContainerId) -> Option<Rect> {
        self.rects.get(&container).copied()
    }
}
