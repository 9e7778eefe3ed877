use crate::geometry::FullscreenGeometry;
use crate::surface::RenderSurface;
use crate::types::{PixelRegion, ProgramId, Rect, SurfaceSize, UniformMap};

/// Name of the standard 2-component resolution uniform.
pub const RESOLUTION_UNIFORM: &str = "iResolution";
/// Name of the standard time uniform, in seconds.
pub const TIME_UNIFORM: &str = "iTime";

/// Result of a single region draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn,
    /// The rectangle lies entirely outside the surface; nothing was touched.
    Culled,
}

/// Draws one program into a sub-region of the shared surface.
#[derive(Debug, Clone, Copy)]
pub struct RegionRenderer {
    geometry: FullscreenGeometry,
}

impl RegionRenderer {
    pub fn new(geometry: FullscreenGeometry) -> Self {
        Self { geometry }
    }

    /// Draws `program` over `rect` (document pixels) at `time_ms`.
    ///
    /// Partially visible rectangles are drawn at full size and left to the
    /// scissor test; only rectangles fully outside the surface are skipped.
    pub fn draw<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        program: ProgramId,
        rect: Rect,
        scale: f32,
        time_ms: f64,
        uniforms: &UniformMap,
    ) -> DrawOutcome {
        let bounds = surface.size();
        let scaled = rect.scaled(scale);
        if is_outside(&scaled, bounds) {
            tracing::trace!(?program, ?rect, "region outside surface; skipping draw");
            return DrawOutcome::Culled;
        }

        let region = PixelRegion {
            x: scaled.left,
            y: bounds.height as f32 - scaled.bottom(),
            width: scaled.width,
            height: scaled.height,
        };
        surface.set_scissor_test(true);
        surface.scissor(region);
        surface.viewport(region);
        surface.use_program(program);

        if let Some(location) = surface.uniform_location(program, RESOLUTION_UNIFORM) {
            surface.uniform2f(location, rect.width, rect.height);
        }
        if let Some(location) = surface.uniform_location(program, TIME_UNIFORM) {
            surface.uniform1f(location, (time_ms / 1000.0) as f32);
        }
        for (name, value) in uniforms {
            if let Some(location) = surface.uniform_location(program, name) {
                surface.uniform1f(location, *value);
            }
        }

        self.geometry.draw(surface);
        DrawOutcome::Drawn
    }
}

fn is_outside(rect: &Rect, bounds: SurfaceSize) -> bool {
    rect.bottom() < 0.0
        || rect.top > bounds.height as f32
        || rect.right() < 0.0
        || rect.left > bounds.width as f32
}
