use crate::surface::RenderSurface;
use crate::types::GeometryId;

/// Clip-space triangle that covers the whole viewport; the parts outside
/// [-1, 1] are clipped away.
pub const FULLSCREEN_TRIANGLE: [f32; 6] = [-1.0, -1.0, 3.0, -1.0, -1.0, 3.0];

pub const FULLSCREEN_VERTEX_COUNT: u32 = 3;

/// Owns the single triangle shared by every draw call.
#[derive(Debug, Clone, Copy)]
pub struct FullscreenGeometry {
    buffer: GeometryId,
}

impl FullscreenGeometry {
    pub fn upload<S: RenderSurface + ?Sized>(surface: &mut S) -> Self {
        let buffer = surface.upload_geometry(&FULLSCREEN_TRIANGLE);
        tracing::debug!(?buffer, "uploaded fullscreen triangle");
        Self { buffer }
    }

    pub fn draw<S: RenderSurface + ?Sized>(&self, surface: &mut S) {
        surface.draw_triangles(self.buffer, FULLSCREEN_VERTEX_COUNT);
    }
}
