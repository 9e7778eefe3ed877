use crate::types::{GeometryId, PixelRegion, ProgramId, SurfaceSize, UniformLocation};

/// Shared drawing surface with GL-style immediate state.
///
/// The frame scheduler is the only owner of a surface; backends translate
/// these calls into whatever their graphics API needs. Regions use a
/// bottom-left origin.
pub trait RenderSurface {
    /// Current drawing-buffer size in surface pixels.
    fn size(&self) -> SurfaceSize;

    /// Resizes the drawing buffer. Called every frame; implementations should
    /// skip the work when the size is unchanged.
    fn resize(&mut self, size: SurfaceSize);

    /// Positions the overlay so it stays aligned with the scrolled page.
    fn place(&mut self, _offset_x: f32, _offset_y: f32) {}

    fn set_scissor_test(&mut self, enabled: bool);

    fn scissor(&mut self, region: PixelRegion);

    fn viewport(&mut self, region: PixelRegion);

    fn clear(&mut self, rgba: [f32; 4]);

    fn use_program(&mut self, program: ProgramId);

    /// Resolves a uniform by exact name; `None` when the program does not
    /// declare it.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn uniform1f(&mut self, location: UniformLocation, value: f32);

    fn uniform2f(&mut self, location: UniformLocation, x: f32, y: f32);

    /// Uploads a static buffer of 2-component vertex positions.
    fn upload_geometry(&mut self, positions: &[f32]) -> GeometryId;

    fn draw_triangles(&mut self, geometry: GeometryId, vertex_count: u32);

    /// Ends the paint callback; presenting backends submit here.
    fn finish_frame(&mut self) {}
}

/// Schedules a single future paint callback, e.g. an animation-frame request
/// or a window redraw.
pub trait FrameRequester {
    fn request_animation_frame(&mut self);
}
