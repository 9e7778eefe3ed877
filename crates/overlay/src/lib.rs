//! Rendering core for shader visualizations embedded in a scrolling page.
//!
//! A single [`RenderSurface`] is shared by every visualization. The
//! [`FrameScheduler`] owns it, coalesces redraw requests into one paint per
//! frame, and draws each registered instance into the sub-region its
//! container currently occupies. At most one animated instance runs
//! continuously; everything else repaints only when something changes.
//!
//! The crate never talks to a graphics, windowing or event API directly:
//! backends implement [`RenderSurface`], [`ProgramCompiler`] and
//! [`FrameRequester`], and the host page implements [`LayoutSource`].

mod compile;
mod geometry;
mod invalidate;
pub mod recording;
mod region;
mod registry;
mod scheduler;
mod setup;
mod surface;
mod types;
mod uniforms;

pub use compile::{
    declared_scalar_uniforms, Appearance, CollectedDiagnostics, CompileError, Diagnostic,
    DiagnosticsSink, ProgramCompiler, ProgramRequest, ShaderPrelude, ShaderStage,
    TracingDiagnostics,
};
pub use geometry::{FullscreenGeometry, FULLSCREEN_TRIANGLE, FULLSCREEN_VERTEX_COUNT};
pub use invalidate::{Invalidation, InvalidationObserver};
pub use region::{DrawOutcome, RegionRenderer, RESOLUTION_UNIFORM, TIME_UNIFORM};
pub use registry::{
    AnimatedId, InstanceHandle, InstanceId, InstanceState, PlayOutcome, Registry, ShaderInstance,
};
pub use scheduler::{FrameReport, FrameScheduler, LayoutSource};
pub use setup::{register_visualization, InputBinding, VisualizationSpec};
pub use surface::{FrameRequester, RenderSurface};
pub use types::{
    ContainerId, GeometryId, PixelRegion, ProgramId, Rect, SurfaceSize, UniformLocation,
    UniformMap, Viewport,
};
