use std::collections::HashMap;

use serde::Serialize;

/// Scalar uniforms supplied by the caller, keyed by their exact GLSL name.
pub type UniformMap = HashMap<String, f32>;

/// Opaque reference to a document container owned by the layout source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ContainerId(pub u32);

/// Handle to a linked program issued by a [`ProgramCompiler`](crate::ProgramCompiler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProgramId(pub u32);

/// Handle to a static vertex buffer uploaded to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GeometryId(pub u32);

/// Resolved uniform slot inside a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UniformLocation(pub u32);

/// Axis-aligned rectangle in document (CSS) pixels, relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Multiplies every edge by `scale`, converting document to surface pixels.
    pub fn scaled(&self, scale: f32) -> Self {
        Self {
            left: self.left * scale,
            top: self.top * scale,
            width: self.width * scale,
            height: self.height * scale,
        }
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            ..*self
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

/// Drawing-buffer dimensions in surface (physical) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Sub-region of the surface with a bottom-left origin, as scissor and
/// viewport state expect it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Snapshot of the visible page area the overlay has to cover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Overlay width in CSS pixels.
    pub css_width: f32,
    /// Overlay height in CSS pixels.
    pub css_height: f32,
    /// Device pixel ratio; surface pixels per CSS pixel.
    pub pixel_ratio: f32,
    pub scroll_x: f32,
    pub scroll_y: f32,
}

impl Viewport {
    pub fn new(css_width: f32, css_height: f32, pixel_ratio: f32) -> Self {
        Self {
            css_width,
            css_height,
            pixel_ratio,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }

    /// Backing size of the overlay: CSS size times the pixel ratio.
    pub fn surface_size(&self) -> SurfaceSize {
        let ratio = self.pixel_ratio.max(f32::EPSILON);
        SurfaceSize::new(
            (self.css_width * ratio).round().max(0.0) as u32,
            (self.css_height * ratio).round().max(0.0) as u32,
        )
    }
}
