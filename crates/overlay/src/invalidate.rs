use std::fmt;

use crate::scheduler::FrameScheduler;
use crate::surface::{FrameRequester, RenderSurface};

/// Why the page layout may have moved under the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// The viewport changed size or pixel ratio.
    Resize,
    Scroll,
    /// Containers were added, removed or reflowed.
    Structure,
    /// A collapsible section opened or closed.
    Visibility,
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Invalidation::Resize => "resize",
            Invalidation::Scroll => "scroll",
            Invalidation::Structure => "structure",
            Invalidation::Visibility => "visibility",
        };
        f.write_str(name)
    }
}

/// Receives layout change notifications from the viewport change source.
pub trait InvalidationObserver {
    fn on_invalidate(&mut self, cause: Invalidation);
}

impl<S: RenderSurface, R: FrameRequester> InvalidationObserver for FrameScheduler<S, R> {
    fn on_invalidate(&mut self, cause: Invalidation) {
        tracing::trace!(%cause, "layout invalidated");
        self.request_frame();
    }
}
