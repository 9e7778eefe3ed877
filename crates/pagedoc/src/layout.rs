//! Single-column layout of a page, standing in for a browser's live layout.

use std::collections::HashMap;

use overlay::{ContainerId, Invalidation, LayoutSource, Rect, Viewport};
use serde::Serialize;

use crate::page::{Block, LayoutConfig, Page};

/// Index of a collapsible section in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DetailsId(pub usize);

/// What a pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Shader(ContainerId),
    Summary(DetailsId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntryKind {
    Text,
    Shader { id: String, container: ContainerId },
    Summary { details: DetailsId, open: bool },
}

/// One laid-out block with its viewport-relative rectangle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutEntry {
    #[serde(flatten)]
    pub kind: EntryKind,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Text,
    Shader(ContainerId),
    Summary(DetailsId),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    height: f32,
    width: Option<f32>,
    /// Enclosing sections; the node is laid out only when all are open.
    ancestors: Vec<DetailsId>,
}

#[derive(Debug, Clone)]
pub struct PageLayout {
    config: LayoutConfig,
    viewport: Viewport,
    nodes: Vec<Node>,
    open: Vec<bool>,
    shader_ids: Vec<String>,
    placed: Vec<(NodeKind, Rect)>,
    shader_rects: HashMap<ContainerId, Rect>,
    content_height: f32,
}

impl PageLayout {
    pub fn new(page: &Page) -> Self {
        let mut layout = Self {
            config: page.layout,
            viewport: Viewport::new(
                page.viewport.width,
                page.viewport.height,
                page.viewport.pixel_ratio,
            ),
            nodes: Vec::new(),
            open: Vec::new(),
            shader_ids: Vec::new(),
            placed: Vec::new(),
            shader_rects: HashMap::new(),
            content_height: 0.0,
        };
        layout.flatten(&page.blocks, &[]);
        layout.relayout();
        layout
    }

    fn flatten(&mut self, blocks: &[Block], ancestors: &[DetailsId]) {
        for block in blocks {
            match block {
                Block::Text { height, .. } => self.nodes.push(Node {
                    kind: NodeKind::Text,
                    height: *height,
                    width: None,
                    ancestors: ancestors.to_vec(),
                }),
                Block::Shader(shader) => {
                    let container = ContainerId(self.shader_ids.len() as u32);
                    self.shader_ids.push(shader.id.clone());
                    self.nodes.push(Node {
                        kind: NodeKind::Shader(container),
                        height: shader.height,
                        width: shader.width,
                        ancestors: ancestors.to_vec(),
                    });
                }
                Block::Details {
                    summary_height,
                    open,
                    blocks,
                    ..
                } => {
                    let details = DetailsId(self.open.len());
                    self.open.push(*open);
                    self.nodes.push(Node {
                        kind: NodeKind::Summary(details),
                        height: *summary_height,
                        width: None,
                        ancestors: ancestors.to_vec(),
                    });
                    let mut nested = ancestors.to_vec();
                    nested.push(details);
                    self.flatten(blocks, &nested);
                }
            }
        }
    }

    fn relayout(&mut self) {
        let margin = self.config.margin;
        let column_width = (self.viewport.css_width - 2.0 * margin)
            .min(self.config.max_width)
            .max(0.0);
        let left = ((self.viewport.css_width - column_width) / 2.0).max(0.0);

        self.placed.clear();
        self.shader_rects.clear();
        let mut y = margin;
        let mut first = true;
        for node in &self.nodes {
            if node.ancestors.iter().any(|details| !self.open[details.0]) {
                continue;
            }
            if !first {
                y += self.config.gap;
            }
            first = false;
            let width = node
                .width
                .map_or(column_width, |width| width.min(column_width));
            let rect = Rect::new(left, y, width, node.height);
            if let NodeKind::Shader(container) = node.kind {
                self.shader_rects.insert(container, rect);
            }
            self.placed.push((node.kind, rect));
            y += node.height;
        }
        self.content_height = y + margin;
        self.viewport.scroll_y = self.viewport.scroll_y.clamp(0.0, self.max_scroll());
        tracing::trace!(
            content_height = self.content_height,
            visible = self.placed.len(),
            "page laid out"
        );
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    pub fn max_scroll(&self) -> f32 {
        (self.content_height - self.viewport.css_height).max(0.0)
    }

    pub fn scroll_y(&self) -> f32 {
        self.viewport.scroll_y
    }

    /// Returns [`Invalidation::Resize`] when anything changed.
    pub fn resize(&mut self, css_width: f32, css_height: f32, pixel_ratio: f32) -> Option<Invalidation> {
        let current = &self.viewport;
        if current.css_width == css_width
            && current.css_height == css_height
            && current.pixel_ratio == pixel_ratio
        {
            return None;
        }
        self.viewport.css_width = css_width;
        self.viewport.css_height = css_height;
        self.viewport.pixel_ratio = pixel_ratio;
        self.relayout();
        Some(Invalidation::Resize)
    }

    /// Scrolls to `y`, clamped to the content. Returns
    /// [`Invalidation::Scroll`] when the offset moved.
    pub fn scroll_to(&mut self, y: f32) -> Option<Invalidation> {
        let clamped = y.clamp(0.0, self.max_scroll());
        if clamped == self.viewport.scroll_y {
            return None;
        }
        self.viewport.scroll_y = clamped;
        Some(Invalidation::Scroll)
    }

    pub fn scroll_by(&mut self, dy: f32) -> Option<Invalidation> {
        self.scroll_to(self.viewport.scroll_y + dy)
    }

    pub fn is_open(&self, details: DetailsId) -> Option<bool> {
        self.open.get(details.0).copied()
    }

    pub fn set_open(&mut self, details: DetailsId, open: bool) -> Option<Invalidation> {
        let slot = self.open.get_mut(details.0)?;
        if *slot == open {
            return None;
        }
        *slot = open;
        self.relayout();
        tracing::debug!(?details, open, "section toggled");
        Some(Invalidation::Visibility)
    }

    pub fn toggle(&mut self, details: DetailsId) -> Option<Invalidation> {
        let open = self.is_open(details)?;
        self.set_open(details, !open)
    }

    /// Maps a viewport point to the shader or section summary under it.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<Hit> {
        let (doc_x, doc_y) = (x + self.viewport.scroll_x, y + self.viewport.scroll_y);
        self.placed
            .iter()
            .find(|(_, rect)| rect.contains(doc_x, doc_y))
            .and_then(|(kind, _)| match kind {
                NodeKind::Shader(container) => Some(Hit::Shader(*container)),
                NodeKind::Summary(details) => Some(Hit::Summary(*details)),
                NodeKind::Text => None,
            })
    }

    pub fn container(&self, id: &str) -> Option<ContainerId> {
        self.shader_ids
            .iter()
            .position(|known| known == id)
            .map(|index| ContainerId(index as u32))
    }

    pub fn shader_id(&self, container: ContainerId) -> Option<&str> {
        self.shader_ids.get(container.0 as usize).map(String::as_str)
    }

    /// Visible blocks with viewport-relative rectangles.
    pub fn entries(&self) -> Vec<LayoutEntry> {
        self.placed
            .iter()
            .map(|(kind, rect)| LayoutEntry {
                kind: match kind {
                    NodeKind::Text => EntryKind::Text,
                    NodeKind::Shader(container) => EntryKind::Shader {
                        id: self.shader_ids[container.0 as usize].clone(),
                        container: *container,
                    },
                    NodeKind::Summary(details) => EntryKind::Summary {
                        details: *details,
                        open: self.open[details.0],
                    },
                },
                rect: self.to_viewport(*rect),
            })
            .collect()
    }

    fn to_viewport(&self, rect: Rect) -> Rect {
        rect.translated(-self.viewport.scroll_x, -self.viewport.scroll_y)
    }
}

impl LayoutSource for PageLayout {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn container_rect(&self, container: ContainerId) -> Option<Rect> {
        self.shader_rects
            .get(&container)
            .map(|rect| self.to_viewport(*rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
version = 1
[viewport]
width = 1000
height = 400

[layout]
margin = 20
gap = 10
max_width = 600

[[blocks]]
kind = "text"
height = 100

[[blocks]]
kind = "shader"
id = "first"
height = 200
width = 300
main = "x"

[[blocks]]
kind = "details"
summary_height = 30

[[blocks.blocks]]
kind = "shader"
id = "hidden"
height = 250
main = "x"

[[blocks]]
kind = "shader"
id = "last"
height = 150
main = "x"
"#;

    fn layout() -> PageLayout {
        PageLayout::new(&Page::from_toml_str(PAGE).expect("page"))
    }

    #[test]
    fn column_is_centered_and_stacked() {
        let layout = layout();
        let first = layout.container_rect(ContainerId(0)).expect("first");
        assert_eq!(first, Rect::new(200.0, 130.0, 300.0, 200.0));
        // text 20..120, first 130..330, summary 340..370, last 380..530
        let last = layout.container_rect(ContainerId(2)).expect("last");
        assert_eq!(last, Rect::new(200.0, 380.0, 600.0, 150.0));
        assert_eq!(layout.content_height(), 550.0);
    }

    #[test]
    fn closed_section_hides_its_shaders() {
        let mut layout = layout();
        assert_eq!(layout.container_rect(ContainerId(1)), None);

        assert_eq!(layout.toggle(DetailsId(0)), Some(Invalidation::Visibility));
        let hidden = layout.container_rect(ContainerId(1)).expect("now visible");
        assert_eq!(hidden.top, 380.0);
        let last = layout.container_rect(ContainerId(2)).expect("last");
        assert_eq!(last.top, 640.0);

        assert_eq!(layout.set_open(DetailsId(0), true), None);
        assert_eq!(layout.toggle(DetailsId(7)), None);
    }

    #[test]
    fn scroll_is_clamped_and_shifts_rects() {
        let mut layout = layout();
        assert_eq!(layout.max_scroll(), 150.0);
        assert_eq!(layout.scroll_to(1000.0), Some(Invalidation::Scroll));
        assert_eq!(layout.scroll_y(), 150.0);
        assert_eq!(layout.scroll_by(10.0), None);
        assert_eq!(layout.viewport().scroll_y, 150.0);
        let first = layout.container_rect(ContainerId(0)).expect("first");
        assert_eq!(first.top, -20.0);
        assert_eq!(layout.scroll_to(-5.0), Some(Invalidation::Scroll));
        assert_eq!(layout.scroll_y(), 0.0);
    }

    #[test]
    fn resize_relayouts_and_reports() {
        let mut layout = layout();
        assert_eq!(layout.resize(1000.0, 400.0, 1.0), None);
        assert_eq!(layout.resize(400.0, 400.0, 2.0), Some(Invalidation::Resize));
        let last = layout.container_rect(ContainerId(2)).expect("last");
        assert_eq!(last.left, 20.0);
        assert_eq!(last.width, 360.0);
        assert_eq!(layout.viewport().surface_size(), overlay::SurfaceSize::new(800, 800));
    }

    #[test]
    fn hit_testing_finds_shaders_and_summaries() {
        let mut layout = layout();
        assert_eq!(layout.hit_test(250.0, 150.0), Some(Hit::Shader(ContainerId(0))));
        assert_eq!(layout.hit_test(250.0, 350.0), Some(Hit::Summary(DetailsId(0))));
        assert_eq!(layout.hit_test(250.0, 50.0), None);
        assert_eq!(layout.hit_test(5.0, 150.0), None);
        layout.scroll_to(100.0);
        assert_eq!(layout.hit_test(250.0, 300.0), Some(Hit::Shader(ContainerId(2))));
    }

    #[test]
    fn shader_ids_map_to_containers() {
        let layout = layout();
        assert_eq!(layout.container("hidden"), Some(ContainerId(1)));
        assert_eq!(layout.shader_id(ContainerId(2)), Some("last"));
        let entries = layout.entries();
        assert_eq!(entries.len(), 4);
        assert!(matches!(
            entries[2].kind,
            EntryKind::Summary {
                details: DetailsId(0),
                open: false
            }
        ));
    }
}
