use std::path::Path;

use anyhow::{Context, Result};
use pagedoc::{Page, PageLayout, Scene};
use tracing_subscriber::EnvFilter;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads a page document and derives its initial layout and scene.
pub fn load_page(path: &Path) -> Result<(Page, PageLayout, Scene)> {
    let page =
        Page::load(path).with_context(|| format!("failed to load page {}", path.display()))?;
    let layout = PageLayout::new(&page);
    let scene = Scene::from_page(&page)
        .with_context(|| format!("failed to read shader sources for {}", path.display()))?;
    tracing::info!(
        page = %path.display(),
        visualizations = scene.visualizations.len(),
        "page loaded"
    );
    Ok((page, layout, scene))
}
