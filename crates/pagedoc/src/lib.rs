//! Page documents for `pageshade`: the TOML format, a column layout engine
//! that acts as the overlay's [`overlay::LayoutSource`], and the conversion
//! from a page into visualization specs.

mod layout;
mod page;
mod scene;

pub use layout::{DetailsId, EntryKind, Hit, LayoutEntry, PageLayout};
pub use page::{
    Block, InputConfig, LayoutConfig, Page, PageError, ShaderBlock, SourceRef, ViewportConfig,
};
pub use scene::Scene;
