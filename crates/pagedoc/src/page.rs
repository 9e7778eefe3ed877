use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("failed to parse page: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid page: {0}")]
    Invalid(String),
}

/// A page of text and embedded shader visualizations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page {
    pub version: u32,
    #[serde(default)]
    pub title: Option<String>,
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    /// Shared shader code prepended to every visualization, in order.
    #[serde(default)]
    pub library: Vec<SourceRef>,
    /// Inputs that drive every visualization at once.
    #[serde(default)]
    pub inputs: Vec<InputConfig>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f32,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct LayoutConfig {
    #[serde(default = "default_margin")]
    pub margin: f32,
    #[serde(default = "default_gap")]
    pub gap: f32,
    #[serde(default = "default_max_width")]
    pub max_width: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            gap: default_gap(),
            max_width: default_max_width(),
        }
    }
}

/// Shader code given inline or as a path relative to the page file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceRef {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Block {
    Text {
        height: f32,
        #[serde(default)]
        text: Option<String>,
    },
    Shader(ShaderBlock),
    Details {
        #[serde(default)]
        summary: Option<String>,
        #[serde(default = "default_summary_height")]
        summary_height: f32,
        #[serde(default)]
        open: bool,
        #[serde(default)]
        blocks: Vec<Block>,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShaderBlock {
    pub id: String,
    pub height: f32,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub inputs: Vec<InputConfig>,
}

/// A slider bound to a scalar uniform.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    pub uniform: String,
    pub value: f32,
    #[serde(default)]
    pub min: f32,
    #[serde(default = "default_input_max")]
    pub max: f32,
    #[serde(default = "default_input_step")]
    pub step: f32,
    /// Drive every static visualization instead of only the enclosing one.
    /// Applied after the whole page is registered, like top-level inputs.
    #[serde(default)]
    pub global: bool,
}

impl InputConfig {
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Value after moving `steps` increments from `current`, clamped.
    pub fn stepped(&self, current: f32, steps: i32) -> f32 {
        self.clamp(current + self.step * steps as f32)
    }
}

fn default_pixel_ratio() -> f32 {
    1.0
}

fn default_margin() -> f32 {
    24.0
}

fn default_gap() -> f32 {
    16.0
}

fn default_max_width() -> f32 {
    720.0
}

fn default_summary_height() -> f32 {
    32.0
}

fn default_input_max() -> f32 {
    1.0
}

fn default_input_step() -> f32 {
    0.05
}

impl Page {
    pub fn from_toml_str(input: &str) -> Result<Self, PageError> {
        let page: Page = toml::from_str(input)?;
        page.validate()?;
        Ok(page)
    }

    /// Reads a page file; relative source paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, PageError> {
        let input = std::fs::read_to_string(path).map_err(|source| PageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut page = Self::from_toml_str(&input)?;
        page.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(path = %path.display(), shaders = page.shaders().len(), "loaded page");
        Ok(page)
    }

    /// Every shader block in document order, including those inside
    /// collapsed sections.
    pub fn shaders(&self) -> Vec<&ShaderBlock> {
        fn collect<'a>(blocks: &'a [Block], out: &mut Vec<&'a ShaderBlock>) {
            for block in blocks {
                match block {
                    Block::Shader(shader) => out.push(shader),
                    Block::Details { blocks, .. } => collect(blocks, out),
                    Block::Text { .. } => {}
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.blocks, &mut out);
        out
    }

    /// Library snippets with file references read from disk.
    pub fn library_sources(&self) -> Result<Vec<String>, PageError> {
        self.library
            .iter()
            .map(|snippet| self.read_source(snippet.source.as_deref(), snippet.path.as_deref()))
            .collect()
    }

    pub fn shader_source(&self, shader: &ShaderBlock) -> Result<String, PageError> {
        self.read_source(shader.main.as_deref(), shader.path.as_deref())
    }

    fn read_source(&self, inline: Option<&str>, path: Option<&Path>) -> Result<String, PageError> {
        match (inline, path) {
            (Some(source), None) => Ok(source.to_string()),
            (None, Some(path)) => {
                let resolved = match &self.base_dir {
                    Some(base) if path.is_relative() => base.join(path),
                    _ => path.to_path_buf(),
                };
                std::fs::read_to_string(&resolved).map_err(|source| PageError::Io {
                    path: resolved,
                    source,
                })
            }
            _ => Err(PageError::Invalid(
                "a source needs exactly one of inline code or a path".into(),
            )),
        }
    }

    pub fn validate(&self) -> Result<(), PageError> {
        if self.version != 1 {
            return Err(PageError::Invalid(format!(
                "unsupported page version {}; expected 1",
                self.version
            )));
        }

        let viewport = &self.viewport;
        if !(viewport.width > 0.0 && viewport.height > 0.0) {
            return Err(PageError::Invalid(
                "viewport width and height must be greater than zero".into(),
            ));
        }
        if !(viewport.pixel_ratio > 0.0) {
            return Err(PageError::Invalid(
                "viewport pixel_ratio must be greater than zero".into(),
            ));
        }

        let layout = &self.layout;
        if layout.margin < 0.0 || layout.gap < 0.0 || !(layout.max_width > 0.0) {
            return Err(PageError::Invalid(
                "layout margin and gap must be >= 0 and max_width > 0".into(),
            ));
        }

        for (index, snippet) in self.library.iter().enumerate() {
            if snippet.source.is_some() == snippet.path.is_some() {
                return Err(PageError::Invalid(format!(
                    "library entry {index} needs exactly one of 'source' or 'path'"
                )));
            }
        }

        for input in &self.inputs {
            validate_input(input, "page")?;
        }

        let mut ids = HashSet::new();
        validate_blocks(&self.blocks, &mut ids)
    }
}

fn validate_blocks<'a>(blocks: &'a [Block], ids: &mut HashSet<&'a str>) -> Result<(), PageError> {
    for block in blocks {
        match block {
            Block::Text { height, .. } => {
                if *height < 0.0 {
                    return Err(PageError::Invalid("text height must be >= 0".into()));
                }
            }
            Block::Shader(shader) => {
                if shader.id.trim().is_empty() {
                    return Err(PageError::Invalid("shader id may not be empty".into()));
                }
                if !ids.insert(shader.id.as_str()) {
                    return Err(PageError::Invalid(format!(
                        "duplicate shader id '{}'",
                        shader.id
                    )));
                }
                if !(shader.height > 0.0) || shader.width.is_some_and(|width| !(width > 0.0)) {
                    return Err(PageError::Invalid(format!(
                        "shader '{}' size must be greater than zero",
                        shader.id
                    )));
                }
                if shader.main.is_some() == shader.path.is_some() {
                    return Err(PageError::Invalid(format!(
                        "shader '{}' needs exactly one of 'main' or 'path'",
                        shader.id
                    )));
                }
                for input in &shader.inputs {
                    validate_input(input, &shader.id)?;
                }
            }
            Block::Details {
                summary_height,
                blocks,
                ..
            } => {
                if !(*summary_height > 0.0) {
                    return Err(PageError::Invalid(
                        "details summary_height must be greater than zero".into(),
                    ));
                }
                validate_blocks(blocks, ids)?;
            }
        }
    }
    Ok(())
}

fn validate_input(input: &InputConfig, owner: &str) -> Result<(), PageError> {
    if input.uniform.trim().is_empty() {
        return Err(PageError::Invalid(format!(
            "{owner}: input uniform name may not be empty"
        )));
    }
    if !(input.min < input.max) || !(input.step > 0.0) {
        return Err(PageError::Invalid(format!(
            "{owner}: input '{}' needs min < max and step > 0",
            input.uniform
        )));
    }
    Ok(())
}
