use overlay::{ContainerId, InputBinding, ShaderPrelude, VisualizationSpec};

use crate::page::{InputConfig, Page, PageError};

/// Everything needed to register a page's visualizations with a scheduler.
#[derive(Debug, Clone)]
pub struct Scene {
    pub prelude: ShaderPrelude,
    /// In document order; container ids match [`crate::PageLayout`].
    pub visualizations: Vec<VisualizationSpec>,
    /// Page-level inputs plus block inputs marked `global`, in document
    /// order. Applied once every visualization is registered.
    pub global_inputs: Vec<InputBinding>,
}

impl Scene {
    pub fn from_page(page: &Page) -> Result<Self, PageError> {
        let prelude = ShaderPrelude::from_snippets(page.library_sources()?);
        let mut global_inputs = page.inputs.iter().map(binding).collect::<Vec<_>>();
        let mut visualizations = Vec::new();
        for (index, shader) in page.shaders().into_iter().enumerate() {
            let (global, local): (Vec<&InputConfig>, Vec<&InputConfig>) =
                shader.inputs.iter().partition(|input| input.global);
            global_inputs.extend(global.into_iter().map(binding));
            visualizations.push(VisualizationSpec {
                container: ContainerId(index as u32),
                label: shader.id.clone(),
                main: page.shader_source(shader)?,
                animated: shader.animated,
                inputs: local.into_iter().map(binding).collect(),
            });
        }
        Ok(Self {
            prelude,
            visualizations,
            global_inputs,
        })
    }
}

fn binding(input: &InputConfig) -> InputBinding {
    InputBinding {
        uniform: input.uniform.clone(),
        value: input.clamp(input.value),
    }
}
