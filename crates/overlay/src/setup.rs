use crate::compile::{Appearance, DiagnosticsSink, ProgramCompiler, ShaderPrelude};
use crate::registry::InstanceHandle;
use crate::scheduler::FrameScheduler;
use crate::surface::{FrameRequester, RenderSurface};
use crate::types::{ContainerId, ProgramId};

/// An input control bound to a uniform, with the value it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct InputBinding {
    pub uniform: String,
    pub value: f32,
}

/// One visualization found in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationSpec {
    pub container: ContainerId,
    pub label: String,
    /// Source defining `mainImage`.
    pub main: String,
    pub animated: bool,
    /// Inputs driving this visualization only. Page-wide inputs are applied
    /// with [`FrameScheduler::set_global_uniform`] once every visualization
    /// is registered.
    pub inputs: Vec<InputBinding>,
}

/// Compiles and registers a visualization, then applies the initial value of
/// each of its inputs.
///
/// Compile failures go to `diagnostics` and leave the registry untouched;
/// the caller keeps going with the remaining visualizations.
pub fn register_visualization<S, R>(
    scheduler: &mut FrameScheduler<S, R>,
    prelude: &ShaderPrelude,
    spec: &VisualizationSpec,
    diagnostics: &mut dyn DiagnosticsSink,
) -> Option<InstanceHandle>
where
    S: RenderSurface + ProgramCompiler,
    R: FrameRequester,
{
    let handle = if spec.animated {
        let animated = compile_or_report(scheduler, prelude, spec, Appearance::Plain, diagnostics)?;
        let resting =
            compile_or_report(scheduler, prelude, spec, Appearance::PauseOverlay, diagnostics)?;
        InstanceHandle::Animated(scheduler.add_animated(spec.container, resting, animated))
    } else {
        let program = compile_or_report(scheduler, prelude, spec, Appearance::Plain, diagnostics)?;
        InstanceHandle::Static(scheduler.add_static(spec.container, program))
    };

    for input in &spec.inputs {
        scheduler.set_uniform(handle.id(), &input.uniform, input.value);
    }
    Some(handle)
}

fn compile_or_report<S, R>(
    scheduler: &mut FrameScheduler<S, R>,
    prelude: &ShaderPrelude,
    spec: &VisualizationSpec,
    appearance: Appearance,
    diagnostics: &mut dyn DiagnosticsSink,
) -> Option<ProgramId>
where
    S: RenderSurface + ProgramCompiler,
    R: FrameRequester,
{
    let request = prelude.request(&spec.label, &spec.main, appearance);
    match scheduler.compile(&request) {
        Ok(program) => Some(program),
        Err(error) => {
            tracing::debug!(
                label = %request.label,
                ?appearance,
                library = %request.library,
                main = %request.main,
                "failed shader source"
            );
            diagnostics.report(spec.container, &request.label, &error);
            None
        }
    }
}
