use overlay::{
    register_visualization, DiagnosticsSink, FrameRequester, FrameScheduler, InstanceHandle,
    ProgramCompiler, RenderSurface,
};
use pagedoc::Scene;

/// Registers every visualization of `scene`, then applies page-level inputs.
///
/// The result is indexed by container; failed visualizations stay `None`.
pub fn mount<S, R>(
    scheduler: &mut FrameScheduler<S, R>,
    scene: &Scene,
    diagnostics: &mut dyn DiagnosticsSink,
) -> Vec<Option<InstanceHandle>>
where
    S: RenderSurface + ProgramCompiler,
    R: FrameRequester,
{
    let handles = scene
        .visualizations
        .iter()
        .map(|spec| register_visualization(scheduler, &scene.prelude, spec, diagnostics))
        .collect::<Vec<_>>();
    for input in &scene.global_inputs {
        scheduler.set_global_uniform(&input.uniform, input.value);
    }
    let failed = handles.iter().filter(|handle| handle.is_none()).count();
    tracing::debug!(
        registered = handles.len() - failed,
        failed,
        "mounted page visualizations"
    );
    handles
}
