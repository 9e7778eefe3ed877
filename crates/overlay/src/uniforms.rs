use crate::registry::InstanceId;
use crate::scheduler::FrameScheduler;
use crate::surface::{FrameRequester, RenderSurface};

impl<S: RenderSurface, R: FrameRequester> FrameScheduler<S, R> {
    /// Stores one uniform value for an instance.
    ///
    /// Writing the value already stored neither marks anything dirty nor
    /// requests a frame. Returns whether a frame was requested.
    pub fn set_uniform(&mut self, id: InstanceId, name: &str, value: f32) -> bool {
        let Some(instance) = self.registry_mut().get_mut(id) else {
            tracing::warn!(?id, name, "uniform write for unknown instance");
            return false;
        };
        let uniforms = &mut instance.state_mut().uniforms;
        if uniforms.get(name) == Some(&value) {
            return false;
        }
        uniforms.insert(name.to_string(), value);
        tracing::trace!(?id, name, value, "uniform updated");
        self.request_frame();
        true
    }

    /// Writes `name` into every instance of the static set and requests a
    /// frame. The active instance keeps its own value.
    pub fn set_global_uniform(&mut self, name: &str, value: f32) {
        let members = self.registry().static_set().to_vec();
        for id in members {
            if let Some(instance) = self.registry_mut().get_mut(id) {
                instance
                    .state_mut()
                    .uniforms
                    .insert(name.to_string(), value);
            }
        }
        tracing::trace!(name, value, "global uniform updated");
        self.request_frame();
    }
}
