use crate::types::{ContainerId, ProgramId, UniformMap};

/// Index of any registered instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(usize);

impl InstanceId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of an animatable instance. Only [`Registry::add_animated`] mints
/// these, so only animated instances can ever become active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatedId(InstanceId);

impl AnimatedId {
    pub fn instance(self) -> InstanceId {
        self.0
    }
}

/// Either kind of registered instance, as handed back to setup code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceHandle {
    Static(InstanceId),
    Animated(AnimatedId),
}

impl InstanceHandle {
    pub fn id(self) -> InstanceId {
        match self {
            InstanceHandle::Static(id) => id,
            InstanceHandle::Animated(id) => id.instance(),
        }
    }

    pub fn animated(self) -> Option<AnimatedId> {
        match self {
            InstanceHandle::Animated(id) => Some(id),
            InstanceHandle::Static(_) => None,
        }
    }
}

/// State shared by both instance kinds.
#[derive(Debug, Clone)]
pub struct InstanceState {
    pub container: ContainerId,
    /// Program drawn while the instance is part of the static set.
    pub program: ProgramId,
    pub uniforms: UniformMap,
    /// Last-rendered timestamp in milliseconds; frozen while static.
    pub time_ms: f64,
}

impl InstanceState {
    fn new(container: ContainerId, program: ProgramId) -> Self {
        Self {
            container,
            program,
            uniforms: UniformMap::new(),
            time_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ShaderInstance {
    Static(InstanceState),
    Animated {
        state: InstanceState,
        animated_program: ProgramId,
    },
}

impl ShaderInstance {
    pub fn state(&self) -> &InstanceState {
        match self {
            ShaderInstance::Static(state) | ShaderInstance::Animated { state, .. } => state,
        }
    }

    pub fn state_mut(&mut self) -> &mut InstanceState {
        match self {
            ShaderInstance::Static(state) | ShaderInstance::Animated { state, .. } => state,
        }
    }

    pub fn animated_program(&self) -> Option<ProgramId> {
        match self {
            ShaderInstance::Animated {
                animated_program, ..
            } => Some(*animated_program),
            ShaderInstance::Static(_) => None,
        }
    }
}

/// Outcome of [`Registry::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Nothing was animating before; the caller has to start the frame loop.
    Started,
    /// Another instance was active and has been paused in favour of this one.
    Transferred { previous: AnimatedId },
    AlreadyActive,
}

/// Set of visualization instances plus the single active one.
///
/// Invariant: every animated instance is either the active one or a member
/// of the static set, never both. The static set is kept in registration
/// order so frames paint deterministically.
#[derive(Debug, Default)]
pub struct Registry {
    instances: Vec<ShaderInstance>,
    static_set: Vec<InstanceId>,
    active: Option<AnimatedId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_static(&mut self, container: ContainerId, program: ProgramId) -> InstanceId {
        let id = self.push(ShaderInstance::Static(InstanceState::new(container, program)));
        tracing::debug!(?id, ?container, "registered static visualization");
        id
    }

    /// Registers an animatable instance, initially paused.
    pub fn add_animated(
        &mut self,
        container: ContainerId,
        resting_program: ProgramId,
        animated_program: ProgramId,
    ) -> AnimatedId {
        let id = self.push(ShaderInstance::Animated {
            state: InstanceState::new(container, resting_program),
            animated_program,
        });
        tracing::debug!(?id, ?container, "registered animated visualization");
        AnimatedId(id)
    }

    fn push(&mut self, instance: ShaderInstance) -> InstanceId {
        let id = InstanceId(self.instances.len());
        self.instances.push(instance);
        self.static_set.push(id);
        id
    }

    pub fn play(&mut self, id: AnimatedId) -> PlayOutcome {
        if self.active == Some(id) {
            return PlayOutcome::AlreadyActive;
        }
        let previous = self.active.take();
        if let Some(previous) = previous {
            self.insert_static(previous.instance());
        }
        self.static_set.retain(|member| *member != id.instance());
        self.active = Some(id);
        match previous {
            None => {
                tracing::debug!(?id, "animation started");
                PlayOutcome::Started
            }
            Some(previous) => {
                tracing::debug!(?id, ?previous, "animation transferred");
                PlayOutcome::Transferred { previous }
            }
        }
    }

    /// Returns `false` (and changes nothing) unless `id` is the active one.
    pub fn pause(&mut self, id: AnimatedId) -> bool {
        if self.active != Some(id) {
            return false;
        }
        self.active = None;
        self.insert_static(id.instance());
        tracing::debug!(?id, "animation paused");
        true
    }

    /// Pointer-down behaviour: pause the active instance, play any other.
    pub fn toggle(&mut self, id: AnimatedId) -> Option<PlayOutcome> {
        if self.is_active(id) {
            self.pause(id);
            None
        } else {
            Some(self.play(id))
        }
    }

    fn insert_static(&mut self, id: InstanceId) {
        if let Err(position) = self.static_set.binary_search(&id) {
            self.static_set.insert(position, id);
        }
    }

    pub fn is_active(&self, id: AnimatedId) -> bool {
        self.active == Some(id)
    }

    pub fn active(&self) -> Option<AnimatedId> {
        self.active
    }

    pub fn static_set(&self) -> &[InstanceId] {
        &self.static_set
    }

    pub fn is_static(&self, id: InstanceId) -> bool {
        self.static_set.binary_search(&id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, id: InstanceId) -> Option<&ShaderInstance> {
        self.instances.get(id.0)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut ShaderInstance> {
        self.instances.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &ShaderInstance)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(index, instance)| (InstanceId(index), instance))
    }
}
