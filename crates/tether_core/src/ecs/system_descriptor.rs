use crate::ecs::{ComponentKind, Signature};

/// Metadata describing which entities a system tracks and when it runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemDescriptor {
    name: String,
    components: Vec<ComponentKind>,
    signature: Signature,
    runs_when_paused: bool,
}

impl SystemDescriptor {
    /// Create a new descriptor with the provided name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            signature: Signature::EMPTY,
            runs_when_paused: true,
        }
    }

    /// Replace the required component set for this system.
    pub fn requires<I>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = ComponentKind>,
    {
        self.components = Self::sanitize(components);
        self.signature = Signature::of(&self.components);
        self
    }

    /// Only update while the game state is running.
    pub fn only_when_running(mut self) -> Self {
        self.runs_when_paused = false;
        self
    }

    /// Unique system name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required kinds, sorted and deduplicated.
    pub fn components(&self) -> &[ComponentKind] {
        &self.components
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub fn runs_when_paused(&self) -> bool {
        self.runs_when_paused
    }

    /// Whether the descriptor requires any components at all.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn sanitize<I>(components: I) -> Vec<ComponentKind>
    where
        I: IntoIterator<Item = ComponentKind>,
    {
        let mut list: Vec<ComponentKind> = components.into_iter().collect();
        list.sort_unstable();
        list.dedup();
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_sorts_and_dedups() {
        let descriptor = SystemDescriptor::new("physics").requires([
            ComponentKind::RigidBody,
            ComponentKind::Name,
            ComponentKind::RigidBody,
        ]);
        assert_eq!(
            descriptor.components(),
            &[ComponentKind::Name, ComponentKind::RigidBody]
        );
        assert!(descriptor.signature().test(ComponentKind::RigidBody));
        assert!(descriptor.runs_when_paused());
        assert!(!descriptor.only_when_running().runs_when_paused());
    }
}
