use crate::ecs::{
    ComponentPools, EntityId, Signature, System, SystemDescriptor, SystemHandle,
    SystemRegistrationError,
};
use std::collections::HashMap;

/// Registered systems in update order.
pub struct SystemRegistry {
    systems: Vec<Box<dyn System>>,
    name_lookup: HashMap<String, SystemHandle>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            name_lookup: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        system: Box<dyn System>,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        let descriptor = system.descriptor();
        if descriptor.is_empty() {
            return Err(SystemRegistrationError::EmptySignature {
                name: descriptor.name().to_string(),
            });
        }

        let name_key = descriptor.name().to_string();
        if self.name_lookup.contains_key(&name_key) {
            return Err(SystemRegistrationError::DuplicateName { name: name_key });
        }

        let handle = SystemHandle::new(self.systems.len() as u32);
        self.name_lookup.insert(name_key, handle);
        self.systems.push(system);
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn descriptor(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.systems
            .get(handle.order() as usize)
            .map(|system| system.descriptor())
    }

    pub fn handle_of(&self, name: &str) -> Option<SystemHandle> {
        self.name_lookup.get(name).copied()
    }

    /// Register `entity` with every system whose signature it satisfies.
    pub fn register_matching(
        &mut self,
        entity: EntityId,
        signature: Signature,
        pools: &ComponentPools,
    ) {
        for system in &mut self.systems {
            if signature.contains(system.descriptor().signature()) {
                system.register(entity, pools);
            }
        }
    }

    /// Deregister `entity` from every system whose signature it satisfies.
    pub fn deregister_matching(
        &mut self,
        entity: EntityId,
        signature: Signature,
        pools: &mut ComponentPools,
    ) {
        for system in &mut self.systems {
            if signature.contains(system.descriptor().signature()) {
                system.deregister(entity, pools);
            }
        }
    }

    /// Deregister `entity` from the systems `before` satisfied and `after`
    /// no longer does. Systems that still match keep their cache entry.
    pub fn deregister_lost(
        &mut self,
        entity: EntityId,
        before: Signature,
        after: Signature,
        pools: &mut ComponentPools,
    ) {
        for system in &mut self.systems {
            let required = system.descriptor().signature();
            if before.contains(required) && !after.contains(required) {
                system.deregister(entity, pools);
            }
        }
    }

    pub fn get<S: System>(&self) -> Option<&S> {
        self.systems
            .iter()
            .find_map(|system| system.as_any().downcast_ref::<S>())
    }

    pub fn get_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems
            .iter_mut()
            .find_map(|system| system.as_any_mut().downcast_mut::<S>())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SystemHandle, &dyn System)> {
        self.systems
            .iter()
            .enumerate()
            .map(|(index, system)| (SystemHandle::new(index as u32), system.as_ref()))
    }

    pub(crate) fn systems_mut(&mut self) -> &mut [Box<dyn System>] {
        &mut self.systems
    }
}

impl Default for SystemRegistry {
    fn default() -> Self {
        Self::new()
    }
}
