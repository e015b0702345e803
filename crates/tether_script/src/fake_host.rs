//! Scriptable [`ManagedHost`] that records every call, for logic tests.

use crate::error::{ScriptError, ScriptFault};
use crate::host::{AssemblyState, Invocation, ManagedHost};
use crate::value::{FieldDescriptor, ScriptValue};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tether_core::ecs::components::{ObjectHandle, PinHandle};

#[derive(Default)]
pub(crate) struct FakeHost {
    /// Class name to the lifecycle methods it defines.
    pub classes: HashMap<String, Vec<&'static str>>,
    pub fields: HashMap<String, Vec<FieldDescriptor>>,
    /// `(class, method)` pairs that throw.
    pub throws: HashSet<(String, String)>,
    /// Classes that were never resolved.
    pub unresolved: HashSet<String>,
    /// `"<instance>:<Class>.<Method>"` for every method that ran.
    pub calls: Vec<String>,
    pub assigned: Vec<(ObjectHandle, String, ScriptValue)>,
    pub awake_args: Vec<ScriptValue>,
    pub pins: HashMap<u32, u32>,
    pub reloads: usize,
    instances: Vec<String>,
    domain: Option<u32>,
    next_domain: u32,
}

impl FakeHost {
    pub fn with_classes(classes: &[(&str, &[&'static str])]) -> Self {
        let mut host = Self {
            classes: classes
                .iter()
                .map(|(name, methods)| (name.to_string(), methods.to_vec()))
                .collect(),
            ..Self::default()
        };
        host.next_domain = 1;
        host.domain = Some(1);
        host
    }

    pub fn throw_in(&mut self, class: &str, method: &str) {
        self.throws.insert((class.to_string(), method.to_string()));
    }

    pub fn live_pins(&self) -> u32 {
        self.pins.values().sum()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

impl ManagedHost for FakeHost {
    fn load_secondary_domain(&mut self) -> Result<(), ScriptError> {
        self.next_domain += 1;
        self.domain = Some(self.next_domain);
        self.instances.clear();
        self.pins.clear();
        Ok(())
    }

    fn unload_secondary_domain(&mut self) {
        self.domain = None;
    }

    fn has_secondary_domain(&self) -> bool {
        self.domain.is_some()
    }

    fn logic_assembly(&self) -> &str {
        "GameScript"
    }

    fn add_assembly(&mut self, _path: &Path) -> Result<(), ScriptError> {
        Ok(())
    }

    fn assembly_state(&self, _name: &str) -> AssemblyState {
        if self.domain.is_some() {
            AssemblyState::Loaded
        } else {
            AssemblyState::StaleAfterUnload
        }
    }

    fn resolve_method(&mut self, _: &str, class: &str, _: &str, method: &str, _: usize) -> bool {
        self.classes
            .get(class)
            .is_some_and(|methods| methods.contains(&method))
    }

    fn reload_all(&mut self) -> Result<usize, ScriptError> {
        self.reloads += 1;
        Ok(1)
    }

    fn create_instance(&mut self, assembly: &str, class: &str) -> Result<ObjectHandle, ScriptError> {
        let domain = self.domain.ok_or(ScriptError::NoDomain)?;
        if !self.classes.contains_key(class) {
            return Err(ScriptError::ClassNotFound {
                assembly: assembly.to_string(),
                class: class.to_string(),
            });
        }
        self.instances.push(class.to_string());
        Ok(ObjectHandle {
            domain,
            index: self.instances.len() as u32 - 1,
        })
    }

    fn invoke(
        &mut self,
        class: &str,
        method: &str,
        instance: Option<ObjectHandle>,
        args: &[ScriptValue],
    ) -> Result<Invocation, ScriptFault> {
        let domain = self.domain.ok_or(ScriptFault::NoDomain)?;
        let Some(instance) = instance.filter(|_| !class.is_empty()) else {
            return Ok(Invocation::Skipped);
        };
        if instance.domain != domain || instance.index as usize >= self.instances.len() {
            return Err(ScriptFault::StaleHandle);
        }
        if self.unresolved.contains(class) {
            return Err(ScriptFault::Unresolved {
                class: class.to_string(),
                method: method.to_string(),
            });
        }
        let defined = self
            .classes
            .get(class)
            .is_some_and(|methods| methods.contains(&method));
        if !defined {
            return Ok(Invocation::Skipped);
        }

        self.calls
            .push(format!("{}:{}.{}", instance.index, class, method));
        if method == "Awake" {
            self.awake_args.extend(args.iter().cloned());
        }
        if self.throws.contains(&(class.to_string(), method.to_string())) {
            return Err(ScriptFault::Exception {
                class: class.to_string(),
                method: method.to_string(),
                message: "thrown by test".to_string(),
            });
        }
        Ok(Invocation::Ran)
    }

    fn fields(&self, class: &str) -> Vec<FieldDescriptor> {
        self.fields.get(class).cloned().unwrap_or_default()
    }

    fn set_field(
        &mut self,
        instance: ObjectHandle,
        field: &str,
        value: ScriptValue,
    ) -> Result<(), ScriptFault> {
        self.assigned.push((instance, field.to_string(), value));
        Ok(())
    }

    fn pin(&mut self, instance: ObjectHandle) -> Option<PinHandle> {
        if Some(instance.domain) != self.domain {
            return None;
        }
        *self.pins.entry(instance.index).or_default() += 1;
        Some(PinHandle {
            domain: instance.domain,
            index: instance.index,
        })
    }

    fn release(&mut self, pin: PinHandle) {
        if Some(pin.domain) != self.domain {
            return;
        }
        if let Some(count) = self.pins.get_mut(&pin.index) {
            *count = count.saturating_sub(1);
        }
    }

    fn collect_garbage(&mut self) -> usize {
        0
    }
}
