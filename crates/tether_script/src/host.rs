//! Contract between the logic layer and a managed code runtime.

use crate::error::{ScriptError, ScriptFault};
use crate::value::{FieldDescriptor, ScriptValue};
use std::path::Path;
use tether_core::ecs::components::{ObjectHandle, PinHandle};

/// Lifecycle methods resolved for every class on reload, with their arity.
pub const LIFECYCLE_METHODS: [(&str, usize); 4] =
    [("Awake", 1), ("Start", 0), ("Update", 0), ("LateUpdate", 0)];

/// Load state of a named assembly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AssemblyState {
    Unloaded,
    Loaded,
    /// Its domain was unloaded; every handle into it is dead.
    StaleAfterUnload,
}

/// Successful `invoke` outcomes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Invocation {
    Ran,
    /// Null instance, empty class name, or the class does not define the
    /// method.
    Skipped,
}

/// A runtime able to host reloadable user logic.
///
/// Exactly one secondary domain holds user assemblies at a time. Unloading
/// it invalidates every [`ObjectHandle`] and [`PinHandle`] it handed out.
pub trait ManagedHost {
    /// Create a fresh secondary domain and load the default logic assembly.
    fn load_secondary_domain(&mut self) -> Result<(), ScriptError>;

    /// Drop the secondary domain with all its assemblies and objects.
    fn unload_secondary_domain(&mut self);

    fn has_secondary_domain(&self) -> bool;

    /// Name of the assembly scripts are instantiated from.
    fn logic_assembly(&self) -> &str;

    fn add_assembly(&mut self, path: &Path) -> Result<(), ScriptError>;

    fn assembly_state(&self, name: &str) -> AssemblyState;

    /// Resolve `namespace.class::method/param_count` into the method cache.
    /// A miss is cached as absent and reported as `false`.
    fn resolve_method(
        &mut self,
        assembly: &str,
        class: &str,
        namespace: &str,
        method: &str,
        param_count: usize,
    ) -> bool;

    /// Load every binary in the compiled output directory and resolve the
    /// lifecycle methods of every class. Returns the number of loaded
    /// assemblies.
    fn reload_all(&mut self) -> Result<usize, ScriptError>;

    fn create_instance(&mut self, assembly: &str, class: &str) -> Result<ObjectHandle, ScriptError>;

    fn invoke(
        &mut self,
        class: &str,
        method: &str,
        instance: Option<ObjectHandle>,
        args: &[ScriptValue],
    ) -> Result<Invocation, ScriptFault>;

    /// Injectable public fields declared by `class`.
    fn fields(&self, class: &str) -> Vec<FieldDescriptor>;

    fn set_field(
        &mut self,
        instance: ObjectHandle,
        field: &str,
        value: ScriptValue,
    ) -> Result<(), ScriptFault>;

    /// Keep `instance` alive across [`collect_garbage`](Self::collect_garbage).
    fn pin(&mut self, instance: ObjectHandle) -> Option<PinHandle>;

    fn release(&mut self, pin: PinHandle);

    /// Drop unpinned instances. Returns how many were freed.
    fn collect_garbage(&mut self) -> usize;
}
