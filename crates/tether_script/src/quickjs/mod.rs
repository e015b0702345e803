//! [`ManagedHost`] on QuickJS.
//!
//! An assembly is a JS file whose top level assigns classes to `exports`.
//! Nested plain objects on `exports` act as namespaces. A class declares its
//! injectable fields with `static fields = { speed: "float" }`.

mod convert;
mod domain;
mod intrinsics;

pub use domain::PrimaryDomain;

use crate::config::ScriptConfig;
use crate::error::{ScriptError, ScriptFault};
use crate::host::{AssemblyState, Invocation, ManagedHost, LIFECYCLE_METHODS};
use crate::natives::{CommandQueue, NativeTable};
use crate::value::{FieldDescriptor, ScriptValue};
use domain::SecondaryDomain;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tether_core::ecs::components::{ObjectHandle, PinHandle};

pub struct QuickJsHost {
    // Declared first so user objects are released before the primary domain.
    secondary: Option<SecondaryDomain>,
    primary: PrimaryDomain,
    queue: CommandQueue,
    states: HashMap<String, AssemblyState>,
    output_dir: PathBuf,
    logic_assembly: String,
    memory_limit: Option<usize>,
    next_domain: u32,
}

impl QuickJsHost {
    pub fn new(config: &ScriptConfig, queue: CommandQueue) -> Result<Self, ScriptError> {
        let primary = PrimaryDomain::new(NativeTable::new(queue.clone()))?;
        Ok(Self {
            secondary: None,
            primary,
            queue,
            states: HashMap::new(),
            output_dir: config.output_dir.clone(),
            logic_assembly: config.logic_assembly.clone(),
            memory_limit: config.memory_limit_bytes,
            next_domain: 0,
        })
    }

    pub fn primary(&self) -> &PrimaryDomain {
        &self.primary
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Generation of the current secondary domain.
    pub fn domain_id(&self) -> Option<u32> {
        self.secondary.as_ref().map(SecondaryDomain::id)
    }

    /// Assemblies loaded in the current secondary domain, by name.
    pub fn loaded_assemblies(&self) -> Vec<String> {
        self.secondary
            .as_ref()
            .map(|domain| domain.assembly_names().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn assembly_path(&self, name: &str) -> Option<&Path> {
        self.secondary
            .as_ref()?
            .assembly(name)
            .map(|descriptor| descriptor.path.as_path())
    }

    pub fn live_instances(&self) -> usize {
        self.secondary
            .as_ref()
            .map_or(0, SecondaryDomain::live_instances)
    }

    pub fn instance_class(&self, instance: ObjectHandle) -> Option<&str> {
        self.secondary.as_ref()?.instance_class(instance)
    }

    pub fn resolved_methods(&self) -> usize {
        self.secondary
            .as_ref()
            .map_or(0, |domain| domain.methods().resolved_len())
    }

    /// Read a field back from an instance.
    pub fn get_field(&self, instance: ObjectHandle, field: &str) -> Option<ScriptValue> {
        self.secondary.as_ref()?.get_field(instance, field)
    }
}

impl ManagedHost for QuickJsHost {
    fn load_secondary_domain(&mut self) -> Result<(), ScriptError> {
        if self.secondary.is_some() {
            self.unload_secondary_domain();
        }

        self.next_domain += 1;
        let natives = NativeTable::new(self.queue.clone());
        self.secondary = Some(SecondaryDomain::new(
            self.next_domain,
            &natives,
            self.memory_limit,
        )?);
        tracing::info!("loaded script domain {}", self.next_domain);

        let logic = self
            .output_dir
            .join(&self.logic_assembly)
            .with_extension(ScriptConfig::ASSEMBLY_EXTENSION);
        if logic.exists() {
            self.add_assembly(&logic)?;
        } else {
            tracing::warn!("logic assembly {} has not been built", logic.display());
        }
        Ok(())
    }

    fn unload_secondary_domain(&mut self) {
        let Some(domain) = self.secondary.take() else {
            return;
        };
        for name in domain.assembly_names() {
            self.states
                .insert(name.to_string(), AssemblyState::StaleAfterUnload);
        }
        let id = domain.id();
        drop(domain);
        tracing::info!("unloaded script domain {}", id);
    }

    fn has_secondary_domain(&self) -> bool {
        self.secondary.is_some()
    }

    fn logic_assembly(&self) -> &str {
        &self.logic_assembly
    }

    fn add_assembly(&mut self, path: &Path) -> Result<(), ScriptError> {
        let domain = self.secondary.as_mut().ok_or(ScriptError::NoDomain)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        if domain.has_assembly(&name) {
            tracing::error!("assembly '{}' is already loaded", name);
            return Err(ScriptError::DuplicateAssembly(name));
        }
        if let Err(err) = domain.load_assembly(&name, path) {
            tracing::error!("{}", err);
            return Err(err);
        }

        if let Some(descriptor) = domain.assembly(&name) {
            tracing::info!("loaded assembly '{}' from {}", name, descriptor.display_name);
        }
        self.states.insert(name, AssemblyState::Loaded);
        Ok(())
    }

    fn assembly_state(&self, name: &str) -> AssemblyState {
        self.states
            .get(name)
            .copied()
            .unwrap_or(AssemblyState::Unloaded)
    }

    fn resolve_method(
        &mut self,
        assembly: &str,
        class: &str,
        namespace: &str,
        method: &str,
        param_count: usize,
    ) -> bool {
        if self.assembly_state(assembly) != AssemblyState::Loaded {
            tracing::warn!("cannot resolve {}.{}: assembly '{}' is not loaded", class, method, assembly);
            return false;
        }
        match self.secondary.as_mut() {
            Some(domain) => domain.resolve(assembly, class, namespace, method, param_count),
            None => false,
        }
    }

    fn reload_all(&mut self) -> Result<usize, ScriptError> {
        if self.secondary.is_none() {
            return Err(ScriptError::NoDomain);
        }

        let entries = std::fs::read_dir(&self.output_dir).map_err(|source| ScriptError::Io {
            path: self.output_dir.clone(),
            source,
        })?;
        let mut binaries: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext == ScriptConfig::ASSEMBLY_EXTENSION)
            })
            .collect();
        binaries.sort();

        for path in binaries {
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let already = self
                .secondary
                .as_ref()
                .is_some_and(|domain| domain.has_assembly(&name));
            if !already {
                // Logged by add_assembly; the remaining binaries still load.
                let _ = self.add_assembly(&path);
            }
        }

        let targets: Vec<(String, String, String)> = match self.secondary.as_ref() {
            Some(domain) => domain
                .assembly_names()
                .flat_map(|assembly| {
                    domain
                        .classes_of(assembly)
                        .into_iter()
                        .map(move |(namespace, class)| (assembly.to_string(), namespace, class))
                })
                .collect(),
            None => Vec::new(),
        };
        for (assembly, namespace, class) in &targets {
            for (method, arity) in LIFECYCLE_METHODS {
                self.resolve_method(assembly, class, namespace, method, arity);
            }
        }

        let loaded = self.loaded_assemblies().len();
        tracing::info!(
            "reloaded {} assemblies, {} classes, {} lifecycle methods",
            loaded,
            targets.len(),
            self.resolved_methods()
        );
        Ok(loaded)
    }

    fn create_instance(&mut self, assembly: &str, class: &str) -> Result<ObjectHandle, ScriptError> {
        if self.assembly_state(assembly) != AssemblyState::Loaded {
            return Err(ScriptError::AssemblyNotLoaded(assembly.to_string()));
        }
        let domain = self.secondary.as_mut().ok_or(ScriptError::NoDomain)?;
        domain.create_instance(assembly, class)
    }

    fn invoke(
        &mut self,
        class: &str,
        method: &str,
        instance: Option<ObjectHandle>,
        args: &[ScriptValue],
    ) -> Result<Invocation, ScriptFault> {
        let domain = self.secondary.as_ref().ok_or(ScriptFault::NoDomain)?;
        match instance {
            Some(instance) if !class.is_empty() => domain.invoke(class, method, instance, args),
            _ => Ok(Invocation::Skipped),
        }
    }

    fn fields(&self, class: &str) -> Vec<FieldDescriptor> {
        self.secondary
            .as_ref()
            .and_then(|domain| domain.class(class))
            .map(|entry| entry.fields.clone())
            .unwrap_or_default()
    }

    fn set_field(
        &mut self,
        instance: ObjectHandle,
        field: &str,
        value: ScriptValue,
    ) -> Result<(), ScriptFault> {
        let domain = self.secondary.as_ref().ok_or(ScriptFault::NoDomain)?;
        domain.set_field(instance, field, value)
    }

    fn pin(&mut self, instance: ObjectHandle) -> Option<PinHandle> {
        self.secondary.as_mut()?.pin(instance)
    }

    fn release(&mut self, pin: PinHandle) {
        let released = self
            .secondary
            .as_mut()
            .is_some_and(|domain| domain.release(pin));
        if !released {
            tracing::debug!("released stale pin {:?}", pin);
        }
    }

    fn collect_garbage(&mut self) -> usize {
        self.secondary
            .as_mut()
            .map_or(0, SecondaryDomain::collect_garbage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::natives::ScriptCommand;
    use crate::value::FieldKind;
    use tether_core::ecs::EntityId;

    const PLAYER: &str = r#"
        class Player {
            static fields = { speed: "float", title: "string", offset: "vec3" };
            constructor() { this.calls = ""; this.speed = 1; }
            Awake(entity) { this.entity = entity; this.calls += "A"; }
            Start() { this.calls += "S"; }
            Update() {
                this.calls += "U";
                engine.translate(this.entity, this.speed, 0);
            }
        }
        class Faulty {
            Update() { throw new Error("boom"); }
        }
        exports.Player = Player;
        exports.Faulty = Faulty;
        exports.Game = { Enemy: class { LateUpdate() {} } };
    "#;

    fn host_with(source: &str) -> (tempfile::TempDir, QuickJsHost) {
        let dir = tempfile::tempdir().unwrap();
        let config = ScriptConfig {
            output_dir: dir.path().to_path_buf(),
            ..ScriptConfig::default()
        };
        std::fs::write(config.logic_assembly_path(), source).unwrap();
        let mut host = QuickJsHost::new(&config, CommandQueue::new()).unwrap();
        host.load_secondary_domain().unwrap();
        assert_eq!(host.reload_all().unwrap(), 1);
        (dir, host)
    }

    #[test]
    fn primary_domain_runs_engine_scripts() {
        let host = QuickJsHost::new(&ScriptConfig::default(), CommandQueue::new()).unwrap();
        host.primary()
            .execute("function boot() { engine.log('booted'); }")
            .unwrap();
        host.primary().call_function("boot").unwrap();
        assert_eq!(host.queue().drain_logs(), vec!["booted".to_string()]);
        assert!(host.primary().call_function("missing").is_err());
    }

    #[test]
    fn primary_domain_executes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boot.js");
        std::fs::write(&path, "engine.log('from file');").unwrap();

        let host = QuickJsHost::new(&ScriptConfig::default(), CommandQueue::new()).unwrap();
        host.primary().execute_file(&path).unwrap();
        assert_eq!(host.queue().drain_logs(), vec!["from file".to_string()]);

        assert!(matches!(
            host.primary().execute_file(&dir.path().join("absent.js")),
            Err(ScriptError::Io { .. })
        ));
    }

    #[test]
    fn runs_lifecycle_and_queues_natives() {
        let (_dir, mut host) = host_with(PLAYER);
        assert_eq!(host.assembly_state("GameScript"), AssemblyState::Loaded);

        let player = host.create_instance("GameScript", "Player").unwrap();
        assert_eq!(host.instance_class(player), Some("Player"));
        let entity = ScriptValue::Entity(EntityId::new(3));
        assert_eq!(
            host.invoke("Player", "Awake", Some(player), &[entity]),
            Ok(Invocation::Ran)
        );
        host.invoke("Player", "Start", Some(player), &[]).unwrap();
        host.invoke("Player", "Update", Some(player), &[]).unwrap();

        assert_eq!(host.get_field(player, "entity"), Some(ScriptValue::Int(3)));
        assert_eq!(
            host.get_field(player, "calls"),
            Some(ScriptValue::Str("ASU".into()))
        );
        assert_eq!(
            host.queue().drain_commands(),
            vec![ScriptCommand::Translate {
                entity: EntityId::new(3),
                delta: tether_core::glam::Vec2::new(1.0, 0.0),
            }]
        );
    }

    #[test]
    fn absent_methods_skip_and_unknown_classes_are_unresolved() {
        let (_dir, mut host) = host_with(PLAYER);
        let player = host.create_instance("GameScript", "Player").unwrap();

        assert_eq!(
            host.invoke("Player", "LateUpdate", Some(player), &[]),
            Ok(Invocation::Skipped)
        );
        assert_eq!(host.invoke("Player", "Update", None, &[]), Ok(Invocation::Skipped));
        assert_eq!(host.invoke("", "Update", Some(player), &[]), Ok(Invocation::Skipped));
        assert!(matches!(
            host.invoke("Player", "OnCollide", Some(player), &[]),
            Err(ScriptFault::Unresolved { .. })
        ));
    }

    #[test]
    fn arity_must_match() {
        let (_dir, mut host) = host_with("exports.Lazy = class { Awake() {} };");
        assert!(!host.resolve_method("GameScript", "Lazy", "", "Awake", 1));
        assert!(host.resolve_method("GameScript", "Lazy", "", "Awake", 0));
    }

    #[test]
    fn namespaced_classes_resolve() {
        let (_dir, mut host) = host_with(PLAYER);
        assert!(host.resolve_method("GameScript", "Enemy", "Game", "LateUpdate", 0));
        assert!(!host.resolve_method("GameScript", "Enemy", "Other", "LateUpdate", 0));
    }

    #[test]
    fn exceptions_become_faults() {
        let (_dir, mut host) = host_with(PLAYER);
        let faulty = host.create_instance("GameScript", "Faulty").unwrap();
        match host.invoke("Faulty", "Update", Some(faulty), &[]) {
            Err(ScriptFault::Exception { message, .. }) => assert!(message.contains("boom")),
            other => panic!("expected exception, got {other:?}"),
        }
    }

    #[test]
    fn unknown_class_fails_to_construct() {
        let (_dir, mut host) = host_with(PLAYER);
        assert!(matches!(
            host.create_instance("GameScript", "Ghost"),
            Err(ScriptError::ClassNotFound { .. })
        ));
        assert!(matches!(
            host.create_instance("Other", "Player"),
            Err(ScriptError::AssemblyNotLoaded(_))
        ));
    }

    #[test]
    fn unload_invalidates_handles() {
        let (_dir, mut host) = host_with(PLAYER);
        let old = host.create_instance("GameScript", "Player").unwrap();

        host.unload_secondary_domain();
        assert_eq!(host.assembly_state("GameScript"), AssemblyState::StaleAfterUnload);
        assert_eq!(
            host.invoke("Player", "Update", Some(old), &[]),
            Err(ScriptFault::NoDomain)
        );

        host.load_secondary_domain().unwrap();
        host.reload_all().unwrap();
        assert_eq!(host.assembly_state("GameScript"), AssemblyState::Loaded);
        assert_eq!(
            host.invoke("Player", "Update", Some(old), &[]),
            Err(ScriptFault::StaleHandle)
        );
        assert_eq!(host.queue().drain_commands(), Vec::new());
    }

    #[test]
    fn duplicate_and_broken_assemblies_are_rejected() {
        let (dir, mut host) = host_with(PLAYER);
        let logic = host.assembly_path("GameScript").unwrap().to_path_buf();
        assert!(matches!(
            host.add_assembly(&logic),
            Err(ScriptError::DuplicateAssembly(_))
        ));

        let broken = dir.path().join("Broken.js");
        std::fs::write(&broken, "exports.X = class {").unwrap();
        assert!(matches!(
            host.add_assembly(&broken),
            Err(ScriptError::AssemblyLoad { .. })
        ));
        assert_eq!(host.assembly_state("Broken"), AssemblyState::Unloaded);
        assert!(matches!(
            host.add_assembly(&dir.path().join("Missing.js")),
            Err(ScriptError::Io { .. })
        ));
    }

    #[test]
    fn reload_all_tolerates_broken_binaries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("GameScript.js"), PLAYER).unwrap();
        std::fs::write(dir.path().join("Broken.js"), "throw new Error('nope');").unwrap();
        std::fs::write(dir.path().join("Extra.js"), "exports.Extra = class { Start() {} };").unwrap();
        let config = ScriptConfig {
            output_dir: dir.path().to_path_buf(),
            ..ScriptConfig::default()
        };
        let mut host = QuickJsHost::new(&config, CommandQueue::new()).unwrap();
        assert!(matches!(host.reload_all(), Err(ScriptError::NoDomain)));

        host.load_secondary_domain().unwrap();
        assert_eq!(host.reload_all().unwrap(), 2);
        assert_eq!(host.loaded_assemblies(), vec!["Extra", "GameScript"]);
        let extra = host.create_instance("Extra", "Extra").unwrap();
        assert_eq!(host.invoke("Extra", "Start", Some(extra), &[]), Ok(Invocation::Ran));
    }

    #[test]
    fn declared_fields_are_typed_and_settable() {
        let (_dir, mut host) = host_with(PLAYER);
        let fields = host.fields("Player");
        assert_eq!(
            fields,
            vec![
                FieldDescriptor {
                    name: "speed".into(),
                    kind: FieldKind::Float
                },
                FieldDescriptor {
                    name: "title".into(),
                    kind: FieldKind::String
                },
            ]
        );

        let player = host.create_instance("GameScript", "Player").unwrap();
        host.set_field(player, "speed", ScriptValue::Float(2.5)).unwrap();
        assert_eq!(host.get_field(player, "speed"), Some(ScriptValue::Float(2.5)));
    }

    #[test]
    fn garbage_collection_keeps_pinned_instances() {
        let (_dir, mut host) = host_with(PLAYER);
        let kept = host.create_instance("GameScript", "Player").unwrap();
        let dropped = host.create_instance("GameScript", "Player").unwrap();
        let pin = host.pin(kept).unwrap();

        assert_eq!(host.collect_garbage(), 1);
        assert_eq!(host.live_instances(), 1);
        assert_eq!(
            host.invoke("Player", "Start", Some(dropped), &[]),
            Err(ScriptFault::StaleHandle)
        );
        assert_eq!(host.invoke("Player", "Start", Some(kept), &[]), Ok(Invocation::Ran));

        host.release(pin);
        assert_eq!(host.collect_garbage(), 1);
        assert_eq!(host.live_instances(), 0);
    }

    #[test]
    fn collected_slots_are_not_handed_out_again() {
        let (_dir, mut host) = host_with(PLAYER);
        for _ in 0..50 {
            host.create_instance("GameScript", "Player").unwrap();
            host.collect_garbage();
        }
        assert_eq!(host.live_instances(), 0);

        let old = host.create_instance("GameScript", "Player").unwrap();
        host.collect_garbage();
        let fresh = host.create_instance("GameScript", "Player").unwrap();
        assert_ne!(old, fresh);
        assert_eq!(host.live_instances(), 1);
        assert_eq!(
            host.invoke("Player", "Start", Some(old), &[]),
            Err(ScriptFault::StaleHandle)
        );
        assert_eq!(host.invoke("Player", "Start", Some(fresh), &[]), Ok(Invocation::Ran));
    }
}
