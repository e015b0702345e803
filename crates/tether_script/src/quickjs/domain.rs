//! Script domains. The primary domain lives as long as the host; a secondary
//! domain holds user assemblies and is thrown away on every reload.

use super::convert::exception_message;
use super::intrinsics;
use crate::error::{ScriptError, ScriptFault};
use crate::host::Invocation;
use crate::method_cache::{Lookup, MethodCache};
use crate::natives::NativeTable;
use crate::value::{FieldDescriptor, FieldKind, ScriptValue};
use rquickjs::{Array, Context, Ctx, Function, Object, Persistent, Runtime, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tether_core::ecs::components::{ObjectHandle, PinHandle};

/// Long-lived context for engine-side scripts.
pub struct PrimaryDomain {
    natives: NativeTable,
    context: Context,
    #[allow(dead_code)] // Kept alive for context lifetime
    runtime: Runtime,
}

impl PrimaryDomain {
    pub fn new(natives: NativeTable) -> Result<Self, ScriptError> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;
        context.with(|ctx| natives.install(&ctx))?;
        Ok(Self {
            natives,
            context,
            runtime,
        })
    }

    pub fn natives(&self) -> &NativeTable {
        &self.natives
    }

    pub fn execute_file(&self, path: &Path) -> Result<(), ScriptError> {
        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.execute(&source)
    }

    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            ctx.eval::<(), _>(source)?;
            Ok::<_, rquickjs::Error>(())
        })?;
        Ok(())
    }

    /// Call a global function by name with no arguments.
    pub fn call_function(&self, name: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            let func: Function = ctx.globals().get(name)?;
            func.call::<_, ()>(())?;
            Ok::<_, rquickjs::Error>(())
        })?;
        Ok(())
    }
}

struct Intrinsics {
    classes: Persistent<Function<'static>>,
    method: Persistent<Function<'static>>,
    construct: Persistent<Function<'static>>,
    call: Persistent<Function<'static>>,
    fields: Persistent<Function<'static>>,
}

impl Intrinsics {
    fn install(ctx: &Ctx<'_>) -> rquickjs::Result<Self> {
        let table: Object = ctx.eval(intrinsics::SOURCE)?;
        let get = |name: &str| -> rquickjs::Result<Persistent<Function<'static>>> {
            let func: Function = table.get(name)?;
            Ok(Persistent::save(ctx, func))
        };
        Ok(Self {
            classes: get("classes")?,
            method: get("method")?,
            construct: get("construct")?,
            call: get("call")?,
            fields: get("fields")?,
        })
    }
}

pub(crate) struct AssemblyDescriptor {
    pub(crate) path: PathBuf,
    pub(crate) display_name: String,
    #[allow(dead_code)] // Source image, retained for diagnostics
    pub(crate) image: String,
    #[allow(dead_code)]
    exports: Persistent<Object<'static>>,
}

pub(crate) struct ClassEntry {
    pub(crate) assembly: String,
    pub(crate) namespace: String,
    constructor: Persistent<Function<'static>>,
    pub(crate) fields: Vec<FieldDescriptor>,
}

struct InstanceSlot {
    object: Persistent<Object<'static>>,
    class: String,
    pins: u32,
}

/// A disposable domain. Field order is drop order: every persistent handle
/// goes before the context and runtime that own its value.
pub(crate) struct SecondaryDomain {
    methods: MethodCache<Persistent<Function<'static>>>,
    classes: HashMap<String, ClassEntry>,
    assemblies: BTreeMap<String, AssemblyDescriptor>,
    instances: HashMap<u32, InstanceSlot>,
    next_instance: u32,
    intrinsics: Intrinsics,
    context: Context,
    runtime: Runtime,
    id: u32,
}

impl SecondaryDomain {
    pub(crate) fn new(
        id: u32,
        natives: &NativeTable,
        memory_limit: Option<usize>,
    ) -> Result<Self, ScriptError> {
        let runtime = Runtime::new()?;
        if let Some(limit) = memory_limit {
            runtime.set_memory_limit(limit);
        }
        let context = Context::full(&runtime)?;
        let intrinsics = context.with(|ctx| {
            natives.install(&ctx)?;
            Intrinsics::install(&ctx)
        })?;
        Ok(Self {
            methods: MethodCache::new(),
            classes: HashMap::new(),
            assemblies: BTreeMap::new(),
            instances: HashMap::new(),
            next_instance: 0,
            intrinsics,
            context,
            runtime,
            id,
        })
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn assembly_names(&self) -> impl Iterator<Item = &str> {
        self.assemblies.keys().map(String::as_str)
    }

    pub(crate) fn assembly(&self, name: &str) -> Option<&AssemblyDescriptor> {
        self.assemblies.get(name)
    }

    pub(crate) fn has_assembly(&self, name: &str) -> bool {
        self.assemblies.contains_key(name)
    }

    /// Classes defined by `assembly` as `(namespace, class)` pairs.
    pub(crate) fn classes_of(&self, assembly: &str) -> Vec<(String, String)> {
        let mut found: Vec<_> = self
            .classes
            .iter()
            .filter(|(_, entry)| entry.assembly == assembly)
            .map(|(name, entry)| (entry.namespace.clone(), name.clone()))
            .collect();
        found.sort();
        found
    }

    pub(crate) fn class(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub(crate) fn methods(&self) -> &MethodCache<Persistent<Function<'static>>> {
        &self.methods
    }

    /// Evaluate the assembly at `path` and register its classes.
    pub(crate) fn load_assembly(&mut self, name: &str, path: &Path) -> Result<(), ScriptError> {
        let image = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let loaded = self.context.with(|ctx| {
            let exports: Object = ctx
                .eval(intrinsics::wrap_assembly(&image))
                .map_err(|err| exception_message(&ctx, err))?;
            let classes = self
                .discover_classes(&ctx, &exports)
                .map_err(|err| exception_message(&ctx, err))?;
            Ok::<_, String>((Persistent::save(&ctx, exports), classes))
        });
        let (exports, classes) = loaded.map_err(|reason| ScriptError::AssemblyLoad {
            name: name.to_string(),
            reason,
        })?;

        for (class, mut entry) in classes {
            entry.assembly = name.to_string();
            if let Some(previous) = self.classes.get(&class) {
                tracing::warn!(
                    "class '{}' from '{}' shadows the one from '{}'",
                    class,
                    name,
                    previous.assembly
                );
            }
            self.classes.insert(class, entry);
        }
        self.assemblies.insert(
            name.to_string(),
            AssemblyDescriptor {
                path: path.to_path_buf(),
                display_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| name.to_string()),
                image,
                exports,
            },
        );
        Ok(())
    }

    fn discover_classes<'js>(
        &self,
        ctx: &Ctx<'js>,
        exports: &Object<'js>,
    ) -> rquickjs::Result<Vec<(String, ClassEntry)>> {
        let classes: Function = self.intrinsics.classes.clone().restore(ctx)?;
        let field_table: Function = self.intrinsics.fields.clone().restore(ctx)?;

        let mut found = Vec::new();
        for row in classes.call::<_, Vec<Array>>((exports.clone(),))? {
            let namespace: String = row.get(0)?;
            let name: String = row.get(1)?;
            let constructor: Function = row.get(2)?;

            let declared: Vec<String> = field_table.call((constructor.clone(),))?;
            let fields = declared
                .chunks(2)
                .filter_map(|pair| match pair {
                    [field, tag] => match FieldKind::parse(tag) {
                        Some(kind) => Some(FieldDescriptor {
                            name: field.clone(),
                            kind,
                        }),
                        None => {
                            tracing::debug!("{}.{}: unsupported field type '{}'", name, field, tag);
                            None
                        }
                    },
                    _ => None,
                })
                .collect();

            found.push((
                name,
                ClassEntry {
                    assembly: String::new(),
                    namespace,
                    constructor: Persistent::save(ctx, constructor),
                    fields,
                },
            ));
        }
        Ok(found)
    }

    /// Cache `class::method` with `arity` parameters as resolved or absent.
    pub(crate) fn resolve(
        &mut self,
        assembly: &str,
        class: &str,
        namespace: &str,
        method: &str,
        arity: usize,
    ) -> bool {
        let constructor = match self.classes.get(class) {
            Some(entry) if entry.assembly == assembly && entry.namespace == namespace => {
                entry.constructor.clone()
            }
            _ => {
                tracing::debug!("class '{}' not found in assembly '{}'", class, assembly);
                self.methods.insert_absent(class, method);
                return false;
            }
        };

        let resolved = self.context.with(|ctx| {
            let lookup: Function = self.intrinsics.method.clone().restore(&ctx)?;
            let constructor = constructor.restore(&ctx)?;
            let found: Value = lookup.call((constructor, method, arity as i32))?;
            Ok::<_, rquickjs::Error>(found.into_function().map(|f| Persistent::save(&ctx, f)))
        });

        match resolved {
            Ok(Some(handle)) => {
                self.methods.insert_resolved(class, method, handle);
                true
            }
            Ok(None) => {
                self.methods.insert_absent(class, method);
                false
            }
            Err(err) => {
                tracing::warn!("failed to resolve {}.{}: {}", class, method, err);
                self.methods.insert_absent(class, method);
                false
            }
        }
    }

    pub(crate) fn create_instance(&mut self, assembly: &str, class: &str) -> Result<ObjectHandle, ScriptError> {
        let constructor = match self.classes.get(class) {
            Some(entry) if entry.assembly == assembly => entry.constructor.clone(),
            _ => {
                return Err(ScriptError::ClassNotFound {
                    assembly: assembly.to_string(),
                    class: class.to_string(),
                })
            }
        };

        let object = self
            .context
            .with(|ctx| {
                let construct: Function = self
                    .intrinsics
                    .construct
                    .clone()
                    .restore(&ctx)
                    .map_err(|err| err.to_string())?;
                let constructor = constructor.restore(&ctx).map_err(|err| err.to_string())?;
                let object: Object = construct
                    .call((constructor,))
                    .map_err(|err| exception_message(&ctx, err))?;
                Ok::<_, String>(Persistent::save(&ctx, object))
            })
            .map_err(|message| ScriptError::Construct {
                class: class.to_string(),
                message,
            })?;

        let index = self.next_instance;
        self.next_instance = self.next_instance.wrapping_add(1);
        self.instances.insert(
            index,
            InstanceSlot {
                object,
                class: class.to_string(),
                pins: 0,
            },
        );
        Ok(ObjectHandle {
            domain: self.id,
            index,
        })
    }

    fn slot(&self, handle: ObjectHandle) -> Option<&InstanceSlot> {
        if handle.domain != self.id {
            return None;
        }
        self.instances.get(&handle.index)
    }

    pub(crate) fn instance_class(&self, handle: ObjectHandle) -> Option<&str> {
        self.slot(handle).map(|slot| slot.class.as_str())
    }

    pub(crate) fn invoke(
        &self,
        class: &str,
        method: &str,
        instance: ObjectHandle,
        args: &[ScriptValue],
    ) -> Result<Invocation, ScriptFault> {
        let slot = self.slot(instance).ok_or(ScriptFault::StaleHandle)?;
        let handle = match self.methods.lookup(class, method) {
            Lookup::Resolved(handle) => handle.clone(),
            Lookup::Absent => return Ok(Invocation::Skipped),
            Lookup::Unresolved => {
                return Err(ScriptFault::Unresolved {
                    class: class.to_string(),
                    method: method.to_string(),
                })
            }
        };
        let object = slot.object.clone();

        self.context.with(|ctx| {
            let (call, func, object) = match (
                self.intrinsics.call.clone().restore(&ctx),
                handle.restore(&ctx),
                object.restore(&ctx),
            ) {
                (Ok(call), Ok(func), Ok(object)) => (call, func, object),
                _ => return Err(ScriptFault::StaleHandle),
            };
            call.call::<_, Value>((func, object, args.to_vec()))
                .map(|_| Invocation::Ran)
                .map_err(|err| ScriptFault::Exception {
                    class: class.to_string(),
                    method: method.to_string(),
                    message: exception_message(&ctx, err),
                })
        })
    }

    pub(crate) fn set_field(
        &self,
        instance: ObjectHandle,
        field: &str,
        value: ScriptValue,
    ) -> Result<(), ScriptFault> {
        let slot = self.slot(instance).ok_or(ScriptFault::StaleHandle)?;
        let object = slot.object.clone();
        self.context.with(|ctx| {
            let object = object.restore(&ctx).map_err(|_| ScriptFault::StaleHandle)?;
            object
                .set(field, value)
                .map_err(|err| ScriptFault::Exception {
                    class: slot.class.clone(),
                    method: field.to_string(),
                    message: exception_message(&ctx, err),
                })
        })
    }

    pub(crate) fn get_field(&self, instance: ObjectHandle, field: &str) -> Option<ScriptValue> {
        let object = self.slot(instance)?.object.clone();
        self.context.with(|ctx| {
            let object = object.restore(&ctx).ok()?;
            object.get::<_, ScriptValue>(field).ok()
        })
    }

    pub(crate) fn pin(&mut self, instance: ObjectHandle) -> Option<PinHandle> {
        if instance.domain != self.id {
            return None;
        }
        let slot = self.instances.get_mut(&instance.index)?;
        slot.pins += 1;
        Some(PinHandle {
            domain: self.id,
            index: instance.index,
        })
    }

    pub(crate) fn release(&mut self, pin: PinHandle) -> bool {
        if pin.domain != self.id {
            return false;
        }
        match self.instances.get_mut(&pin.index) {
            Some(slot) if slot.pins > 0 => {
                slot.pins -= 1;
                true
            }
            _ => false,
        }
    }

    /// Drop every unpinned instance. Indices are never reused, so handles to
    /// a collected instance stay stale.
    pub(crate) fn collect_garbage(&mut self) -> usize {
        let before = self.instances.len();
        self.instances.retain(|_, slot| slot.pins > 0);
        self.instances.shrink_to_fit();
        self.runtime.run_gc();
        before - self.instances.len()
    }

    pub(crate) fn live_instances(&self) -> usize {
        self.instances.len()
    }
}
