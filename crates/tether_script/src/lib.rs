//! Tether Scripting System
//!
//! Hot-reloadable game logic on top of QuickJS.
//!
//! ## Architecture
//!
//! - **Host:** [`ManagedHost`] is the contract the logic layer drives:
//!   reload domains, assemblies, method resolution, instances, invocation.
//!   [`QuickJsHost`] implements it with one long-lived primary domain and a
//!   disposable secondary domain that holds user logic.
//! - **Logic:** [`LogicSystem`] attaches script instances to entities with a
//!   `Script` component and runs Awake → Start → Update → LateUpdate.
//! - **Reload:** [`ScriptBridge`] compiles sources with an external toolchain
//!   and swaps the secondary domain only when the build succeeds.

pub mod bridge;
pub mod compiler;
pub mod config;
pub mod error;
pub mod host;
pub mod logic;
pub mod method_cache;
pub mod natives;
pub mod quickjs;
pub mod value;

#[cfg(test)]
pub(crate) mod fake_host;

pub use bridge::ScriptBridge;
pub use compiler::ScriptCompiler;
pub use config::{CompilerConfig, ScriptConfig};
pub use error::{ScriptError, ScriptFault};
pub use host::{AssemblyState, Invocation, ManagedHost, LIFECYCLE_METHODS};
pub use logic::LogicSystem;
pub use natives::{CommandQueue, ScriptCommand};
pub use quickjs::QuickJsHost;
pub use value::{FieldDescriptor, FieldKind, ScriptValue};

pub use rquickjs;
