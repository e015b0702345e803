//! Engine callbacks exposed to scripts as the global `engine` object.
//!
//! Scripts never touch component storage directly. Natives record
//! [`ScriptCommand`]s in a shared queue that the logic system applies after
//! its update, so systems that run later in the frame see the changes.

use rquickjs::{Ctx, Function, Object};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tether_core::ecs::{ComponentPools, EntityId};
use tether_core::glam::Vec2;

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    Log { message: String },
    SetPosition { entity: EntityId, position: Vec2 },
    Translate { entity: EntityId, delta: Vec2 },
    SetScriptEnabled { entity: EntityId, script: String, enabled: bool },
}

/// Script log lines kept for `drain_logs`; older ones are dropped.
pub const LOG_HISTORY: usize = 256;

#[derive(Default)]
struct SharedState {
    commands: Vec<ScriptCommand>,
    logs: VecDeque<String>,
}

/// Queue shared between the natives of every domain and the logic system.
#[derive(Clone, Default)]
pub struct CommandQueue {
    state: Rc<RefCell<SharedState>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: ScriptCommand) {
        let mut state = self.state.borrow_mut();
        if let ScriptCommand::Log { message } = &command {
            if state.logs.len() == LOG_HISTORY {
                state.logs.pop_front();
            }
            state.logs.push_back(message.clone());
        }
        state.commands.push(command);
    }

    pub fn drain_commands(&self) -> Vec<ScriptCommand> {
        std::mem::take(&mut self.state.borrow_mut().commands)
    }

    /// The last [`LOG_HISTORY`] messages scripts logged since the last drain.
    pub fn drain_logs(&self) -> Vec<String> {
        self.state.borrow_mut().logs.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply queued commands to component storage. Commands aimed at
    /// entities without the needed component are dropped.
    pub fn apply(&self, pools: &mut ComponentPools) -> usize {
        let commands = self.drain_commands();
        let count = commands.len();
        for command in commands {
            match command {
                ScriptCommand::Log { message } => {
                    tracing::info!(target: "script", "{}", message);
                }
                ScriptCommand::SetPosition { entity, position } => {
                    if let Some(transform) = pools.transforms.find_mut(entity) {
                        transform.position = position;
                    }
                }
                ScriptCommand::Translate { entity, delta } => {
                    if let Some(transform) = pools.transforms.find_mut(entity) {
                        transform.position += delta;
                    }
                }
                ScriptCommand::SetScriptEnabled {
                    entity,
                    script,
                    enabled,
                } => {
                    let found = pools
                        .scripts
                        .find_mut(entity)
                        .is_some_and(|component| component.set_enabled(&script, enabled));
                    if !found {
                        tracing::warn!("entity {} has no script '{}'", entity, script);
                    }
                }
            }
        }
        count
    }
}

/// Installs the `engine` object into a context.
pub struct NativeTable {
    queue: CommandQueue,
}

impl NativeTable {
    pub const NAMES: [&'static str; 4] = ["log", "setPosition", "translate", "setScriptEnabled"];

    pub fn new(queue: CommandQueue) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn install(&self, ctx: &Ctx<'_>) -> rquickjs::Result<()> {
        let engine = Object::new(ctx.clone())?;

        let queue = self.queue.clone();
        engine.set(
            "log",
            Function::new(ctx.clone(), move |message: String| {
                queue.push(ScriptCommand::Log { message });
            })?,
        )?;

        let queue = self.queue.clone();
        engine.set(
            "setPosition",
            Function::new(ctx.clone(), move |entity: u32, x: f64, y: f64| {
                queue.push(ScriptCommand::SetPosition {
                    entity: EntityId::new(entity),
                    position: Vec2::new(x as f32, y as f32),
                });
            })?,
        )?;

        let queue = self.queue.clone();
        engine.set(
            "translate",
            Function::new(ctx.clone(), move |entity: u32, dx: f64, dy: f64| {
                queue.push(ScriptCommand::Translate {
                    entity: EntityId::new(entity),
                    delta: Vec2::new(dx as f32, dy as f32),
                });
            })?,
        )?;

        let queue = self.queue.clone();
        engine.set(
            "setScriptEnabled",
            Function::new(
                ctx.clone(),
                move |entity: u32, script: String, enabled: bool| {
                    queue.push(ScriptCommand::SetScriptEnabled {
                        entity: EntityId::new(entity),
                        script,
                        enabled,
                    });
                },
            )?,
        )?;

        ctx.globals().set("engine", engine)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_moves_transforms_and_toggles_scripts() {
        let mut pools = ComponentPools::new(4);
        let entity = EntityId::new(1);
        pools.transforms.assign(entity, "s");
        pools.scripts.assign(entity, "s").unwrap().add_script("Mover");

        let queue = CommandQueue::new();
        queue.push(ScriptCommand::SetPosition {
            entity,
            position: Vec2::new(1.0, 2.0),
        });
        queue.push(ScriptCommand::Translate {
            entity,
            delta: Vec2::new(0.5, 0.5),
        });
        queue.push(ScriptCommand::SetScriptEnabled {
            entity,
            script: "Mover".into(),
            enabled: false,
        });
        queue.push(ScriptCommand::Log {
            message: "hello".into(),
        });

        assert_eq!(queue.apply(&mut pools), 4);
        assert!(queue.is_empty());
        assert_eq!(
            pools.transforms.find(entity).unwrap().position,
            Vec2::new(1.5, 2.5)
        );
        assert!(!pools.scripts.find(entity).unwrap().scripts[0].enabled);
        assert_eq!(queue.drain_logs(), vec!["hello".to_string()]);
    }

    #[test]
    fn commands_for_missing_components_are_dropped() {
        let mut pools = ComponentPools::new(1);
        let queue = CommandQueue::new();
        queue.push(ScriptCommand::Translate {
            entity: EntityId::new(0),
            delta: Vec2::ONE,
        });
        assert_eq!(queue.apply(&mut pools), 1);
    }

    #[test]
    fn undrained_logs_keep_only_recent_history() {
        let mut pools = ComponentPools::new(1);
        let queue = CommandQueue::new();
        for index in 0..LOG_HISTORY + 1000 {
            queue.push(ScriptCommand::Log {
                message: format!("line {index}"),
            });
            queue.apply(&mut pools);
        }

        let logs = queue.drain_logs();
        assert_eq!(logs.len(), LOG_HISTORY);
        assert_eq!(logs.first().map(String::as_str), Some("line 1000"));
        assert!(queue.drain_logs().is_empty());
    }
}
