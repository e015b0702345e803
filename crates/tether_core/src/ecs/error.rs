use crate::ecs::EntityId;
use thiserror::Error;

/// Errors raised by the registry, pools and hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    #[error("entity {entity} has no live {component} component")]
    MissingComponent {
        entity: EntityId,
        component: &'static str,
    },

    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),

    #[error("scene '{0}' is not loaded")]
    UnknownScene(String),

    #[error("entity {0} cannot be its own parent")]
    SelfParent(EntityId),

    #[error("parenting {child} under {parent} would create a cycle")]
    HierarchyCycle { parent: EntityId, child: EntityId },
}
