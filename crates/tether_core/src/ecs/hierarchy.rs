//! Parent/child relationships between entities.
//!
//! Nodes live in an arena indexed by entity id. Every entity has at most one
//! parent and the graph is kept acyclic at mutation time.

use crate::ecs::{EcsError, EntityId};

#[derive(Debug, Clone, Default)]
struct Node {
    parent: Option<EntityId>,
    children: Vec<EntityId>,
}

#[derive(Default)]
pub struct Hierarchy {
    nodes: Vec<Node>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, entity: EntityId) -> Option<&Node> {
        self.nodes.get(entity.index())
    }

    fn node_mut(&mut self, entity: EntityId) -> &mut Node {
        if self.nodes.len() <= entity.index() {
            self.nodes.resize_with(entity.index() + 1, Node::default);
        }
        &mut self.nodes[entity.index()]
    }

    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.node(entity).and_then(|node| node.parent)
    }

    pub fn children(&self, entity: EntityId) -> &[EntityId] {
        self.node(entity)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// True when `ancestor` appears on the parent chain of `entity`.
    pub fn is_ancestor(&self, ancestor: EntityId, entity: EntityId) -> bool {
        let mut current = self.parent(entity);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Attach `child` under `parent`, detaching it from any previous parent.
    pub fn set_parent(&mut self, parent: EntityId, child: EntityId) -> Result<(), EcsError> {
        if parent == child {
            return Err(EcsError::SelfParent(child));
        }
        if self.is_ancestor(child, parent) {
            return Err(EcsError::HierarchyCycle { parent, child });
        }
        self.remove_parent(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
        Ok(())
    }

    /// Detach `child` from its parent, returning the old parent.
    pub fn remove_parent(&mut self, child: EntityId) -> Option<EntityId> {
        let parent = self.parent(child)?;
        self.node_mut(child).parent = None;
        self.node_mut(parent).children.retain(|id| *id != child);
        Some(parent)
    }

    /// Every entity below `entity`, depth first.
    pub fn descendants(&self, entity: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack: Vec<EntityId> = self.children(entity).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Drop the entity's node after it has been detached from its parent.
    pub(crate) fn clear(&mut self, entity: EntityId) {
        if let Some(node) = self.nodes.get_mut(entity.index()) {
            *node = Node::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(raw: u32) -> EntityId {
        EntityId::new(raw)
    }

    #[test]
    fn single_parent_is_enforced() {
        let mut tree = Hierarchy::new();
        tree.set_parent(e(0), e(2)).unwrap();
        tree.set_parent(e(1), e(2)).unwrap();
        assert_eq!(tree.parent(e(2)), Some(e(1)));
        assert!(tree.children(e(0)).is_empty());
        assert_eq!(tree.children(e(1)), &[e(2)]);
    }

    #[test]
    fn rejects_self_parent_and_cycles() {
        let mut tree = Hierarchy::new();
        assert_eq!(tree.set_parent(e(1), e(1)), Err(EcsError::SelfParent(e(1))));

        tree.set_parent(e(0), e(1)).unwrap();
        tree.set_parent(e(1), e(2)).unwrap();
        assert_eq!(
            tree.set_parent(e(2), e(0)),
            Err(EcsError::HierarchyCycle {
                parent: e(2),
                child: e(0)
            })
        );
        assert_eq!(tree.parent(e(0)), None);
    }

    #[test]
    fn descendants_depth_first() {
        let mut tree = Hierarchy::new();
        tree.set_parent(e(0), e(1)).unwrap();
        tree.set_parent(e(1), e(3)).unwrap();
        tree.set_parent(e(0), e(2)).unwrap();
        assert_eq!(tree.descendants(e(0)), vec![e(1), e(3), e(2)]);
        assert_eq!(tree.remove_parent(e(1)), Some(e(0)));
        assert_eq!(tree.descendants(e(0)), vec![e(2)]);
    }
}
