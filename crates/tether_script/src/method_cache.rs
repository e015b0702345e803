//! Resolved lifecycle methods keyed by class and method name.
//!
//! A class that has been through resolution has an entry for every method
//! that was asked for, either resolved or absent. A class with no entry at
//! all has not been resolved since the cache was last cleared.

use std::collections::HashMap;

#[derive(Debug)]
enum Slot<M> {
    Resolved(M),
    Absent,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<'a, M> {
    Resolved(&'a M),
    /// The class was resolved and does not define the method.
    Absent,
    /// Nothing is known about this class or method yet.
    Unresolved,
}

#[derive(Debug)]
pub struct MethodCache<M> {
    classes: HashMap<String, HashMap<String, Slot<M>>>,
}

impl<M> MethodCache<M> {
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    pub fn insert_resolved(&mut self, class: &str, method: &str, handle: M) {
        self.methods_mut(class)
            .insert(method.to_string(), Slot::Resolved(handle));
    }

    pub fn insert_absent(&mut self, class: &str, method: &str) {
        self.methods_mut(class)
            .insert(method.to_string(), Slot::Absent);
    }

    fn methods_mut(&mut self, class: &str) -> &mut HashMap<String, Slot<M>> {
        self.classes.entry(class.to_string()).or_default()
    }

    pub fn lookup(&self, class: &str, method: &str) -> Lookup<'_, M> {
        match self.classes.get(class).and_then(|methods| methods.get(method)) {
            Some(Slot::Resolved(handle)) => Lookup::Resolved(handle),
            Some(Slot::Absent) => Lookup::Absent,
            None => Lookup::Unresolved,
        }
    }

    /// Number of resolved (not absent) methods.
    pub fn resolved_len(&self) -> usize {
        self.classes
            .values()
            .flat_map(HashMap::values)
            .filter(|slot| matches!(slot, Slot::Resolved(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn clear(&mut self) {
        self.classes.clear();
    }
}

impl<M> Default for MethodCache<M> {
    fn default() -> Self {
        Self::new()
    }
}
