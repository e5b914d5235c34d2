//! Parent lookup for the container tree

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{Result, VisError};
use crate::model::NodeId;

/// Child -> parent back-references. Container children sets are the source of
/// truth; this index mirrors them so that parent lookups are O(1) and cycle
/// checks are O(depth).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyIndex {
    parents: HashMap<NodeId, NodeId>,
}

impl HierarchyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent_of<Q>(&self, id: &Q) -> Option<&NodeId>
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.parents.get(id)
    }

    /// Strict ancestors of `id`, innermost first.
    pub fn ancestors<'a>(&'a self, id: &'a NodeId) -> Ancestors<'a> {
        Ancestors {
            index: self,
            current: id,
        }
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: &NodeId, id: &NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Number of strict ancestors. Root-level entities have depth 0.
    pub fn depth(&self, id: &NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Check that `child` may be placed under `parent`. Placing a child under
    /// its current parent again is allowed.
    pub fn check_attach(&self, parent: &NodeId, child: &NodeId) -> Result<()> {
        if parent == child || self.is_ancestor(child, parent) {
            return Err(VisError::Cycle {
                parent: parent.clone(),
                child: child.clone(),
            });
        }
        match self.parents.get(child) {
            Some(existing) if existing != parent => Err(VisError::AlreadyParented {
                child: child.clone(),
                parent: parent.clone(),
                existing: existing.clone(),
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn attach(&mut self, parent: &NodeId, child: &NodeId) {
        self.parents.insert(child.clone(), parent.clone());
    }

    pub(crate) fn detach(&mut self, child: &NodeId) -> Option<NodeId> {
        self.parents.remove(child)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.parents.iter()
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Iterator over the strict ancestors of an entity.
pub struct Ancestors<'a> {
    index: &'a HierarchyIndex,
    current: &'a NodeId,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let parent = self.index.parents.get(self.current)?;
        self.current = parent;
        Some(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn chain() -> HierarchyIndex {
        // outer > middle > inner > leaf
        let mut index = HierarchyIndex::new();
        index.attach(&id("outer"), &id("middle"));
        index.attach(&id("middle"), &id("inner"));
        index.attach(&id("inner"), &id("leaf"));
        index
    }

    #[test]
    fn ancestors_walk_innermost_first() {
        let index = chain();
        let leaf = id("leaf");
        let walk: Vec<&str> = index.ancestors(&leaf).map(|a| a.as_str()).collect();
        assert_eq!(walk, vec!["inner", "middle", "outer"]);
        assert_eq!(index.depth(&leaf), 3);
        assert_eq!(index.depth(&id("outer")), 0);
    }

    #[test]
    fn rejects_cycles() {
        let index = chain();
        let err = index.check_attach(&id("leaf"), &id("outer")).unwrap_err();
        assert!(matches!(err, VisError::Cycle { .. }));

        let err = index.check_attach(&id("inner"), &id("inner")).unwrap_err();
        assert!(matches!(err, VisError::Cycle { .. }));
    }

    #[test]
    fn rejects_second_parent() {
        let index = chain();
        let err = index.check_attach(&id("outer"), &id("inner")).unwrap_err();
        assert_eq!(
            err,
            VisError::AlreadyParented {
                child: id("inner"),
                parent: id("outer"),
                existing: id("middle"),
            }
        );
        // Same parent again is fine.
        assert!(index.check_attach(&id("middle"), &id("inner")).is_ok());
    }

    #[test]
    fn detach_frees_the_child() {
        let mut index = chain();
        assert_eq!(index.detach(&id("inner")), Some(id("middle")));
        assert!(index.check_attach(&id("outer"), &id("inner")).is_ok());
        assert!(!index.is_ancestor(&id("middle"), &id("leaf")));
    }
}
