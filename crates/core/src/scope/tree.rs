use super::{ScopeKind, ScopePath};
use std::collections::HashMap;

/// Index of a scope in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The global root, present in every tree
    pub const GLOBAL: ScopeId = ScopeId(0);
}

#[derive(Debug)]
struct ScopeNode {
    label: String,
    kind: ScopeKind,
    parent: Option<ScopeId>,
    children: HashMap<String, ScopeId>,
}

/// Arena-backed scope tree
///
/// Non-root scopes hold an index-based parent link, so the tree is
/// cycle-free by construction and a scope is never re-parented. The
/// server interns every scope path it sees; interning the same path
/// twice yields the same `ScopeId`.
#[derive(Debug)]
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![ScopeNode {
                label: String::new(),
                kind: ScopeKind::Global,
                parent: None,
                children: HashMap::new(),
            }],
        }
    }

    /// Intern a path, creating any missing nodes along it
    pub fn intern(&mut self, path: &ScopePath) -> ScopeId {
        let mut current = ScopeId::GLOBAL;

        for (depth, label) in path.labels().iter().enumerate() {
            current = match self.nodes[current.0 as usize].children.get(label) {
                Some(&child) => child,
                None => {
                    let id = ScopeId(self.nodes.len() as u32);
                    let kind = match depth {
                        0 => ScopeKind::Domain,
                        1 => ScopeKind::Node,
                        _ => ScopeKind::Application,
                    };
                    self.nodes.push(ScopeNode {
                        label: label.clone(),
                        kind,
                        parent: Some(current),
                        children: HashMap::new(),
                    });
                    self.nodes[current.0 as usize]
                        .children
                        .insert(label.clone(), id);
                    id
                }
            };
        }

        current
    }

    /// Look up a path without creating nodes
    pub fn find(&self, path: &ScopePath) -> Option<ScopeId> {
        let mut current = ScopeId::GLOBAL;
        for label in path.labels() {
            current = *self.nodes[current.0 as usize].children.get(label)?;
        }
        Some(current)
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.nodes[id.0 as usize].parent
    }

    pub fn kind(&self, id: ScopeId) -> ScopeKind {
        self.nodes[id.0 as usize].kind
    }

    pub fn depth(&self, id: ScopeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Reconstruct the value form of a scope
    pub fn path(&self, id: ScopeId) -> ScopePath {
        let mut labels = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            labels.push(self.nodes[current.0 as usize].label.clone());
            current = parent;
        }
        labels.reverse();
        ScopePath::from_labels(labels).expect("interned scope is always well formed")
    }

    /// True iff `registered` equals `requested` or is a strict
    /// ancestor of it
    pub fn visible(&self, requested: ScopeId, registered: ScopeId) -> bool {
        let mut current = Some(requested);
        while let Some(id) = current {
            if id == registered {
                return true;
            }
            current = self.parent(id);
        }
        false
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> ScopePath {
        s.parse().unwrap()
    }

    #[test]
    fn test_intern_is_idempotent() {
        let mut tree = ScopeTree::new();
        let a = tree.intern(&path("global/acme/node1"));
        let b = tree.intern(&path("global/acme/node1"));
        assert_eq!(a, b);
        assert_eq!(tree.path(a), path("global/acme/node1"));
        assert_eq!(tree.kind(a), ScopeKind::Node);
        assert_eq!(tree.depth(a), 2);
    }

    #[test]
    fn test_global_is_preinterned() {
        let mut tree = ScopeTree::new();
        assert_eq!(tree.intern(&ScopePath::global()), ScopeId::GLOBAL);
        assert_eq!(tree.path(ScopeId::GLOBAL), ScopePath::global());
    }

    #[test]
    fn test_visibility_follows_parent_links() {
        let mut tree = ScopeTree::new();
        let app = tree.intern(&path("global/acme/node1/app"));
        let node = tree.find(&path("global/acme/node1")).unwrap();
        let rival = tree.intern(&path("global/rival"));

        assert!(tree.visible(app, node));
        assert!(tree.visible(app, ScopeId::GLOBAL));
        assert!(tree.visible(app, app));
        assert!(!tree.visible(node, app));
        assert!(!tree.visible(app, rival));
    }
}
